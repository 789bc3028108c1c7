use futures_util::{SinkExt, StreamExt};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use draw_poker_core::Card;

const DEFAULT_URL: &str = "ws://127.0.0.1:25917/ws";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = Url::parse(&std::env::var("DRAW_POKER_URL").unwrap_or_else(|_| DEFAULT_URL.to_string()))?;

    println!("正在连接到: {}", url);
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    println!("连接成功!");

    let (mut write, mut read) = ws_stream.split();

    // 启动一个任务来处理从服务器接收的消息
    let reader = tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    println!("<-- {}", text.as_str());
                    if let Some(hint) = hint(text.as_str()) {
                        println!("    ({})", hint);
                    }
                    print!("> ");
                    let _ = std::io::stdout().flush();
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    eprintln!("接收消息时出错: {}", e);
                    break;
                }
            }
        }
        println!("\n服务器已关闭连接");
    });

    // 主任务把用户输入原样发送给服务器
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    println!("--- 五张抽牌扑克客户端 ---");
    println!("  start <人数> <带入金额> <底注> <昵称>  - 创建一场游戏");
    println!("  join <昵称>                           - 加入正在等待的游戏");
    println!("  exit                                  - 退出");

    while let Some(line) = stdin.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" {
            println!("正在断开连接...");
            break;
        }
        if reader.is_finished() || write.send(Message::Text(line.to_string().into())).await.is_err() {
            break;
        }
    }

    let _ = write.close().await;
    Ok(())
}

/// 根据服务器的提示给出回复格式
fn hint(line: &str) -> Option<&'static str> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        [_, "1"] if tokens[0].parse::<u32>().is_ok() => Some("ante <你的id> <底注> 或 leave <你的id>"),
        [_, "0"] if tokens[0].parse::<u32>().is_ok() => Some("资金不足以支付底注，你已出局"),
        [_, _, "True"] => Some("Check <id> <金额> | Call <id> <金额> | Raise <id> <金额> <加注额> | Fold <id> | Leave <id>"),
        [_, _, "False"] => Some("Call <id> <金额> | Raise <id> <金额> <加注额> | Fold <id> | Leave <id>"),
        ["discard", ..] => Some("N 或 <张数> <位置>..."),
        [first, ..] if first.parse::<Card>().is_ok() => Some("收到发牌后请回复 Received"),
        _ if line.ends_with("(Y/N)") => Some("Y 或 N"),
        _ => None,
    }
}
