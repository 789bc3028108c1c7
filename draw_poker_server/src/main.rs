use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::{stream::StreamExt, SinkExt};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod connection;
mod lobby;

use config::ServerConfig;
use connection::WsConnection;
use lobby::{AppState, SharedState, TableSummary};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    let state = SharedState::new(AppState::new(config.retry_limit));

    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .route("/tables", get(list_tables))
        .with_state(state);

    info!("服务器正在监听 {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// 处理 WebSocket 连接请求
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// 列出等待中和进行中的牌桌
async fn list_tables(State(state): State<SharedState>) -> Json<Vec<TableSummary>> {
    Json(state.summaries())
}

/// 处理单个 WebSocket 连接的生命周期
///
/// 第一帧交给大厅处理 (`start` / `join`)，入座之后的每一帧都转发给牌桌。
async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut sender, mut receiver) = socket.split();

    // 牌桌 -> 客户端
    let (tx, mut rx) = mpsc::channel::<String>(32);

    // 启动一个新任务，专门负责将 MPSC 通道中的消息发送到 WebSocket
    tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if sender.send(Message::Text(line.into())).await.is_err() {
                // 发送失败，说明客户端已断开，退出任务
                break;
            }
        }
        // 牌桌放弃了这个连接，关闭 socket
        let _ = sender.close().await;
    });

    let Some(first) = next_text(&mut receiver).await else {
        info!("客户端在握手前断开");
        return;
    };

    // 客户端 -> 牌桌
    let (in_tx, in_rx) = mpsc::channel::<String>(32);
    if !lobby::admit(&state, &first, WsConnection::new(tx, in_rx)).await {
        return;
    }

    while let Some(line) = next_text(&mut receiver).await {
        if in_tx.send(line).await.is_err() {
            // 玩家已被移出牌桌
            break;
        }
    }
    info!("客户端连接关闭");
}

/// 读取下一条文本帧，忽略其他类型的帧；连接关闭时返回 None
async fn next_text(receiver: &mut futures_util::stream::SplitStream<WebSocket>) -> Option<String> {
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => return Some(text.as_str().to_owned()),
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_tables_starts_empty() {
        let state = SharedState::new(AppState::new(3));
        let Json(tables) = list_tables(State(state)).await;
        assert!(tables.is_empty());
    }
}
