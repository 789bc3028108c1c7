use async_trait::async_trait;
use draw_poker_core::{Connection, GameError, GameResult};
use tokio::sync::mpsc;

/// 一个 WebSocket 连接在牌桌一侧的句柄
///
/// 实际的读写由 socket 任务完成，两边通过 MPSC 通道传递文本帧。
pub struct WsConnection {
    // 发往该玩家 WebSocket 写任务的消息
    outgoing: mpsc::Sender<String>,
    // socket 任务转发过来的客户端消息
    incoming: mpsc::Receiver<String>,
}

impl WsConnection {
    pub fn new(outgoing: mpsc::Sender<String>, incoming: mpsc::Receiver<String>) -> Self {
        Self { outgoing, incoming }
    }
}

#[async_trait]
impl Connection for WsConnection {
    async fn send(&mut self, line: String) -> GameResult<()> {
        self.outgoing.send(line).await.map_err(|_| GameError::Disconnected)
    }

    async fn recv(&mut self) -> GameResult<String> {
        self.incoming.recv().await.ok_or(GameError::Disconnected)
    }
}
