use crate::connection::WsConnection;
use draw_poker_core::{Connection, Handshake, ServerMessage, SessionConfig, Table};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

pub type SessionId = Uuid;

/// 服务器全局状态
pub struct AppState {
    retry_limit: usize,
    // 正在等待玩家加入的牌桌，同一时刻最多一张
    open: Mutex<Option<OpenTable>>,
    // 所有等待中和进行中的牌桌，供 /tables 查询
    pub tables: DashMap<SessionId, TableSummary>,
}

struct OpenTable {
    id: SessionId,
    table: Table<WsConnection>,
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Waiting,
    Running,
}

/// 一张牌桌的公开信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub id: SessionId,
    #[serde(flatten)]
    pub config: SessionConfig,
    pub seated: usize,
    pub status: TableStatus,
}

impl TableSummary {
    fn new(id: SessionId, config: SessionConfig) -> Self {
        Self {
            id,
            config,
            seated: 0,
            status: TableStatus::Waiting,
        }
    }
}

impl AppState {
    pub fn new(retry_limit: usize) -> Self {
        Self {
            retry_limit,
            open: Mutex::new(None),
            tables: DashMap::new(),
        }
    }

    /// 按 id 排序的牌桌列表
    pub fn summaries(&self) -> Vec<TableSummary> {
        let mut list: Vec<_> = self.tables.iter().map(|entry| entry.value().clone()).collect();
        list.sort_by_key(|summary| (summary.status == TableStatus::Running, summary.id));
        list
    }
}

/// 处理连接的第一条消息 (`start` 或 `join`)
///
/// 成功入座返回 true，此后连接归牌桌所有；失败时已经向客户端回复 `err`。
pub async fn admit(state: &SharedState, line: &str, mut conn: WsConnection) -> bool {
    let handshake = match line.parse::<Handshake>() {
        Ok(handshake) => handshake,
        Err(e) => {
            let context = handshake_context(line);
            warn!(error = %e, "握手失败");
            let _ = conn.send(ServerMessage::Error { context, reason: e.to_string() }.to_string()).await;
            return false;
        }
    };

    match handshake {
        Handshake::Start { config, name } => start(state, config, &name, conn).await,
        Handshake::Join { name } => join(state, &name, conn).await,
    }
}

/// 握手失败时回复的 `err` 上下文：既不是 start 也不是 join 的消息统一为 handshake
fn handshake_context(line: &str) -> &'static str {
    match line.split_whitespace().next() {
        Some("start") => "start",
        Some("join") => "join",
        _ => "handshake",
    }
}

async fn start(state: &SharedState, config: SessionConfig, name: &str, mut conn: WsConnection) -> bool {
    let mut open = state.open.lock().await;
    if open.is_some() {
        let reason = "a game is already waiting for players".to_string();
        let _ = conn.send(ServerMessage::Error { context: "start", reason }.to_string()).await;
        return false;
    }

    let id = Uuid::new_v4();
    let mut table = Table::new(config).with_retry_limit(state.retry_limit);
    if let Err(e) = table.seat(name, conn).await {
        warn!(error = %e, "创建者入座失败");
        return false;
    }

    let mut summary = TableSummary::new(id, config);
    summary.seated = table.session().players.len();
    state.tables.insert(id, summary);
    info!(session = %id, ?config, "创建了新牌桌");
    *open = Some(OpenTable { id, table });
    true
}

async fn join(state: &SharedState, name: &str, mut conn: WsConnection) -> bool {
    let mut open = state.open.lock().await;
    let Some(entry) = open.as_mut() else {
        let reason = if state.tables.is_empty() { "no game has been started" } else { "game full" };
        let _ = conn.send(ServerMessage::Error { context: "join", reason: reason.to_string() }.to_string()).await;
        return false;
    };

    if let Err(e) = entry.table.seat(name, conn).await {
        warn!(session = %entry.id, error = %e, "玩家入座失败");
        return false;
    }
    let seated = entry.table.session().players.len();
    if let Some(mut summary) = state.tables.get_mut(&entry.id) {
        summary.seated = seated;
    }

    if entry.table.is_full() {
        if let Some(OpenTable { id, table }) = open.take() {
            launch(state.clone(), id, table);
        }
    }
    true
}

/// 人齐后在独立的任务中运行牌桌，结束后从列表中移除
fn launch(state: SharedState, id: SessionId, mut table: Table<WsConnection>) {
    if let Some(mut summary) = state.tables.get_mut(&id) {
        summary.status = TableStatus::Running;
    }
    tokio::spawn(
        async move {
            // 错误已经在牌桌内部记录
            let _ = table.run().await;
            state.tables.remove(&id);
        }
        .instrument(info_span!("session", %id)),
    );
}
