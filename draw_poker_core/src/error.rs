use crate::card::Card;
use crate::state::PlayerId;
use thiserror::Error;

/// 游戏内所有可能出现的错误
///
/// 分为三类：
/// - 可恢复的输入错误（`Validation`、`UnknownCard`、`IllegalAction`），由协议层重新提示玩家；
/// - 针对单个玩家的终止性错误（`InsufficientFunds`、`UnexpectedMessage`、`Disconnected`），该玩家被移出；
/// - 内部不变量被破坏（`Invariant` 等），只中止受影响的牌局。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    /// `start` 的参数不合法
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// 座位已满
    #[error("game full, all {0} seats are taken")]
    GameFull(usize),

    #[error("deck is empty")]
    EmptyDeck,

    /// 牌堆中已存在同一张牌
    #[error("card {0} is already in the deck")]
    DuplicateCard(Card),

    #[error("unknown card token '{0}'")]
    UnknownCard(String),

    /// 消息格式错误，或者参数越界
    #[error("{0}")]
    Validation(String),

    /// 当前状态下不允许的动作 (例如非首位行动者过牌)
    #[error("{0}")]
    IllegalAction(String),

    #[error("insufficient funds: wallet holds {available}, {required} required")]
    InsufficientFunds { available: u32, required: u32 },

    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    /// 收到了不属于当前阶段的消息
    #[error("unexpected message '{0}'")]
    UnexpectedMessage(String),

    #[error("connection closed")]
    Disconnected,

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl GameError {
    /// 可以通过重新提示玩家来恢复的错误
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GameError::Validation(_) | GameError::UnknownCard(_) | GameError::IllegalAction(_)
        )
    }
}

pub type GameResult<T> = Result<T, GameError>;
