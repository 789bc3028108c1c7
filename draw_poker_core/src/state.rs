use crate::card::{Card, Deck, Hand};
use crate::error::{GameError, GameResult};
use crate::ledger::BettingLedger;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// 玩家 id 从 1 开始按加入顺序递增，离开后也不会复用
pub type PlayerId = u32;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 5;
/// 最少带入金额
pub const MIN_WALLET: u32 = 5;
/// 换牌阶段一次最多弃掉的牌数
pub const MAX_DISCARD: usize = 3;

/// 一场游戏的固定参数，由第一个 `start` 请求决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionConfig {
    pub num_players: usize,
    pub wallet_amt: u32,
    pub ante_amt: u32,
}

impl SessionConfig {
    pub fn new(num_players: usize, wallet_amt: u32, ante_amt: u32) -> GameResult<Self> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&num_players) {
            return Err(GameError::InvalidArguments(format!(
                "number of players must be between {} and {}",
                MIN_PLAYERS, MAX_PLAYERS
            )));
        }
        if wallet_amt < MIN_WALLET {
            return Err(GameError::InvalidArguments(format!("wallet must be at least {}", MIN_WALLET)));
        }
        if ante_amt == 0 || ante_amt > wallet_amt {
            return Err(GameError::InvalidArguments("ante must be between 1 and the wallet amount".to_string()));
        }
        // 桌上所有的钱都可能进入同一个奖池，总额必须能用 u32 表示
        if u64::from(wallet_amt) * num_players as u64 > u64::from(u32::MAX) {
            return Err(GameError::InvalidArguments(format!(
                "total of all wallets must not exceed {}",
                u32::MAX
            )));
        }
        Ok(Self { num_players, wallet_amt, ante_amt })
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub wallet: u32, // 剩余资金
    pub status: PlayerStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    /// 仍在游戏中
    Active,
    /// 本局已弃牌，下一局恢复为 Active
    Folded,
    /// 已离开，永久不再参与
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    WaitingForPlayers,
    Ante,
    Dealing,
    FirstBetting,
    Draw,
    SecondBetting,
    Showdown,
    HandOver, // 一局结束，结算完成
    Finished,
}

/// 玩家在下注轮中可以做的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Check,       // 过牌，只有本轮第一位行动者可以
    Call,        // 跟到当前最高下注
    Raise(u32),  // 跟注之后再加注的金额
    Fold,
    Leave,
}

/// 每次动作之后下注轮的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BettingStatus {
    /// 还需要有人行动
    Open,
    /// 所有剩余玩家都已行动且下注相同
    Closed,
    /// 只剩一名玩家，直接赢得本局
    WonByFold(PlayerId),
}

impl BettingStatus {
    pub fn is_over(&self) -> bool {
        !matches!(self, BettingStatus::Open)
    }

    pub fn won_by_fold(&self) -> bool {
        matches!(self, BettingStatus::WonByFold(_))
    }
}

/// 下注提示：(当前最高下注, 自己的下注, 是否为首位行动者)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetPrompt {
    pub max_bet: u32,
    pub current_bet: u32,
    pub first_to_act: bool,
}

/// 一场游戏的全部状态，由牌桌独占
#[derive(Debug, Clone)]
pub struct GameSession {
    pub config: SessionConfig,
    pub phase: GamePhase,
    pub deck: Deck,
    pub players: BTreeMap<PlayerId, Player>,
    // 当前这一局每位玩家的手牌
    pub hands: BTreeMap<PlayerId, Hand>,
    // 换牌阶段弃掉的牌，派彩后放回牌堆
    pub muck: Vec<Card>,
    pub ledger: BettingLedger,
    pub turn_id: PlayerId,
    pub folded: BTreeSet<PlayerId>,
    pub left: BTreeSet<PlayerId>,
    // 本轮下注中已经行动过的玩家
    pub acted: BTreeSet<PlayerId>,
    // 本局指定的首位行动者
    pub first_actor: Option<PlayerId>,
    // 本轮下注实际的首位行动者
    pub round_first_actor: Option<PlayerId>,
    pub(crate) next_id: PlayerId,
}

// --- GameSession 的查询方法 ---

impl GameSession {
    pub fn player(&self, id: PlayerId) -> GameResult<&Player> {
        self.players.get(&id).ok_or(GameError::UnknownPlayer(id))
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> GameResult<&mut Player> {
        self.players.get_mut(&id).ok_or(GameError::UnknownPlayer(id))
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.config.num_players
    }

    /// 还没离开游戏的玩家 (按 id 升序)
    pub fn participants(&self) -> Vec<PlayerId> {
        self.players.keys().copied().filter(|id| !self.left.contains(id)).collect()
    }

    /// 本局中既没弃牌也没离开的玩家 (按 id 升序)
    pub fn players_in_hand(&self) -> Vec<PlayerId> {
        self.players
            .keys()
            .copied()
            .filter(|id| self.is_in_hand(*id))
            .collect()
    }

    pub fn is_in_hand(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id) && !self.folded.contains(&id) && !self.left.contains(&id)
    }

    pub fn hand(&self, id: PlayerId) -> Option<&Hand> {
        self.hands.get(&id)
    }

    /// 当前行动玩家收到的下注提示
    pub fn bet_prompt(&self, id: PlayerId) -> BetPrompt {
        BetPrompt {
            max_bet: self.ledger.max_bet().0,
            current_bet: self.ledger.player_bet(id),
            first_to_act: self.round_first_actor == Some(id) && !self.acted.contains(&id),
        }
    }

    /// 所有玩家钱包与奖池之和，一场游戏中应当保持不变
    pub fn total_money(&self) -> u64 {
        let wallets: u64 = self.players.values().map(|p| u64::from(p.wallet)).sum();
        wallets + u64::from(self.ledger.pool_amount())
    }

    /// 牌堆、手牌和弃牌堆中的牌总数
    pub fn cards_in_play(&self) -> usize {
        self.deck.len() + self.hands.values().map(Hand::len).sum::<usize>() + self.muck.len()
    }
}
