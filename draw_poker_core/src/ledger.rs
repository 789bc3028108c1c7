use crate::state::PlayerId;
use std::collections::BTreeMap;

/// 一局牌中每位玩家的累计下注
///
/// 两轮下注之间不清空，只在派彩后 `reset`。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BettingLedger {
    bets: BTreeMap<PlayerId, u32>,
}

impl BettingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累加下注额，玩家的第一次下注会创建记录 (金额可以为 0)
    pub fn add_bet(&mut self, player_id: PlayerId, amount: u32) {
        let total = self.bets.entry(player_id).or_insert(0);
        *total += amount;
        tracing::trace!(player_id, total = *total, "下注累计");
    }

    /// 玩家本局的累计下注，未下注时为 0
    pub fn player_bet(&self, player_id: PlayerId) -> u32 {
        self.bets.get(&player_id).copied().unwrap_or(0)
    }

    pub fn has_bet(&self, player_id: PlayerId) -> bool {
        self.bets.contains_key(&player_id)
    }

    /// 当前最高下注额以及达到该金额的所有玩家 (按 id 升序)
    /// 没有任何下注时返回 (0, [])
    pub fn max_bet(&self) -> (u32, Vec<PlayerId>) {
        let Some(max) = self.bets.values().copied().max() else {
            return (0, Vec::new());
        };
        let ids = self.bets.iter().filter(|(_, amount)| **amount == max).map(|(id, _)| *id).collect();
        (max, ids)
    }

    /// 奖池总额
    pub fn pool_amount(&self) -> u32 {
        self.bets.values().sum()
    }

    pub fn reset(&mut self) {
        self.bets.clear();
    }
}
