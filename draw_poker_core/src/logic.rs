use crate::card::*;
use crate::error::{GameError, GameResult};
use crate::ledger::BettingLedger;
use crate::state::*;
use std::collections::{BTreeMap, BTreeSet};

// --- 核心游戏流程函数 ---

impl GameSession {
    /// 根据 `start` 请求创建一场新游戏，此时还没有任何玩家
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            phase: GamePhase::WaitingForPlayers,
            deck: Deck::new(),
            players: BTreeMap::new(),
            hands: BTreeMap::new(),
            muck: Vec::new(),
            ledger: BettingLedger::new(),
            turn_id: 1,
            folded: BTreeSet::new(),
            left: BTreeSet::new(),
            acted: BTreeSet::new(),
            first_actor: None,
            round_first_actor: None,
            next_id: 1,
        }
    }

    /// 玩家加入，返回新分配的 id
    ///
    /// 座位已满时返回 `GameFull`，不修改任何状态。
    pub fn join(&mut self, name: &str) -> GameResult<PlayerId> {
        if self.is_full() {
            return Err(GameError::GameFull(self.config.num_players));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.players.insert(id, Player {
            id,
            name: name.to_string(),
            wallet: self.config.wallet_amt,
            status: PlayerStatus::Active,
        });
        Ok(id)
    }

    /// 玩家永久离开。已下的注留在奖池中，手牌在派彩时收回。
    pub fn leave(&mut self, id: PlayerId) -> GameResult<Player> {
        let player = self.player_mut(id)?;
        player.status = PlayerStatus::Left;
        let player = player.clone();
        self.left.insert(id);
        Ok(player)
    }

    /// 开始新的一局
    ///
    /// - 检查上一局的牌已全部收回。
    /// - 弃牌的玩家恢复为 Active。
    /// - 洗牌，进入 Ante 阶段。
    pub fn begin_hand(&mut self) -> GameResult<()> {
        if !self.hands.is_empty() || !self.muck.is_empty() || self.deck.len() != DECK_SIZE {
            return Err(GameError::Invariant("cards from the previous hand were not returned".to_string()));
        }
        if self.ledger.pool_amount() != 0 {
            return Err(GameError::Invariant("pool was not paid out".to_string()));
        }

        for id in std::mem::take(&mut self.folded) {
            if let Some(player) = self.players.get_mut(&id) {
                if player.status == PlayerStatus::Folded {
                    player.status = PlayerStatus::Active;
                }
            }
        }
        self.acted.clear();
        self.round_first_actor = None;
        self.deck.shuffle();
        self.phase = GamePhase::Ante;
        Ok(())
    }

    /// 玩家缴纳底注
    pub fn ante(&mut self, id: PlayerId) -> GameResult<()> {
        if self.phase != GamePhase::Ante {
            return Err(GameError::IllegalAction("antes are only collected before the deal".to_string()));
        }
        if !self.is_in_hand(id) {
            return Err(GameError::IllegalAction(format!("player {} is not in this hand", id)));
        }
        if self.ledger.has_bet(id) {
            return Err(GameError::IllegalAction(format!("player {} already paid the ante", id)));
        }
        let ante = self.config.ante_amt;
        self.withdraw(id, ante)?;
        self.ledger.add_bet(id, ante);
        Ok(())
    }

    /// 轮流给本局每位玩家发 5 张牌 (每轮一张)
    pub fn deal_hands(&mut self) -> GameResult<BTreeMap<PlayerId, Vec<Card>>> {
        if self.phase != GamePhase::Ante {
            return Err(GameError::Invariant(format!("cannot deal during {:?}", self.phase)));
        }
        self.phase = GamePhase::Dealing;

        let in_hand = self.players_in_hand();
        for id in &in_hand {
            self.hands.insert(*id, Hand::new());
        }
        for _ in 0..HAND_SIZE {
            for id in &in_hand {
                let card = self.deck.deal_card()?;
                if let Some(hand) = self.hands.get_mut(id) {
                    hand.add_card(card)?;
                }
            }
        }
        Ok(self.hands.iter().map(|(id, hand)| (*id, hand.cards().to_vec())).collect())
    }

    /// 指定本局的首位行动者
    ///
    /// 第一局是 id 最小的玩家，之后每局轮换到上一位首位行动者之后的玩家。
    pub fn designate_first_actor(&mut self) -> GameResult<PlayerId> {
        let in_hand = self.players_in_hand();
        let next = match self.first_actor {
            None => in_hand.first(),
            Some(prev) => in_hand.iter().find(|id| **id > prev).or(in_hand.first()),
        }
        .copied()
        .ok_or_else(|| GameError::Invariant("no player left to act".to_string()))?;
        self.first_actor = Some(next);
        Ok(next)
    }

    /// 本轮的行动顺序：id >= first 的玩家在前，其余绕回，排除弃牌和离开的玩家
    pub fn betting_order(&self, first: PlayerId) -> Vec<PlayerId> {
        let (after, before): (Vec<_>, Vec<_>) = self.players_in_hand().into_iter().partition(|id| *id >= first);
        after.into_iter().chain(before).collect()
    }

    /// 开始一轮下注，返回本轮第一位行动者
    ///
    /// 指定的首位行动者已经出局时，由顺序上的下一位玩家开局。
    pub fn start_betting_round(&mut self, phase: GamePhase) -> GameResult<PlayerId> {
        if !matches!(phase, GamePhase::FirstBetting | GamePhase::SecondBetting) {
            return Err(GameError::Invariant(format!("{:?} is not a betting phase", phase)));
        }
        let designated = self
            .first_actor
            .ok_or_else(|| GameError::Invariant("first actor was not designated".to_string()))?;
        let first = self
            .betting_order(designated)
            .first()
            .copied()
            .ok_or_else(|| GameError::Invariant("no player left to act".to_string()))?;

        self.phase = phase;
        self.acted.clear();
        self.round_first_actor = Some(first);
        self.turn_id = first;
        Ok(first)
    }

    /// 把行动权交给下一位合法玩家
    ///
    /// id 从 1 开始循环，跳过弃牌和离开的玩家；合法玩家少于 2 人时保持不变。
    pub fn increment_turn(&mut self) {
        let n = self.config.num_players as PlayerId;
        let out = self.folded.union(&self.left).count();
        if self.config.num_players.saturating_sub(out) < 2 {
            return;
        }

        let mut turn = self.turn_id;
        loop {
            turn = turn % n + 1;
            if !self.folded.contains(&turn) && !self.left.contains(&turn) {
                break;
            }
        }
        self.turn_id = turn;
    }

    /// 处理当前行动玩家的一个下注动作
    ///
    /// 校验失败时不会修改任何状态；资金不足返回 `InsufficientFunds`，由牌桌把玩家移出。
    pub fn apply_action(&mut self, id: PlayerId, action: PlayerAction) -> GameResult<()> {
        if !matches!(self.phase, GamePhase::FirstBetting | GamePhase::SecondBetting) {
            return Err(GameError::IllegalAction("no betting round in progress".to_string()));
        }
        if id != self.turn_id || !self.is_in_hand(id) {
            return Err(GameError::IllegalAction(format!("it is not player {}'s turn", id)));
        }

        let prompt = self.bet_prompt(id);
        let to_call = prompt.max_bet - prompt.current_bet;
        match action {
            PlayerAction::Check => {
                if !prompt.first_to_act {
                    return Err(GameError::IllegalAction(
                        "only the first player to act may check".to_string(),
                    ));
                }
                self.ledger.add_bet(id, 0);
            }
            PlayerAction::Call => {
                self.withdraw(id, to_call)?;
                self.ledger.add_bet(id, to_call);
            }
            PlayerAction::Raise(amount) => {
                if amount == 0 {
                    return Err(GameError::Validation("raise amount must be positive".to_string()));
                }
                let total = to_call
                    .checked_add(amount)
                    .ok_or_else(|| GameError::Validation("raise amount is too large".to_string()))?;
                self.withdraw(id, total)?;
                self.ledger.add_bet(id, total);
            }
            PlayerAction::Fold => {
                self.player_mut(id)?.status = PlayerStatus::Folded;
                self.folded.insert(id);
            }
            PlayerAction::Leave => {
                self.leave(id)?;
            }
        }
        self.acted.insert(id);
        Ok(())
    }

    /// 检查当前下注轮是否结束
    pub fn is_betting_over(&self) -> GameResult<BettingStatus> {
        let remaining = self.players_in_hand();
        match remaining.as_slice() {
            [] => Err(GameError::Invariant("no players remain in the hand".to_string())),
            [winner] => Ok(BettingStatus::WonByFold(*winner)),
            [first, ..] => {
                let target = self.ledger.player_bet(*first);
                let settled = remaining
                    .iter()
                    .all(|id| self.acted.contains(id) && self.ledger.player_bet(*id) == target);
                Ok(if settled { BettingStatus::Closed } else { BettingStatus::Open })
            }
        }
    }

    pub fn start_draw(&mut self) {
        self.phase = GamePhase::Draw;
    }

    /// 弃掉指定位置 (从 1 开始) 的牌，并从牌堆补发同样数量的牌
    pub fn discard_and_draw(&mut self, id: PlayerId, positions: &[usize]) -> GameResult<Vec<Card>> {
        if self.phase != GamePhase::Draw {
            return Err(GameError::IllegalAction("cards can only be exchanged during the draw".to_string()));
        }
        if !self.is_in_hand(id) {
            return Err(GameError::IllegalAction(format!("player {} is not in this hand", id)));
        }
        if positions.len() > MAX_DISCARD {
            return Err(GameError::IllegalAction(format!("at most {} cards may be discarded", MAX_DISCARD)));
        }

        let hand = self
            .hands
            .get_mut(&id)
            .ok_or_else(|| GameError::Invariant(format!("player {} holds no hand", id)))?;
        let discarded = hand.discard(positions)?;
        self.muck.extend(discarded);

        let mut drawn = Vec::with_capacity(positions.len());
        for _ in 0..positions.len() {
            let card = self.deck.deal_card()?;
            hand.add_card(card)?;
            drawn.push(card);
        }
        Ok(drawn)
    }

    /// 进入摊牌，返回仍在本局中的玩家手牌
    pub fn begin_showdown(&mut self) -> BTreeMap<PlayerId, Hand> {
        self.phase = GamePhase::Showdown;
        self.hands
            .iter()
            .filter(|(id, _)| self.is_in_hand(**id))
            .map(|(id, hand)| (*id, hand.clone()))
            .collect()
    }

    /// 将奖池分配给赢家
    ///
    /// 返回每位玩家本局赢得的金额 (输家为 0)。派彩后清空下注记录，
    /// 所有手牌和弃牌放回牌堆底。
    pub fn payout(&mut self, winners: &[PlayerId]) -> GameResult<BTreeMap<PlayerId, u32>> {
        let mut winners = winners.to_vec();
        winners.sort_unstable();
        winners.dedup();
        if winners.is_empty() {
            return Err(GameError::Invariant("a hand must have at least one winner".to_string()));
        }

        let mut result: BTreeMap<PlayerId, u32> = self.players.keys().map(|id| (*id, 0)).collect();
        for (id, share) in split_pool(self.ledger.pool_amount(), &winners) {
            let player = self.player_mut(id)?;
            player.wallet = player
                .wallet
                .checked_add(share)
                .ok_or_else(|| GameError::Invariant(format!("wallet of player {} overflowed", id)))?;
            result.insert(id, share);
        }

        self.ledger.reset();
        self.collect_cards()?;
        self.phase = GamePhase::HandOver;
        Ok(result)
    }

    /// 所有玩家都在本局中途离开：奖池无人领取，收回牌后结束本局
    ///
    /// 返回被没收的金额。
    pub fn abandon_hand(&mut self) -> GameResult<u32> {
        let forfeited = self.ledger.pool_amount();
        self.ledger.reset();
        self.collect_cards()?;
        self.phase = GamePhase::HandOver;
        Ok(forfeited)
    }

    pub fn finish(&mut self) {
        self.phase = GamePhase::Finished;
    }

    // --- 辅助逻辑函数 ---

    /// 从钱包扣款，余额不足时不做任何修改
    fn withdraw(&mut self, id: PlayerId, amount: u32) -> GameResult<()> {
        let player = self.player_mut(id)?;
        if player.wallet < amount {
            return Err(GameError::InsufficientFunds { available: player.wallet, required: amount });
        }
        player.wallet -= amount;
        Ok(())
    }

    /// 收回所有手牌和弃牌，放到牌堆底
    fn collect_cards(&mut self) -> GameResult<()> {
        let mut returned = Vec::new();
        for hand in self.hands.values_mut() {
            returned.extend(hand.take_cards());
        }
        returned.append(&mut self.muck);
        self.hands.clear();

        for card in returned {
            self.deck.add_card_to_bottom(card)?;
        }
        Ok(())
    }
}

/// 按 id 升序平分奖池，余数从 id 最小的赢家开始每人多分 1
pub fn split_pool(pool: u32, winners: &[PlayerId]) -> Vec<(PlayerId, u32)> {
    if winners.is_empty() {
        return Vec::new();
    }
    let mut sorted = winners.to_vec();
    sorted.sort_unstable();

    let count = sorted.len() as u32;
    let base = pool / count;
    let remainder = (pool % count) as usize;
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, id)| (id, if i < remainder { base + 1 } else { base }))
        .collect()
}

// --- 单元测试 ---

#[cfg(test)]
mod tests {
    use super::*;

    // 辅助函数：创建已坐满的游戏，并完成底注和发牌
    fn setup_test_game(num_players: usize, wallet: u32, ante: u32) -> GameSession {
        let config = SessionConfig::new(num_players, wallet, ante).unwrap();
        let mut session = GameSession::new(config);
        for i in 0..num_players {
            session.join(&format!("Player_{}", i + 1)).unwrap();
        }
        session
    }

    fn ante_and_deal(session: &mut GameSession) {
        session.begin_hand().unwrap();
        for id in session.participants() {
            session.ante(id).unwrap();
        }
        session.deal_hands().unwrap();
        session.designate_first_actor().unwrap();
    }

    #[test]
    fn test_config_validation() {
        assert!(SessionConfig::new(1, 100, 5).is_err());
        assert!(SessionConfig::new(6, 100, 5).is_err());
        assert!(SessionConfig::new(3, 4, 1).is_err());
        assert!(SessionConfig::new(3, 100, 0).is_err());
        assert!(SessionConfig::new(3, 100, 101).is_err());
        assert!(SessionConfig::new(5, 5, 5).is_ok());
    }

    #[test]
    fn test_config_rejects_wallets_that_could_overflow_the_pool() {
        assert!(matches!(
            SessionConfig::new(2, 3_000_000_000, 1),
            Err(GameError::InvalidArguments(_))
        ));
        assert!(SessionConfig::new(2, u32::MAX / 2 + 1, 1).is_err());
        assert!(SessionConfig::new(5, u32::MAX / 5 + 1, 1).is_err());
        assert!(SessionConfig::new(5, u32::MAX / 5, 1).is_ok());
    }

    #[test]
    fn test_largest_wallets_fit_in_one_pool() {
        let wallet = u32::MAX / 2;
        let mut session = setup_test_game(2, wallet, 1);
        ante_and_deal(&mut session);
        session.start_betting_round(GamePhase::FirstBetting).unwrap();

        // 1 押上全部资金，2 跟注
        session.apply_action(1, PlayerAction::Raise(wallet - 1)).unwrap();
        session.increment_turn();
        session.apply_action(2, PlayerAction::Call).unwrap();
        assert_eq!(session.is_betting_over().unwrap(), BettingStatus::Closed);
        assert_eq!(session.ledger.pool_amount(), wallet * 2);

        let result = session.payout(&[1]).unwrap();
        assert_eq!(result[&1], wallet * 2);
        assert_eq!(session.player(1).unwrap().wallet, wallet * 2);
        assert_eq!(session.player(2).unwrap().wallet, 0);
        assert_eq!(session.total_money(), u64::from(wallet) * 2);
    }

    #[test]
    fn test_join_assigns_increasing_ids_until_full() {
        let mut session = GameSession::new(SessionConfig::new(2, 100, 5).unwrap());
        assert_eq!(session.join("alice").unwrap(), 1);
        assert_eq!(session.join("bob").unwrap(), 2);
        assert_eq!(session.join("carol"), Err(GameError::GameFull(2)));
        assert_eq!(session.players.len(), 2);
        assert_eq!(session.player(1).unwrap().wallet, 100);
    }

    #[test]
    fn test_leave_is_permanent() {
        let mut session = setup_test_game(3, 100, 5);
        let player = session.leave(2).unwrap();
        assert_eq!(player.status, PlayerStatus::Left);
        assert_eq!(session.participants(), vec![1, 3]);

        session.begin_hand().unwrap();
        assert_eq!(session.player(2).unwrap().status, PlayerStatus::Left);
        assert!(session.ante(2).is_err());
    }

    #[test]
    fn test_increment_turn_skips_folded() {
        let mut session = setup_test_game(4, 100, 5);
        session.folded.insert(2);
        session.turn_id = 1;
        session.increment_turn();
        assert_eq!(session.turn_id, 3);
    }

    #[test]
    fn test_increment_turn_wraps_to_first_id() {
        let mut session = setup_test_game(4, 100, 5);
        session.left.insert(1);
        session.turn_id = 4;
        session.increment_turn();
        assert_eq!(session.turn_id, 2);
    }

    #[test]
    fn test_increment_turn_freezes_with_one_eligible_player() {
        let mut session = setup_test_game(3, 100, 5);
        session.folded.insert(1);
        session.left.insert(3);
        session.turn_id = 2;
        session.increment_turn();
        assert_eq!(session.turn_id, 2);
    }

    #[test]
    fn test_betting_order_wraps_around_first_actor() {
        let mut session = setup_test_game(5, 100, 5);
        session.folded.insert(4);
        assert_eq!(session.betting_order(3), vec![3, 5, 1, 2]);
        assert_eq!(session.betting_order(1), vec![1, 2, 3, 5]);
    }

    #[test]
    fn test_first_actor_rotates_between_hands() {
        let mut session = setup_test_game(3, 100, 5);
        ante_and_deal(&mut session);
        assert_eq!(session.first_actor, Some(1));
        session.payout(&[1]).unwrap();

        ante_and_deal(&mut session);
        assert_eq!(session.first_actor, Some(2));
        session.payout(&[2]).unwrap();

        session.leave(3).unwrap();
        ante_and_deal(&mut session);
        assert_eq!(session.first_actor, Some(1), "离开的玩家被跳过并绕回");
    }

    #[test]
    fn test_betting_over_when_all_equal_and_acted() {
        let mut session = setup_test_game(3, 100, 20);
        ante_and_deal(&mut session);
        session.start_betting_round(GamePhase::FirstBetting).unwrap();
        assert_eq!(session.is_betting_over().unwrap(), BettingStatus::Open);

        for id in [1, 2, 3] {
            assert_eq!(session.ledger.player_bet(id), 20);
            session.acted.insert(id);
        }
        let status = session.is_betting_over().unwrap();
        assert_eq!(status, BettingStatus::Closed);
        assert!(status.is_over() && !status.won_by_fold());
    }

    #[test]
    fn test_betting_over_by_fold() {
        let mut session = setup_test_game(3, 100, 5);
        ante_and_deal(&mut session);
        session.folded.insert(1);
        session.folded.insert(3);
        let status = session.is_betting_over().unwrap();
        assert_eq!(status, BettingStatus::WonByFold(2));
        assert!(status.is_over() && status.won_by_fold());
    }

    #[test]
    fn test_betting_with_nobody_left_is_an_invariant_violation() {
        let mut session = setup_test_game(2, 100, 5);
        session.folded.insert(1);
        session.left.insert(2);
        assert!(matches!(session.is_betting_over(), Err(GameError::Invariant(_))));
    }

    #[test]
    fn test_only_first_actor_may_check() {
        let mut session = setup_test_game(3, 100, 5);
        ante_and_deal(&mut session);
        session.start_betting_round(GamePhase::FirstBetting).unwrap();

        assert!(session.bet_prompt(1).first_to_act);
        session.apply_action(1, PlayerAction::Check).unwrap();
        session.increment_turn();

        let prompt = session.bet_prompt(2);
        assert!(!prompt.first_to_act);
        assert!(matches!(session.apply_action(2, PlayerAction::Check), Err(GameError::IllegalAction(_))));
        assert!(!session.acted.contains(&2));
    }

    #[test]
    fn test_out_of_turn_action_is_rejected() {
        let mut session = setup_test_game(3, 100, 5);
        ante_and_deal(&mut session);
        session.start_betting_round(GamePhase::FirstBetting).unwrap();
        assert!(matches!(session.apply_action(3, PlayerAction::Call), Err(GameError::IllegalAction(_))));
    }

    #[test]
    fn test_raise_and_call_amounts() {
        let mut session = setup_test_game(3, 100, 5);
        ante_and_deal(&mut session);
        session.start_betting_round(GamePhase::FirstBetting).unwrap();

        session.apply_action(1, PlayerAction::Raise(10)).unwrap();
        assert_eq!(session.ledger.player_bet(1), 15);
        assert_eq!(session.player(1).unwrap().wallet, 85);
        session.increment_turn();

        session.apply_action(2, PlayerAction::Raise(5)).unwrap();
        assert_eq!(session.ledger.player_bet(2), 20);
        session.increment_turn();

        session.apply_action(3, PlayerAction::Call).unwrap();
        assert_eq!(session.ledger.player_bet(3), 20);
        assert_eq!(session.player(3).unwrap().wallet, 80);
        assert_eq!(session.is_betting_over().unwrap(), BettingStatus::Open);
        session.increment_turn();

        session.apply_action(1, PlayerAction::Call).unwrap();
        assert_eq!(session.ledger.max_bet(), (20, vec![1, 2, 3]));
        assert_eq!(session.is_betting_over().unwrap(), BettingStatus::Closed);
        assert_eq!(session.ledger.pool_amount(), 60);
    }

    #[test]
    fn test_zero_raise_is_rejected() {
        let mut session = setup_test_game(2, 100, 5);
        ante_and_deal(&mut session);
        session.start_betting_round(GamePhase::FirstBetting).unwrap();
        assert!(matches!(session.apply_action(1, PlayerAction::Raise(0)), Err(GameError::Validation(_))));
    }

    #[test]
    fn test_insufficient_funds_leaves_state_untouched() {
        let mut session = setup_test_game(2, 10, 5);
        ante_and_deal(&mut session);
        session.start_betting_round(GamePhase::FirstBetting).unwrap();
        let err = session.apply_action(1, PlayerAction::Raise(6)).unwrap_err();
        assert_eq!(err, GameError::InsufficientFunds { available: 5, required: 6 });
        assert_eq!(session.player(1).unwrap().wallet, 5);
        assert_eq!(session.ledger.player_bet(1), 5);
        assert!(session.acted.is_empty());
    }

    #[test]
    fn test_fold_and_leave_remove_players_from_the_round() {
        let mut session = setup_test_game(4, 100, 5);
        ante_and_deal(&mut session);
        session.start_betting_round(GamePhase::FirstBetting).unwrap();

        session.apply_action(1, PlayerAction::Fold).unwrap();
        session.increment_turn();
        assert_eq!(session.turn_id, 2);
        session.apply_action(2, PlayerAction::Leave).unwrap();
        session.increment_turn();
        assert_eq!(session.turn_id, 3);
        assert_eq!(session.betting_order(1), vec![3, 4]);

        session.apply_action(3, PlayerAction::Fold).unwrap();
        assert_eq!(session.is_betting_over().unwrap(), BettingStatus::WonByFold(4));
        assert_eq!(session.player(2).unwrap().status, PlayerStatus::Left);
    }

    #[test]
    fn test_discard_and_draw() {
        let mut session = setup_test_game(2, 100, 5);
        ante_and_deal(&mut session);
        session.start_draw();

        let before = session.hand(1).unwrap().cards().to_vec();
        let drawn = session.discard_and_draw(1, &[2, 5]).unwrap();
        assert_eq!(drawn.len(), 2);

        let after = session.hand(1).unwrap().cards().to_vec();
        assert_eq!(after.len(), HAND_SIZE);
        assert_eq!(&after[..3], &[before[0], before[2], before[3]]);
        assert_eq!(&after[3..], drawn.as_slice());
        assert_eq!(session.muck, vec![before[1], before[4]]);
        assert_eq!(session.cards_in_play(), DECK_SIZE);
    }

    #[test]
    fn test_discard_limits() {
        let mut session = setup_test_game(2, 100, 5);
        ante_and_deal(&mut session);
        session.start_draw();
        assert!(matches!(session.discard_and_draw(1, &[1, 2, 3, 4]), Err(GameError::IllegalAction(_))));
        assert!(matches!(session.discard_and_draw(1, &[6]), Err(GameError::IllegalAction(_))));
        assert!(session.discard_and_draw(1, &[]).unwrap().is_empty());
        assert_eq!(session.hand(1).unwrap().len(), HAND_SIZE);
    }

    #[test]
    fn test_split_pool_remainder_goes_to_lowest_ids() {
        let shares = split_pool(100, &[3, 1, 2]);
        assert_eq!(shares, vec![(1, 34), (2, 33), (3, 33)]);
        assert_eq!(shares.iter().map(|(_, s)| s).sum::<u32>(), 100);

        assert_eq!(split_pool(7, &[2, 4]), vec![(2, 4), (4, 3)]);
        assert_eq!(split_pool(25, &[1]), vec![(1, 25)]);
        assert!(split_pool(10, &[]).is_empty());
    }

    #[test]
    fn test_payout_returns_all_cards_to_the_deck() {
        let mut session = setup_test_game(3, 100, 5);
        ante_and_deal(&mut session);
        session.start_draw();
        session.discard_and_draw(2, &[1, 2, 3]).unwrap();
        assert!(session.deck.len() < DECK_SIZE);

        let result = session.payout(&[2, 3]).unwrap();
        assert_eq!(result, BTreeMap::from([(1, 0), (2, 8), (3, 7)]));
        assert_eq!(session.deck.len(), DECK_SIZE);
        assert!(session.hands.is_empty() && session.muck.is_empty());
        assert_eq!(session.ledger.pool_amount(), 0);
        assert_eq!(session.phase, GamePhase::HandOver);
        assert_eq!(session.total_money(), 300);
    }

    #[test]
    fn test_abandoned_hand_still_returns_cards() {
        let mut session = setup_test_game(2, 100, 5);
        ante_and_deal(&mut session);
        session.leave(1).unwrap();
        session.leave(2).unwrap();
        assert_eq!(session.abandon_hand().unwrap(), 10);
        assert_eq!(session.deck.len(), DECK_SIZE);
        assert_eq!(session.ledger.pool_amount(), 0);
    }

    #[test]
    fn test_two_player_hand_end_to_end() {
        let mut session = setup_test_game(2, 100, 5);
        session.begin_hand().unwrap();
        session.ante(1).unwrap();
        session.ante(2).unwrap();
        assert_eq!(session.ledger.pool_amount(), 10);
        session.deal_hands().unwrap();
        assert_eq!(session.designate_first_actor().unwrap(), 1);

        // 第一轮：1 过牌，2 跟注 0
        session.start_betting_round(GamePhase::FirstBetting).unwrap();
        session.apply_action(1, PlayerAction::Check).unwrap();
        assert_eq!(session.ledger.player_bet(1), 5);
        assert_eq!(session.is_betting_over().unwrap(), BettingStatus::Open);
        session.increment_turn();
        session.apply_action(2, PlayerAction::Call).unwrap();
        assert_eq!(session.ledger.player_bet(2), 5);
        assert_eq!(session.is_betting_over().unwrap(), BettingStatus::Closed);

        // 换牌：都不换
        session.start_draw();
        for id in session.betting_order(1) {
            session.discard_and_draw(id, &[]).unwrap();
        }

        // 第二轮：1 加注 10，2 弃牌
        assert_eq!(session.start_betting_round(GamePhase::SecondBetting).unwrap(), 1);
        session.apply_action(1, PlayerAction::Raise(10)).unwrap();
        assert_eq!(session.ledger.player_bet(1), 15);
        session.increment_turn();
        session.apply_action(2, PlayerAction::Fold).unwrap();
        let status = session.is_betting_over().unwrap();
        assert_eq!(status, BettingStatus::WonByFold(1));

        let pool = session.ledger.pool_amount();
        assert_eq!(pool, 20);
        let result = session.payout(&[1]).unwrap();
        assert_eq!(result[&1], pool);
        assert_eq!(result[&2], 0);
        assert_eq!(session.player(1).unwrap().wallet, 105);
        assert_eq!(session.player(2).unwrap().wallet, 95);
        assert_eq!(session.total_money(), 200);

        // 下一局弃牌玩家恢复
        session.begin_hand().unwrap();
        assert_eq!(session.player(2).unwrap().status, PlayerStatus::Active);
        assert_eq!(session.deck.len(), DECK_SIZE);
    }
}
