use crate::error::{GameError, GameResult};
use crate::evaluator::{HandEvaluator, StandardEvaluator};
use crate::message::*;
use crate::state::*;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 默认允许玩家连续发送无效回复的次数
pub const DEFAULT_RETRY_LIMIT: usize = 3;

/// 与单个玩家之间的连接
///
/// 传输层负责分帧：`send` 发出一条完整消息，`recv` 返回下一条完整消息。
/// 连接断开时两者都返回 `GameError::Disconnected`。
#[async_trait]
pub trait Connection: Send {
    async fn send(&mut self, line: String) -> GameResult<()>;
    async fn recv(&mut self) -> GameResult<String>;
}

/// 牌桌：独占一场游戏的全部状态，按顺序与玩家逐一交互
///
/// 同一时刻只处理一位玩家的一个动作，所有状态修改都经过这里。
pub struct Table<C> {
    session: GameSession,
    // 将 PlayerId 映射到具体的网络连接，玩家离开后移除
    seats: BTreeMap<PlayerId, C>,
    evaluator: Arc<dyn HandEvaluator>,
    retry_limit: usize,
    hands_played: u32,
}

impl<C: Connection> Table<C> {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            session: GameSession::new(config),
            seats: BTreeMap::new(),
            evaluator: Arc::new(StandardEvaluator),
            retry_limit: DEFAULT_RETRY_LIMIT,
            hands_played: 0,
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn HandEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_retry_limit(mut self, retry_limit: usize) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn is_full(&self) -> bool {
        self.session.is_full()
    }

    /// 玩家入座：分配 id，回复 `ack join`，并通知所有人还差几位玩家
    pub async fn seat(&mut self, name: &str, conn: C) -> GameResult<PlayerId> {
        let id = self.session.join(name)?;
        self.seats.insert(id, conn);
        info!(player_id = id, name, "玩家入座");

        let wallet = self.session.config.wallet_amt;
        self.send(id, ServerMessage::AckJoin { id, wallet }).await;

        let missing = self.session.config.num_players - self.session.players.len();
        let text = match missing {
            0 => "All players have joined".to_string(),
            n => format!("Waiting for {} more player(s)", n),
        };
        self.broadcast(&self.session.participants(), ServerMessage::Notify(text)).await;
        Ok(id)
    }

    /// 运行整场游戏，直到不足两人或玩家不再继续
    ///
    /// 只有内部不变量被破坏时才返回错误，此时这场游戏被中止。
    pub async fn run(&mut self) -> GameResult<()> {
        info!(players = ?self.session.participants(), "游戏开始");
        self.broadcast(&self.session.participants(), ServerMessage::Begin).await;

        let result = self.play().await;
        self.session.finish();
        self.seats.clear();
        match &result {
            Ok(()) => info!(hands = self.hands_played, "游戏结束"),
            Err(e) => error!(error = %e, "游戏中止"),
        }
        result
    }

    async fn play(&mut self) -> GameResult<()> {
        loop {
            let participants = self.session.participants();
            if participants.len() < MIN_PLAYERS {
                self.broadcast(&participants, ServerMessage::SessionOver).await;
                return Ok(());
            }
            self.play_hand().await?;
            if !self.offer_new_hand().await? {
                return Ok(());
            }
        }
    }

    // --- 一局牌的各个阶段 ---

    async fn play_hand(&mut self) -> GameResult<()> {
        self.session.begin_hand()?;
        self.hands_played += 1;
        info!(hand = self.hands_played, players = ?self.session.participants(), "新的一局开始");

        self.collect_antes().await?;
        if self.session.players_in_hand().len() < MIN_PLAYERS {
            // 底注之后不足两人，不发牌
            let winners = self.session.players_in_hand();
            if let Some(winner) = winners.first() {
                let text = format!("Player {} is the only one left and takes the pool", winner);
                self.broadcast(&self.session.participants(), ServerMessage::Notify(text)).await;
            }
            return self.conclude(winners).await;
        }

        self.deal().await?;
        if self.session.players_in_hand().is_empty() {
            return self.conclude(Vec::new()).await;
        }
        let first = self.session.designate_first_actor()?;
        debug!(first_actor = first, "指定首位行动者");

        let mut status = self.betting_round(GamePhase::FirstBetting).await?;
        let outcome = if status.won_by_fold() {
            RoundOutcome::Winner
        } else {
            RoundOutcome::Betting
        };
        self.end_round(outcome).await;

        if outcome == RoundOutcome::Betting {
            let remaining = self.session.players_in_hand();
            if remaining.len() < MIN_PLAYERS {
                // 本轮结束后有人断线，不再换牌
                return self.conclude(remaining).await;
            }
            self.draw_phase().await?;
            if self.session.players_in_hand().is_empty() {
                return self.conclude(Vec::new()).await;
            }
            status = self.betting_round(GamePhase::SecondBetting).await?;
            self.end_round(RoundOutcome::Winner).await;
        }

        let winners = match status {
            BettingStatus::WonByFold(winner) => vec![winner],
            _ => self.showdown().await,
        };
        self.conclude(winners).await
    }

    async fn collect_antes(&mut self) -> GameResult<()> {
        let ante = self.session.config.ante_amt;
        for id in self.session.participants() {
            let wallet = self.session.player(id)?.wallet;
            if wallet < ante {
                // 资金不足直接出局，不等待回复
                self.send(id, ServerMessage::AntePrompt { ante, respond: false }).await;
                let reason = GameError::InsufficientFunds { available: wallet, required: ante }.to_string();
                self.send(id, ServerMessage::Error { context: "ante", reason }).await;
                self.depart(id, "cannot cover the ante");
                continue;
            }

            let prompt = ServerMessage::AntePrompt { ante, respond: true };
            let paid = self
                .exchange(id, prompt, "ante", |session, reply: AnteReply| match reply {
                    AnteReply::Ante { id: claimed, amount } => {
                        expect_id(id, claimed)?;
                        if amount != ante {
                            return Err(GameError::Validation(format!("the ante is {}", ante)));
                        }
                        session.ante(id)?;
                        Ok(true)
                    }
                    AnteReply::Leave { id: claimed } => {
                        expect_id(id, claimed)?;
                        Ok(false)
                    }
                })
                .await?;
            if paid == Some(false) {
                self.depart(id, "left before the deal");
                self.announce(id, describe(id, PlayerAction::Leave)).await;
            }
        }
        Ok(())
    }

    async fn deal(&mut self) -> GameResult<()> {
        let hands = self.session.deal_hands()?;
        for (id, cards) in hands {
            self.exchange(id, ServerMessage::Deal(cards), "deal", |_, _: Received| Ok(())).await?;
        }
        Ok(())
    }

    /// 一轮下注：从本轮首位行动者开始依次提示，直到下注结束
    async fn betting_round(&mut self, phase: GamePhase) -> GameResult<BettingStatus> {
        let first = self.session.start_betting_round(phase)?;
        self.broadcast(&self.session.players_in_hand(), ServerMessage::FirstActor(first)).await;

        loop {
            let status = self.session.is_betting_over()?;
            if status.is_over() {
                debug!(?phase, ?status, pool = self.session.ledger.pool_amount(), "下注轮结束");
                return Ok(status);
            }

            let id = self.session.turn_id;
            let prompt = ServerMessage::BetPrompt(self.session.bet_prompt(id));
            let action = self
                .exchange(id, prompt, "bet", |session, reply: BetReply| {
                    expect_id(id, reply.id)?;
                    session.apply_action(id, reply.action)?;
                    Ok(reply.action)
                })
                .await?;

            if let Some(action) = action {
                debug!(player_id = id, ?action, bet = self.session.ledger.player_bet(id), "玩家行动");
                if action == PlayerAction::Leave {
                    self.depart(id, "left the game");
                }
                self.announce(id, describe(id, action)).await;
            }
            self.session.increment_turn();
        }
    }

    async fn end_round(&mut self, outcome: RoundOutcome) {
        let participants = self.session.participants();
        self.broadcast(&participants, ServerMessage::RoundOver).await;
        self.broadcast(&participants, ServerMessage::Outcome(outcome)).await;
    }

    /// 换牌阶段：按行动顺序让每位剩余玩家选择弃牌
    async fn draw_phase(&mut self) -> GameResult<()> {
        self.session.start_draw();
        let first = self
            .session
            .first_actor
            .ok_or_else(|| GameError::Invariant("first actor was not designated".to_string()))?;

        for id in self.session.betting_order(first) {
            if !self.session.is_in_hand(id) {
                continue;
            }
            let drawn = self
                .exchange(id, ServerMessage::DiscardPrompt, "discard", |session, reply: DiscardReply| {
                    session.discard_and_draw(id, &reply.0)
                })
                .await?;
            let Some(cards) = drawn else {
                continue;
            };

            let count = cards.len();
            if count > 0 {
                self.exchange(id, ServerMessage::Deal(cards), "deal", |_, _: Received| Ok(())).await?;
            }
            self.announce(id, format!("Player {} exchanged {} card(s)", id, count)).await;
        }
        Ok(())
    }

    /// 摊牌：公开剩余玩家的手牌并由评估器决定赢家
    async fn showdown(&mut self) -> Vec<PlayerId> {
        let hands = self.session.begin_showdown();
        let winners = self.evaluator.evaluate(&hands);

        let participants = self.session.participants();
        for (id, hand) in &hands {
            let rank = crate::evaluator::evaluate_hand(hand.cards())
                .map(|r| format!(" ({})", r))
                .unwrap_or_default();
            let text = format!("Player {} shows {}{}", id, crate::card::format_cards(hand.cards()), rank);
            self.broadcast(&participants, ServerMessage::Notify(text)).await;
        }
        winners
    }

    /// 结算本局：有赢家时派彩，所有人都已离开时没收奖池
    async fn conclude(&mut self, winners: Vec<PlayerId>) -> GameResult<()> {
        if winners.is_empty() {
            let forfeited = self.session.abandon_hand()?;
            warn!(forfeited, "本局所有玩家都已离开");
            return Ok(());
        }

        let pool = self.session.ledger.pool_amount();
        let shares = self.session.payout(&winners)?;
        info!(?winners, pool, "派彩");

        for id in self.session.participants() {
            let msg = match shares.get(&id) {
                Some(&share) if winners.contains(&id) => ServerMessage::Win(share),
                _ => ServerMessage::Lose,
            };
            self.send(id, msg).await;
        }
        Ok(())
    }

    /// 询问每位玩家是否继续，至少两人继续时开始新的一局
    async fn offer_new_hand(&mut self) -> GameResult<bool> {
        let mut staying = Vec::new();
        for id in self.session.participants() {
            let reply = self
                .exchange(id, ServerMessage::NewHandPrompt, "again", |_, reply: ContinueReply| Ok(reply.0))
                .await?;
            match reply {
                Some(true) => staying.push(id),
                Some(false) => {
                    self.send(id, ServerMessage::SessionOver).await;
                    self.depart(id, "declined another hand");
                }
                None => {}
            }
        }

        let next = if staying.len() >= MIN_PLAYERS { ServerMessage::Start } else { ServerMessage::SessionOver };
        let more = next == ServerMessage::Start;
        self.broadcast(&staying, next).await;
        Ok(more)
    }

    // --- 消息收发 ---

    /// 发送提示并等待回复，把回复交给 `apply` 处理
    ///
    /// - 可恢复的错误：回复 `err` 并重新提示，超过次数限制后移出玩家；
    /// - 针对该玩家的错误 (断线、资金不足、协议错误)：移出玩家，返回 `Ok(None)`；
    /// - 其他错误属于内部错误，直接返回。
    async fn exchange<R, T, F>(
        &mut self,
        id: PlayerId,
        prompt: ServerMessage,
        context: &'static str,
        mut apply: F,
    ) -> GameResult<Option<T>>
    where
        R: FromStr<Err = GameError>,
        F: FnMut(&mut GameSession, R) -> GameResult<T> + Send,
    {
        for _ in 0..=self.retry_limit {
            if !self.send(id, prompt.clone()).await {
                return Ok(None);
            }
            let result = match self.receive(id).await {
                Ok(line) => line.parse::<R>().and_then(|reply| apply(&mut self.session, reply)),
                Err(e) => Err(e),
            };

            match result {
                Ok(value) => return Ok(Some(value)),
                Err(e) if e.is_recoverable() => {
                    debug!(player_id = id, error = %e, "无效回复，重新提示");
                    self.send(id, ServerMessage::Error { context, reason: e.to_string() }).await;
                }
                Err(e @ (GameError::InsufficientFunds { .. } | GameError::UnexpectedMessage(_))) => {
                    warn!(player_id = id, error = %e, "玩家被移出");
                    self.send(id, ServerMessage::Error { context, reason: e.to_string() }).await;
                    self.depart(id, "removed");
                    return Ok(None);
                }
                Err(GameError::Disconnected) => {
                    self.depart(id, "connection closed");
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }

        warn!(player_id = id, "无效回复次数过多");
        self.send(id, ServerMessage::Error { context, reason: "too many invalid replies".to_string() }).await;
        self.depart(id, "too many invalid replies");
        Ok(None)
    }

    async fn receive(&mut self, id: PlayerId) -> GameResult<String> {
        let conn = self.seats.get_mut(&id).ok_or(GameError::Disconnected)?;
        conn.recv().await
    }

    /// 发送一条消息，失败时玩家视为离开
    async fn send(&mut self, id: PlayerId, msg: ServerMessage) -> bool {
        let Some(conn) = self.seats.get_mut(&id) else {
            return false;
        };
        let result = conn.send(msg.to_string()).await;
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(player_id = id, error = %e, "发送消息失败（可能已断开）");
                self.depart(id, "connection closed");
                false
            }
        }
    }

    async fn broadcast(&mut self, ids: &[PlayerId], msg: ServerMessage) {
        for id in ids {
            self.send(*id, msg.clone()).await;
        }
    }

    /// 把某位玩家的动作通知给其他所有玩家
    async fn announce(&mut self, actor: PlayerId, text: String) {
        let others: Vec<_> = self.session.participants().into_iter().filter(|id| *id != actor).collect();
        self.broadcast(&others, ServerMessage::Notify(text)).await;
    }

    /// 玩家离开牌局：标记为 Left 并关闭连接
    fn depart(&mut self, id: PlayerId, reason: &str) {
        if self.seats.remove(&id).is_none() {
            return;
        }
        if !self.session.left.contains(&id) && self.session.leave(id).is_err() {
            return;
        }
        info!(player_id = id, reason, "玩家离开牌局");
    }
}

fn expect_id(expected: PlayerId, claimed: PlayerId) -> GameResult<()> {
    if expected == claimed {
        Ok(())
    } else {
        Err(GameError::Validation(format!("you are player {}, not {}", expected, claimed)))
    }
}

fn describe(id: PlayerId, action: PlayerAction) -> String {
    match action {
        PlayerAction::Check => format!("Player {} checks", id),
        PlayerAction::Call => format!("Player {} calls", id),
        PlayerAction::Raise(amount) => format!("Player {} raises by {}", id, amount),
        PlayerAction::Fold => format!("Player {} folds", id),
        PlayerAction::Leave => format!("Player {} left the game", id),
    }
}

// --- 单元测试 ---
