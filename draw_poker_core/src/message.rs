use crate::card::{Card, format_cards};
use crate::error::{GameError, GameResult};
use crate::state::{BetPrompt, PlayerAction, PlayerId, SessionConfig};
use std::fmt;
use std::str::FromStr;

// 线上格式：每条消息由空格分隔的 ASCII token 组成，一条消息对应传输层的一帧。

/// 客户端可能发送的所有首个 token。
/// 收到属于其他阶段的关键字视为协议错误，其余无法解析的内容视为输入错误。
const KEYWORDS: [&str; 12] = [
    "start", "join", "ante", "leave", "Leave", "Received", "Check", "Call", "Raise", "Fold", "N", "Y",
];

// --- 服务器 -> 客户端 的消息 ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// 加入成功：分配的 id 和初始资金
    AckJoin { id: PlayerId, wallet: u32 },
    /// 错误提示，`context` 是出错的请求类型 (start、join、ante、bet、discard ...)
    Error { context: &'static str, reason: String },
    /// 任意文本通知
    Notify(String),
    /// 人齐了，游戏开始
    Begin,
    /// 底注提示，`respond` 为 false 时玩家资金不足，不需要回复
    AntePrompt { ante: u32, respond: bool },
    /// 发牌或换牌后补发的牌
    Deal(Vec<Card>),
    /// 本轮首位行动者
    FirstActor(PlayerId),
    BetPrompt(BetPrompt),
    /// 一轮下注结束
    RoundOver,
    Outcome(RoundOutcome),
    DiscardPrompt,
    Win(u32),
    Lose,
    /// 询问是否继续下一局
    NewHandPrompt,
    Start,
    /// 对该连接而言游戏结束
    SessionOver,
}

/// 一轮下注结束后的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// 本局已经决出胜负
    Winner,
    /// 还需要第二轮下注
    Betting,
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ServerMessage::AckJoin { id, wallet } => write!(f, "ack join {} {}", id, wallet),
            ServerMessage::Error { context, reason } => write!(f, "err {} {}", context, reason),
            ServerMessage::Notify(text) => write!(f, "notify {}", text),
            ServerMessage::Begin => f.write_str("begin"),
            ServerMessage::AntePrompt { ante, respond } => write!(f, "{} {}", ante, u8::from(*respond)),
            ServerMessage::Deal(cards) => f.write_str(&format_cards(cards)),
            ServerMessage::FirstActor(id) => write!(f, "{}", id),
            ServerMessage::BetPrompt(p) => write!(
                f,
                "{} {} {}",
                p.max_bet,
                p.current_bet,
                if p.first_to_act { "True" } else { "False" }
            ),
            ServerMessage::RoundOver | ServerMessage::SessionOver => f.write_str("Over"),
            ServerMessage::Outcome(RoundOutcome::Winner) => f.write_str("Winner"),
            ServerMessage::Outcome(RoundOutcome::Betting) => f.write_str("Betting"),
            ServerMessage::DiscardPrompt => write!(
                f,
                "discard Reply N to keep your hand, or a count followed by up to {} positions (1-5)",
                crate::state::MAX_DISCARD
            ),
            ServerMessage::Win(amount) => write!(f, "Win {}", amount),
            ServerMessage::Lose => f.write_str("Lose"),
            ServerMessage::NewHandPrompt => f.write_str("Play another hand? (Y/N)"),
            ServerMessage::Start => f.write_str("Start"),
        }
    }
}

// --- 客户端 -> 服务器 的消息 ---
// 每个阶段只接受特定的回复，分别用不同的类型解析。

/// 连接建立后的第一条消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    /// 创建游戏并作为第一位玩家加入
    Start { config: SessionConfig, name: String },
    Join { name: String },
}

/// 对底注提示的回复
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnteReply {
    Ante { id: PlayerId, amount: u32 },
    Leave { id: PlayerId },
}

/// 对下注提示的回复，客户端附带的金额只做格式校验，实际金额由服务器计算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetReply {
    pub id: PlayerId,
    pub action: PlayerAction,
}

/// 对换牌提示的回复，空列表表示不换
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscardReply(pub Vec<usize>);

/// 收到发牌后的确认
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received;

/// 是否继续下一局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinueReply(pub bool);

fn reject(line: &str, expected: &str) -> GameError {
    match line.split_whitespace().next() {
        Some(token) if KEYWORDS.contains(&token) => GameError::UnexpectedMessage(line.trim().to_string()),
        _ => GameError::Validation(format!("expected {}", expected)),
    }
}

fn number<T: FromStr>(token: Option<&str>, what: &str) -> GameResult<T> {
    token
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| GameError::Validation(format!("missing or invalid {}", what)))
}

fn no_more<'a>(mut tokens: impl Iterator<Item = &'a str>) -> GameResult<()> {
    match tokens.next() {
        None => Ok(()),
        Some(extra) => Err(GameError::Validation(format!("unexpected trailing token '{}'", extra))),
    }
}

impl FromStr for Handshake {
    type Err = GameError;

    fn from_str(line: &str) -> GameResult<Self> {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("start") => {
                let invalid = || GameError::InvalidArguments("expected start <numPlayers> <walletAmt> <anteAmt> <name>".to_string());
                let num_players = number::<usize>(tokens.next(), "number of players").map_err(|_| invalid())?;
                let wallet_amt = number::<u32>(tokens.next(), "wallet amount").map_err(|_| invalid())?;
                let ante_amt = number::<u32>(tokens.next(), "ante amount").map_err(|_| invalid())?;
                let name = tokens.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    return Err(invalid());
                }
                let config = SessionConfig::new(num_players, wallet_amt, ante_amt)?;
                Ok(Handshake::Start { config, name })
            }
            Some("join") => {
                let name = tokens.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    return Err(GameError::Validation("expected join <name>".to_string()));
                }
                Ok(Handshake::Join { name })
            }
            _ => Err(reject(line, "start or join")),
        }
    }
}

impl FromStr for AnteReply {
    type Err = GameError;

    fn from_str(line: &str) -> GameResult<Self> {
        let mut tokens = line.split_whitespace();
        let reply = match tokens.next() {
            Some("ante") => AnteReply::Ante {
                id: number(tokens.next(), "player id")?,
                amount: number(tokens.next(), "ante amount")?,
            },
            Some("leave") | Some("Leave") => AnteReply::Leave { id: number(tokens.next(), "player id")? },
            _ => return Err(reject(line, "ante <id> <amt> or leave <id>")),
        };
        no_more(tokens)?;
        Ok(reply)
    }
}

impl FromStr for BetReply {
    type Err = GameError;

    fn from_str(line: &str) -> GameResult<Self> {
        let mut tokens = line.split_whitespace();
        let keyword = tokens.next();
        if !matches!(keyword, Some("Check" | "Call" | "Raise" | "Fold" | "Leave")) {
            return Err(reject(line, "Check, Call, Raise, Fold or Leave"));
        }
        let id = number(tokens.next(), "player id")?;
        let action = match keyword {
            Some("Check") => {
                number::<u32>(tokens.next(), "bet amount")?;
                PlayerAction::Check
            }
            Some("Call") => {
                number::<u32>(tokens.next(), "bet amount")?;
                PlayerAction::Call
            }
            Some("Raise") => {
                number::<u32>(tokens.next(), "bet amount")?;
                PlayerAction::Raise(number(tokens.next(), "raise amount")?)
            }
            Some("Fold") => PlayerAction::Fold,
            _ => PlayerAction::Leave,
        };
        no_more(tokens)?;
        Ok(BetReply { id, action })
    }
}

impl FromStr for DiscardReply {
    type Err = GameError;

    fn from_str(line: &str) -> GameResult<Self> {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("N") => {
                no_more(tokens)?;
                Ok(DiscardReply(Vec::new()))
            }
            Some(first) if first.chars().all(|c| c.is_ascii_digit()) => {
                let count: usize = number(Some(first), "discard count")?;
                let positions = tokens
                    .map(|t| number::<usize>(Some(t), "card position"))
                    .collect::<GameResult<Vec<_>>>()?;
                if positions.len() != count {
                    return Err(GameError::Validation(format!(
                        "discard count {} does not match {} positions",
                        count,
                        positions.len()
                    )));
                }
                Ok(DiscardReply(positions))
            }
            _ => Err(reject(line, "N or a discard count followed by positions")),
        }
    }
}

impl FromStr for Received {
    type Err = GameError;

    fn from_str(line: &str) -> GameResult<Self> {
        match line.trim() {
            "Received" => Ok(Received),
            // 发牌确认只有一种合法形式，其他任何内容都是协议错误
            other => Err(GameError::UnexpectedMessage(other.to_string())),
        }
    }
}

impl FromStr for ContinueReply {
    type Err = GameError;

    fn from_str(line: &str) -> GameResult<Self> {
        match line.trim() {
            "Y" | "y" => Ok(ContinueReply(true)),
            "N" | "n" => Ok(ContinueReply(false)),
            _ => Err(reject(line, "Y or N")),
        }
    }
}

// --- 单元测试 ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Rank, Suit};

    #[test]
    fn test_server_message_tokens() {
        let cases = [
            (ServerMessage::AckJoin { id: 2, wallet: 100 }, "ack join 2 100"),
            (ServerMessage::Error { context: "start", reason: "invalid arguments".into() }, "err start invalid arguments"),
            (ServerMessage::Notify("Waiting for 1 more player".into()), "notify Waiting for 1 more player"),
            (ServerMessage::Begin, "begin"),
            (ServerMessage::AntePrompt { ante: 5, respond: true }, "5 1"),
            (ServerMessage::AntePrompt { ante: 5, respond: false }, "5 0"),
            (ServerMessage::FirstActor(3), "3"),
            (ServerMessage::BetPrompt(BetPrompt { max_bet: 15, current_bet: 5, first_to_act: false }), "15 5 False"),
            (ServerMessage::BetPrompt(BetPrompt { max_bet: 5, current_bet: 5, first_to_act: true }), "5 5 True"),
            (ServerMessage::RoundOver, "Over"),
            (ServerMessage::Outcome(RoundOutcome::Winner), "Winner"),
            (ServerMessage::Outcome(RoundOutcome::Betting), "Betting"),
            (ServerMessage::Win(25), "Win 25"),
            (ServerMessage::Lose, "Lose"),
            (ServerMessage::Start, "Start"),
            (ServerMessage::SessionOver, "Over"),
        ];
        for (msg, expected) in cases {
            assert_eq!(msg.to_string(), expected);
        }
        let deal = ServerMessage::Deal(vec![Card::new(Rank::Ten, Suit::Heart), Card::new(Rank::Ace, Suit::Club)]);
        assert_eq!(deal.to_string(), "H10 CA");
        assert!(ServerMessage::DiscardPrompt.to_string().starts_with("discard "));
        assert!(ServerMessage::NewHandPrompt.to_string().ends_with("(Y/N)"));
    }

    #[test]
    fn test_parse_handshake() {
        let start: Handshake = "start 3 100 5 alice".parse().unwrap();
        assert_eq!(start, Handshake::Start {
            config: SessionConfig { num_players: 3, wallet_amt: 100, ante_amt: 5 },
            name: "alice".into(),
        });
        let join: Handshake = "join Bob Smith".parse().unwrap();
        assert_eq!(join, Handshake::Join { name: "Bob Smith".into() });
    }

    #[test]
    fn test_parse_invalid_start() {
        for line in ["start", "start 3 100 5", "start x 100 5 a", "start 9 100 5 a", "start 3 100 500 a"] {
            assert!(matches!(line.parse::<Handshake>(), Err(GameError::InvalidArguments(_))), "{}", line);
        }
        assert!(matches!("join".parse::<Handshake>(), Err(GameError::Validation(_))));
        assert!(matches!("Fold 1".parse::<Handshake>(), Err(GameError::UnexpectedMessage(_))));
        assert!(matches!("hello".parse::<Handshake>(), Err(GameError::Validation(_))));
    }

    #[test]
    fn test_parse_ante_reply() {
        assert_eq!("ante 2 5".parse::<AnteReply>().unwrap(), AnteReply::Ante { id: 2, amount: 5 });
        assert_eq!("leave 2".parse::<AnteReply>().unwrap(), AnteReply::Leave { id: 2 });
        assert_eq!("Leave 4".parse::<AnteReply>().unwrap(), AnteReply::Leave { id: 4 });
        assert!(matches!("ante two 5".parse::<AnteReply>(), Err(GameError::Validation(_))));
        assert!(matches!("ante 2 5 7".parse::<AnteReply>(), Err(GameError::Validation(_))));
        assert!(matches!("Call 2 5".parse::<AnteReply>(), Err(GameError::UnexpectedMessage(_))));
    }

    #[test]
    fn test_parse_bet_reply() {
        let parse = |s: &str| s.parse::<BetReply>();
        assert_eq!(parse("Check 1 5").unwrap(), BetReply { id: 1, action: PlayerAction::Check });
        assert_eq!(parse("Call 2 5").unwrap(), BetReply { id: 2, action: PlayerAction::Call });
        assert_eq!(parse("Raise 1 5 10").unwrap(), BetReply { id: 1, action: PlayerAction::Raise(10) });
        assert_eq!(parse("Fold 3").unwrap(), BetReply { id: 3, action: PlayerAction::Fold });
        assert_eq!(parse("Leave 3").unwrap(), BetReply { id: 3, action: PlayerAction::Leave });
        assert!(matches!(parse("Raise 1 5"), Err(GameError::Validation(_))));
        assert!(matches!(parse("Check 1"), Err(GameError::Validation(_))));
        assert!(matches!(parse("Fold"), Err(GameError::Validation(_))));
        assert!(matches!(parse("Bet 1 5"), Err(GameError::Validation(_))));
        assert!(matches!(parse("ante 1 5"), Err(GameError::UnexpectedMessage(_))));
    }

    #[test]
    fn test_parse_discard_reply() {
        assert_eq!("N".parse::<DiscardReply>().unwrap(), DiscardReply(vec![]));
        assert_eq!("0".parse::<DiscardReply>().unwrap(), DiscardReply(vec![]));
        assert_eq!("2 1 4".parse::<DiscardReply>().unwrap(), DiscardReply(vec![1, 4]));
        // 数量上限由游戏规则检查，这里只检查格式
        assert_eq!("4 1 2 3 4".parse::<DiscardReply>().unwrap(), DiscardReply(vec![1, 2, 3, 4]));
        assert!(matches!("2 1".parse::<DiscardReply>(), Err(GameError::Validation(_))));
        assert!(matches!("1 x".parse::<DiscardReply>(), Err(GameError::Validation(_))));
        assert!(matches!("Received".parse::<DiscardReply>(), Err(GameError::UnexpectedMessage(_))));
    }

    #[test]
    fn test_parse_acks() {
        assert_eq!(" Received ".parse::<Received>().unwrap(), Received);
        assert!(matches!("ok".parse::<Received>(), Err(GameError::UnexpectedMessage(_))));
        assert_eq!("Y".parse::<ContinueReply>().unwrap(), ContinueReply(true));
        assert_eq!("n".parse::<ContinueReply>().unwrap(), ContinueReply(false));
        assert!(matches!("maybe".parse::<ContinueReply>(), Err(GameError::Validation(_))));
    }
}
