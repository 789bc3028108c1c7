use crate::error::{GameError, GameResult};
use rand::Rng;
use rand::prelude::SliceRandom;
use std::fmt;
use std::str::FromStr;

// --- 核心数据结构定义 ---

/// 一副牌的张数
pub const DECK_SIZE: usize = 52;
/// 一手牌的张数
pub const HAND_SIZE: usize = 5;

/// 花色 (Suit)，线上格式为单个字符 H/D/C/S
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum Suit {
    Heart,   // 红心 ♥️
    Diamond, // 方块 ♦️
    Club,    // 梅花 ♣️
    Spade,   // 黑桃 ♠️
}

/// 点数 (Rank)
/// Ord 的派生让 Ace 默认是最大的 (A-2-3-4-5 顺子由牌力评估单独处理)
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

/// 单张扑克牌 (Card)
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Heart, Suit::Diamond, Suit::Club, Suit::Spade];

    fn token(self) -> char {
        match self {
            Suit::Heart => 'H',
            Suit::Diamond => 'D',
            Suit::Club => 'C',
            Suit::Spade => 'S',
        }
    }
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two, Rank::Three, Rank::Four, Rank::Five, Rank::Six, Rank::Seven,
        Rank::Eight, Rank::Nine, Rank::Ten, Rank::Jack, Rank::Queen, Rank::King, Rank::Ace,
    ];

    fn token(self) -> &'static str {
        match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        }
    }

    fn from_token(token: &str) -> Option<Rank> {
        Rank::ALL.into_iter().find(|r| r.token() == token)
    }
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }
}

// --- 线上格式：花色字符 + 点数 (例如 "H10", "SA") ---

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.suit, self.rank)
    }
}

impl FromStr for Card {
    type Err = GameError;

    fn from_str(s: &str) -> GameResult<Card> {
        let mut chars = s.chars();
        let suit = match chars.next() {
            Some('H') => Suit::Heart,
            Some('D') => Suit::Diamond,
            Some('C') => Suit::Club,
            Some('S') => Suit::Spade,
            _ => return Err(GameError::UnknownCard(s.to_string())),
        };
        let rank = Rank::from_token(chars.as_str()).ok_or_else(|| GameError::UnknownCard(s.to_string()))?;
        Ok(Card { rank, suit })
    }
}

/// 把一组牌编码成空格分隔的 token
pub fn format_cards(cards: &[Card]) -> String {
    cards.iter().map(Card::to_string).collect::<Vec<_>>().join(" ")
}

// --- 牌堆 ---

/// 尚未发出的牌，末尾是牌堆顶，开头是牌堆底
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// 创建一副完整的 52 张扑克牌 (未洗牌)
    pub fn new() -> Deck {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for &suit in &Suit::ALL {
            for &rank in &Rank::ALL {
                cards.push(Card { rank, suit });
            }
        }
        Deck { cards }
    }

    /// 用给定顺序构造牌堆，最后一张最先发出
    pub fn from_cards(cards: Vec<Card>) -> GameResult<Deck> {
        let mut deck = Deck { cards: Vec::with_capacity(cards.len()) };
        for card in cards.into_iter().rev() {
            deck.add_card_to_bottom(card)?;
        }
        Ok(deck)
    }

    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::rng());
    }

    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    /// 从牌堆顶发一张牌
    pub fn deal_card(&mut self) -> GameResult<Card> {
        self.cards.pop().ok_or(GameError::EmptyDeck)
    }

    /// 把牌放回牌堆底，牌堆中不允许出现重复的牌
    pub fn add_card_to_bottom(&mut self, card: Card) -> GameResult<()> {
        if self.contains(&card) {
            return Err(GameError::DuplicateCard(card));
        }
        self.cards.insert(0, card);
        Ok(())
    }

    pub fn contains(&self, card: &Card) -> bool {
        self.cards.contains(card)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl Default for Deck {
    fn default() -> Self {
        Deck::new()
    }
}

// --- 手牌 ---

/// 玩家手中最多 5 张牌，保持发牌顺序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Hand {
        Hand { cards: Vec::with_capacity(HAND_SIZE) }
    }

    pub fn add_card(&mut self, card: Card) -> GameResult<()> {
        if self.cards.len() >= HAND_SIZE {
            return Err(GameError::Invariant(format!("hand already holds {} cards", HAND_SIZE)));
        }
        self.cards.push(card);
        Ok(())
    }

    /// 按 1 开始的位置移除若干张牌，返回被移除的牌
    ///
    /// 位置必须互不相同且在手牌范围内，否则不做任何修改。
    pub fn discard(&mut self, positions: &[usize]) -> GameResult<Vec<Card>> {
        let mut sorted = positions.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != positions.len() {
            return Err(GameError::Validation("discard positions must be distinct".to_string()));
        }
        if let Some(&bad) = sorted.iter().find(|&&p| p == 0 || p > self.cards.len()) {
            return Err(GameError::IllegalAction(format!(
                "position {} is outside your hand of {} cards",
                bad,
                self.cards.len()
            )));
        }

        // 从后往前移除，避免位置错乱
        let mut removed: Vec<Card> = sorted.iter().rev().map(|&p| self.cards.remove(p - 1)).collect();
        removed.reverse();
        Ok(removed)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// 交出所有牌，手牌变为空
    pub fn take_cards(&mut self) -> Vec<Card> {
        std::mem::take(&mut self.cards)
    }
}

impl From<Vec<Card>> for Hand {
    fn from(cards: Vec<Card>) -> Self {
        Hand { cards }
    }
}

// --- 单元测试 ---
