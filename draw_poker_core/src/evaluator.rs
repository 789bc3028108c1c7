use crate::card::{Card, HAND_SIZE, Hand, Rank};
use crate::state::PlayerId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// 牌型等级 (HandRank)
/// 1. 变体的顺序从小到大排列，可以直接利用 `Ord` 进行比较。
/// 2. 变体内部存储了比较所需的所有信息（对子的大小、三条的大小、踢脚牌等），
///    按从大到小的顺序排列，所以同一牌型内的派生比较就是平局规则。
/// 花色从不参与比较，完全相同的牌力平分奖池。
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub enum HandRank {
    HighCard(Rank, Rank, Rank, Rank, Rank),
    OnePair(Rank, Rank, Rank, Rank),
    TwoPair(Rank, Rank, Rank),
    ThreeOfAKind(Rank, Rank, Rank),
    Straight(Rank),                      // 顺子 (最高牌的点数)
    Flush(Rank, Rank, Rank, Rank, Rank),
    FullHouse(Rank, Rank),               // 葫芦 (三条的点数, 对子的点数)
    FourOfAKind(Rank, Rank),             // 四条 (四条的点数, 踢脚牌)
    StraightFlush(Rank),
}

impl fmt::Display for HandRank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HandRank::HighCard(r, ..) => write!(f, "high card {}", r),
            HandRank::OnePair(r, ..) => write!(f, "pair of {}", r),
            HandRank::TwoPair(r1, r2, _) => write!(f, "two pair {} and {}", r1, r2),
            HandRank::ThreeOfAKind(r, ..) => write!(f, "three {}", r),
            HandRank::Straight(r) => write!(f, "straight to {}", r),
            HandRank::Flush(r, ..) => write!(f, "flush {} high", r),
            HandRank::FullHouse(r1, r2) => write!(f, "full house {} over {}", r1, r2),
            HandRank::FourOfAKind(r, _) => write!(f, "four {}", r),
            HandRank::StraightFlush(r) => write!(f, "straight flush to {}", r),
        }
    }
}

/// 摊牌时决定赢家的能力
///
/// 输入是每个剩余玩家的最终手牌，输出是牌力最大的玩家 (可能有多个，升序)。
pub trait HandEvaluator: Send + Sync {
    fn evaluate(&self, hands: &BTreeMap<PlayerId, Hand>) -> Vec<PlayerId>;
}

/// 标准五张牌规则：高牌到同花顺
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardEvaluator;

impl HandEvaluator for StandardEvaluator {
    fn evaluate(&self, hands: &BTreeMap<PlayerId, Hand>) -> Vec<PlayerId> {
        let ranked: Vec<(PlayerId, HandRank)> = hands
            .iter()
            .filter_map(|(id, hand)| evaluate_hand(hand.cards()).map(|rank| (*id, rank)))
            .collect();

        let Some(best) = ranked.iter().map(|(_, rank)| rank).max() else {
            return Vec::new();
        };
        // BTreeMap 的迭代顺序保证结果按 id 升序
        ranked.iter().filter(|(_, rank)| rank == best).map(|(id, _)| *id).collect()
    }
}

/// 评估一手 5 张牌的牌型，牌数不是 5 张时返回 None
pub fn evaluate_hand(hand: &[Card]) -> Option<HandRank> {
    if hand.len() != HAND_SIZE {
        return None;
    }

    let mut cards = hand.to_vec();
    // 从大到小排序，方便处理
    cards.sort_by(|a, b| b.rank.cmp(&a.rank));
    let ranks: Vec<Rank> = cards.iter().map(|c| c.rank).collect();

    // 1. 检查同花
    let is_flush = cards.windows(2).all(|w| w[0].suit == w[1].suit);

    // 2. 检查顺子
    let wheel = ranks == [Rank::Ace, Rank::Five, Rank::Four, Rank::Three, Rank::Two];
    let is_straight = ranks.windows(2).all(|w| w[0] as u8 == w[1] as u8 + 1) || wheel;

    // A-5 顺子中，5是最大的牌
    let high_card = if wheel { Rank::Five } else { ranks[0] };

    if is_straight && is_flush {
        return Some(HandRank::StraightFlush(high_card));
    }

    // 3. 统计点数出现次数，用于判断四条、葫芦、三条、两对、一对
    let mut counts: HashMap<Rank, u8> = HashMap::new();
    for rank in &ranks {
        *counts.entry(*rank).or_insert(0) += 1;
    }

    // 转换为 (出现次数, 点数) 的列表，先按次数再按点数从大到小排
    let mut groups: Vec<(u8, Rank)> = counts.into_iter().map(|(r, c)| (c, r)).collect();
    groups.sort_by(|a, b| b.cmp(a));

    let rank = match (groups[0].0, groups.get(1).map(|g| g.0)) {
        (4, _) => HandRank::FourOfAKind(groups[0].1, groups[1].1),
        (3, Some(2)) => HandRank::FullHouse(groups[0].1, groups[1].1),
        (3, _) => HandRank::ThreeOfAKind(groups[0].1, groups[1].1, groups[2].1),
        (2, Some(2)) => HandRank::TwoPair(groups[0].1, groups[1].1, groups[2].1),
        (2, _) => HandRank::OnePair(groups[0].1, groups[1].1, groups[2].1, groups[3].1),
        _ if is_flush => HandRank::Flush(ranks[0], ranks[1], ranks[2], ranks[3], ranks[4]),
        _ if is_straight => HandRank::Straight(high_card),
        _ => HandRank::HighCard(ranks[0], ranks[1], ranks[2], ranks[3], ranks[4]),
    };
    Some(rank)
}

// --- 单元测试 ---
