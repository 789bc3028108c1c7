//! # 五张抽牌扑克核心逻辑库
//!
//! 这个 `core` crate 包含了五张抽牌扑克 (2 到 5 人) 的牌组与手牌、
//! 下注记录、游戏状态机、牌力评估、线上协议的消息格式，
//! 以及按顺序驱动整场游戏的牌桌 (`Table`)。
//! 牌桌只依赖 `Connection` trait，与具体的网络传输解耦。

mod card;
mod error;
mod evaluator;
mod ledger;
mod logic;
mod message;
mod state;
mod table;

pub use card::*;

pub use error::*;

pub use evaluator::*;

pub use ledger::*;

pub use logic::split_pool;

pub use message::*;

pub use state::*;

pub use table::*;
