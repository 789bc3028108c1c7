use draw_poker_core::DEFAULT_RETRY_LIMIT;
use std::net::SocketAddr;

/// 服务器配置，全部来自环境变量
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// 监听地址 (`DRAW_POKER_BIND`)
    pub bind: SocketAddr,
    /// 每个提示允许的无效回复次数 (`DRAW_POKER_RETRY_LIMIT`)
    pub retry_limit: usize,
}

impl ServerConfig {
    /// 读取环境变量，缺失或无法解析时使用默认值
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            bind: parse_env_or("DRAW_POKER_BIND", default.bind),
            retry_limit: parse_env_or("DRAW_POKER_RETRY_LIMIT", default.retry_limit),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 25917)),
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }
}

fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
