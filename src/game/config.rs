use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_RESOLVE_DELAY_MS: u32 = 200;
pub const DEFAULT_TICK_INTERVAL_MS: u32 = 1000;

/// 一局游戏的可调参数，前端以 JSON 传入，缺省字段使用默认值。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameConfig {
    /// 第二张牌翻开后到比对之间的停留时间。
    pub resolve_delay_ms: u32,
    pub tick_interval_ms: u32,
    pub two_star_moves: u32,
    pub one_star_moves: u32,
    /// 固定种子得到可复现的洗牌顺序。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ConfigError {
    ZeroTickInterval,
    ThresholdsOutOfOrder {
        two_star_moves: u32,
        one_star_moves: u32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroTickInterval => write!(f, "tick_interval_ms must be positive"),
            ConfigError::ThresholdsOutOfOrder {
                two_star_moves,
                one_star_moves,
            } => write!(
                f,
                "one_star_moves ({one_star_moves}) must exceed two_star_moves ({two_star_moves})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

impl GameConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_resolve_delay(mut self, delay_ms: u32) -> Self {
        self.resolve_delay_ms = delay_ms;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.one_star_moves <= self.two_star_moves {
            return Err(ConfigError::ThresholdsOutOfOrder {
                two_star_moves: self.two_star_moves,
                one_star_moves: self.one_star_moves,
            });
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            resolve_delay_ms: DEFAULT_RESOLVE_DELAY_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            two_star_moves: 30,
            one_star_moves: 40,
            seed: None,
        }
    }
}
