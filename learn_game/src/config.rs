use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Self-play episodes run before interactive play.
pub const NUM_EPISODES: usize = 10_000_usize;

/// Learning parameters shared by every reinforcement-learning player.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// α; 1 overwrites the old estimate on every update.
    pub learning_rate: f64,
    /// γ
    pub discount_rate: f64,
    /// ε, only honoured by players in training mode.
    pub exploration_rate: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            learning_rate: 1.0,
            discount_rate: 0.9,
            exploration_rate: 0.1,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        [
            ("learning_rate", self.learning_rate),
            ("discount_rate", self.discount_rate),
            ("exploration_rate", self.exploration_rate),
        ]
        .into_iter()
        .find(|(_, value)| !(0.0..=1.0).contains(value))
        .map_or(Ok(()), |(name, value)| {
            Err(ConfigError::OutOfRange { name, value })
        })
    }
}
