//! Game configuration: who plays each side and how fast the computer replies.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::PieceColor;

/// Environment variable pointing at a JSON config file
pub const CONFIG_ENV: &str = "CHESS_SYNC_CONFIG";

/// Default pause before the computer side moves
const DEFAULT_AUTO_MOVE_DELAY_MS: u64 = 1000;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    Human,
    Computer,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub white: PlayerKind,
    pub black: PlayerKind,
    /// Delay the driver waits before requesting an engine move
    #[serde(with = "millis")]
    pub auto_move_delay: Duration,
    /// Seed for the engine's move choice (random when absent)
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            white: PlayerKind::Human,
            black: PlayerKind::Computer,
            auto_move_delay: Duration::from_millis(DEFAULT_AUTO_MOVE_DELAY_MS),
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn player(&self, color: PieceColor) -> PlayerKind {
        match color {
            PieceColor::White => self.white,
            PieceColor::Black => self.black,
        }
    }

    pub fn set_player(&mut self, color: PieceColor, kind: PlayerKind) {
        match color {
            PieceColor::White => self.white = kind,
            PieceColor::Black => self.black = kind,
        }
    }

    pub fn is_computer(&self, color: PieceColor) -> bool {
        self.player(color) == PlayerKind::Computer
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid game config")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Config from the file named by `CHESS_SYNC_CONFIG`, or defaults
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GameConfig::default();
        assert!(!config.is_computer(PieceColor::White));
        assert!(config.is_computer(PieceColor::Black));
        assert_eq!(config.auto_move_delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            GameConfig::from_json(r#"{"white": "computer", "auto_move_delay": 250}"#).unwrap();
        assert_eq!(config.white, PlayerKind::Computer);
        assert_eq!(config.black, PlayerKind::Computer);
        assert_eq!(config.auto_move_delay, Duration::from_millis(250));
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(GameConfig::from_json(r#"{"white": "robot"}"#).is_err());
    }
}
