//! Gameplay tuning per difficulty tier.
//!
//! Keep this separate from runtime configuration (tick rates, channel
//! capacities) in `config`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::REFERENCE_SCREEN_WIDTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Easy,
    #[default]
    Normal,
    Hard,
    Impossible,
}

/// Raised when an options blob or UI hands us a tier name we don't know.
/// The previously active tier stays in effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTier(pub String);

impl fmt::Display for UnknownTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown difficulty tier: {:?}", self.0)
    }
}

impl std::error::Error for UnknownTier {}

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Tier::Easy),
            "normal" => Ok(Tier::Normal),
            "hard" => Ok(Tier::Hard),
            "impossible" => Ok(Tier::Impossible),
            other => Err(UnknownTier(other.to_string())),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Easy => "easy",
            Tier::Normal => "normal",
            Tier::Hard => "hard",
            Tier::Impossible => "impossible",
        };
        f.write_str(name)
    }
}

/// Numeric tuning bundle for one tier. Immutable; swapped whole on a tier
/// change, never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultySettings {
    /// Pixels added to a window edge when a non-transferable projectile exits.
    pub increase_power: f64,
    /// Starting pixels removed per shrink step.
    pub decrease_power: f64,
    /// Upper bound on the per-step shrink amount.
    pub decrease_max: f64,
    /// Growth factor applied to the shrink amount each step.
    pub decrease_multiplier: f64,
    /// Initial enemy spawn interval, in seconds.
    pub enemy_spawn_speed: f64,
    /// Floor for the enemy spawn interval, in milliseconds.
    pub enemy_min_spawn_ms: u64,
    /// Milliseconds shaved off the spawn interval per spawn.
    pub enemy_spawn_decrease_ms: u64,
    pub score_multiplier: f64,
    pub background_transparent: bool,
    /// Scales the elapsed time that feeds the final score.
    pub time_multiplier: f64,
}

impl Tier {
    pub fn settings(self) -> DifficultySettings {
        match self {
            Tier::Easy => DifficultySettings {
                increase_power: 10.0,
                decrease_power: 1.0,
                decrease_max: 3.0,
                decrease_multiplier: 1.05,
                enemy_spawn_speed: 2.0,
                enemy_min_spawn_ms: 1700,
                enemy_spawn_decrease_ms: 5,
                score_multiplier: 0.25,
                background_transparent: false,
                time_multiplier: 1.2,
            },
            Tier::Normal => DifficultySettings {
                increase_power: 20.0,
                decrease_power: 2.0,
                decrease_max: 6.0,
                decrease_multiplier: 1.6,
                enemy_spawn_speed: 1.0,
                enemy_min_spawn_ms: 1500,
                enemy_spawn_decrease_ms: 10,
                score_multiplier: 0.5,
                background_transparent: false,
                time_multiplier: 1.5,
            },
            Tier::Hard => DifficultySettings {
                increase_power: 25.0,
                decrease_power: 2.5,
                decrease_max: 8.0,
                decrease_multiplier: 1.5,
                enemy_spawn_speed: 0.85,
                enemy_min_spawn_ms: 1200,
                enemy_spawn_decrease_ms: 15,
                score_multiplier: 1.0,
                background_transparent: false,
                time_multiplier: 1.5,
            },
            Tier::Impossible => DifficultySettings {
                increase_power: 30.0,
                decrease_power: 3.0,
                decrease_max: 10.0,
                decrease_multiplier: 1.3,
                enemy_spawn_speed: 1.0,
                enemy_min_spawn_ms: 1000,
                enemy_spawn_decrease_ms: 30,
                score_multiplier: 2.0,
                background_transparent: true,
                time_multiplier: 1.7,
            },
        }
    }
}

/// Ratio of the reference resolution to the actual monitor width. Spatial
/// tuning constants divide by this so behavior is resolution-independent.
pub fn screen_multiplier(monitor_width: f64) -> f64 {
    if monitor_width <= 0.0 {
        return 1.0;
    }
    REFERENCE_SCREEN_WIDTH / monitor_width
}
