//! Achievement progress tracking.
//!
//! The tracker receives one report per game over. Progress only ever moves
//! forward, and an achievement unlocks (and notifies) exactly once. State is
//! persisted through the store as its own blob; a missing blob seeds the
//! built-in schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::store::{Store, StoreError, ACHIEVEMENTS_KEY};
use crate::ui::UiSurface;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Requirement {
    /// Numeric threshold (kills, seconds, score, count of colors/monitors).
    Count(u64),
    /// Every listed color must be collected.
    Colors(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Progress {
    Count(u64),
    Colors(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub name: String,
    pub required: Requirement,
    pub current: Progress,
    #[serde(default)]
    pub unlocked: bool,
}

impl Achievement {
    fn met(&self) -> bool {
        match (&self.required, &self.current) {
            (Requirement::Count(required), Progress::Count(current)) => current >= required,
            (Requirement::Count(required), Progress::Colors(colors)) => {
                colors.len() as u64 >= *required
            }
            (Requirement::Colors(required), Progress::Colors(colors)) => {
                required.iter().all(|c| colors.contains(c))
            }
            (Requirement::Colors(_), Progress::Count(_)) => false,
        }
    }
}

/// Everything the tracker needs to know about one finished session.
#[derive(Debug, Clone)]
pub struct GameOverReport {
    /// True when the run ended on a window/canvas boundary rather than an
    /// enemy touch.
    pub ended_by_boundary: bool,
    pub player_color: String,
    pub kill_count: u32,
    pub elapsed_seconds: u64,
    pub final_score: u64,
    pub monitor_count: usize,
}

pub struct AchievementTracker {
    achievements: BTreeMap<String, Achievement>,
}

impl AchievementTracker {
    /// Loads persisted state, seeding the built-in schema when none exists
    /// or the blob is corrupt.
    pub fn load(store: &dyn Store) -> Self {
        let achievements = match store.read_text(ACHIEVEMENTS_KEY) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(error = %e, "corrupt achievements blob, reseeding schema");
                default_schema()
            }),
            Err(StoreError::Missing(_)) => default_schema(),
            Err(e) => {
                warn!(error = %e, "failed to load achievements, reseeding schema");
                default_schema()
            }
        };
        Self { achievements }
    }

    pub fn get(&self, key: &str) -> Option<&Achievement> {
        self.achievements.get(key)
    }

    pub fn save(&self, store: &dyn Store) {
        match serde_json::to_string_pretty(&self.achievements) {
            Ok(text) => {
                if let Err(e) = store.write_text(ACHIEVEMENTS_KEY, &text) {
                    warn!(error = %e, "failed to persist achievements");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize achievements"),
        }
    }

    /// Applies one game-over report and persists the result.
    pub fn handle(&mut self, report: &GameOverReport, ui: &dyn UiSurface, store: &dyn Store) {
        self.raise_count("openWorld", report.monitor_count as u64, ui);
        if report.ended_by_boundary {
            self.raise_count("noSpace", 1, ui);
        }
        self.collect_color("colorful", &report.player_color, ui);
        self.collect_color("godOfColors", &report.player_color, ui);
        for key in ["kill100e", "kill1000e"] {
            self.raise_count(key, u64::from(report.kill_count), ui);
        }
        for key in ["survive1m", "survive5m", "survive10m", "survive20m"] {
            self.raise_count(key, report.elapsed_seconds, ui);
        }
        for key in ["score1000", "score5000", "score10000"] {
            self.raise_count(key, report.final_score, ui);
        }
        self.save(store);
    }

    /// Monotone progress bump for a numeric achievement.
    fn raise_count(&mut self, key: &str, value: u64, ui: &dyn UiSurface) {
        let Some(a) = self.achievements.get_mut(key) else {
            return;
        };
        if let Progress::Count(current) = &mut a.current {
            if value > *current {
                *current = value;
            }
        }
        Self::maybe_unlock(a, ui);
    }

    /// Adds a color to a set-valued achievement, once. Colors only relevant
    /// to the requirement are recorded for color-list requirements.
    fn collect_color(&mut self, key: &str, color: &str, ui: &dyn UiSurface) {
        let Some(a) = self.achievements.get_mut(key) else {
            return;
        };
        if let Requirement::Colors(required) = &a.required {
            if !required.iter().any(|c| c.eq_ignore_ascii_case(color)) {
                return;
            }
        }
        if let Progress::Colors(colors) = &mut a.current {
            if !colors.iter().any(|c| c.eq_ignore_ascii_case(color)) {
                colors.push(color.to_string());
            }
        }
        Self::maybe_unlock(a, ui);
    }

    fn maybe_unlock(a: &mut Achievement, ui: &dyn UiSurface) {
        if !a.unlocked && a.met() {
            a.unlocked = true;
            info!(achievement = %a.name, "achievement unlocked");
            ui.notify("Achievement Unlocked", &a.name);
        }
    }
}

fn count(name: &str, required: u64) -> Achievement {
    Achievement {
        name: name.to_string(),
        required: Requirement::Count(required),
        current: Progress::Count(0),
        unlocked: false,
    }
}

fn default_schema() -> BTreeMap<String, Achievement> {
    let mut schema = BTreeMap::new();
    schema.insert("openWorld".to_string(), count("Open World", 2));
    schema.insert("noSpace".to_string(), count("No Space Left", 1));
    schema.insert(
        "colorful".to_string(),
        Achievement {
            name: "Colorful".to_string(),
            required: Requirement::Colors(vec![
                "#ff0000".to_string(),
                "#00ff00".to_string(),
                "#0000ff".to_string(),
            ]),
            current: Progress::Colors(Vec::new()),
            unlocked: false,
        },
    );
    schema.insert(
        "godOfColors".to_string(),
        Achievement {
            name: "God of Colors".to_string(),
            required: Requirement::Count(10),
            current: Progress::Colors(Vec::new()),
            unlocked: false,
        },
    );
    schema.insert("kill100e".to_string(), count("Exterminator", 100));
    schema.insert("kill1000e".to_string(), count("Genocide", 1000));
    schema.insert("survive1m".to_string(), count("Survivor", 60));
    schema.insert("survive5m".to_string(), count("Veteran", 300));
    schema.insert("survive10m".to_string(), count("Unkillable", 600));
    schema.insert("survive20m".to_string(), count("Immortal", 1200));
    schema.insert("score1000".to_string(), count("Scorer", 1000));
    schema.insert("score5000".to_string(), count("High Roller", 5000));
    schema.insert("score10000".to_string(), count("Legend", 10000));
    schema
}
