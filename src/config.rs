use std::{env, path::PathBuf, time::Duration};

// Runtime constants (not gameplay tuning — that lives in `tuning`).

/// Fixed step for session tick loops and animation sampling (~60 Hz).
pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 60);

/// Capacity of the broadcast channel backing the sync bus.
pub const SYNC_CHANNEL_CAPACITY: usize = 100;

/// Capacity for inbound session commands.
pub const COMMAND_CHANNEL_CAPACITY: usize = 1024;

/// How many recently-seen message ids each subscriber remembers for dedup.
pub const SEEN_IDS_CAPACITY: usize = 64;

/// Width the gameplay constants were tuned against; everything spatial is
/// scaled by `reference / actual` monitor width.
pub const REFERENCE_SCREEN_WIDTH: f64 = 1920.0;

/// Unscaled side length of the primary window at session start and game over.
pub const DEFAULT_WINDOW_WIDTH: f64 = 600.0;

pub const PLAYER_RADIUS: f64 = 10.0;
pub const PROJECTILE_RADIUS: f64 = 5.0;
pub const PROJECTILE_SPEED: f64 = 5.0;

/// Concurrent satellite windows the primary session will keep open at most.
pub const MAX_SATELLITE_WINDOWS: usize = 6;

/// Cadence at which the primary tries to open another satellite window.
pub const SATELLITE_SPAWN_INTERVAL: Duration = Duration::from_secs(5);

/// Process-wide cap on concurrent bosses, enforced via bus messages.
pub const BOSS_CAP: u32 = 3;

/// Seconds between boss shots in a satellite window.
pub const BOSS_SHOOT_INTERVAL: Duration = Duration::from_secs(2);

/// Cadence of the shrink loop in the primary window.
pub const SHRINK_INTERVAL: Duration = Duration::from_millis(50);

/// Duration of one shrink animation step.
pub const SHRINK_ANIMATION: Duration = Duration::from_millis(50);

/// Duration of the expand-on-edge-hit animation.
pub const EXPAND_ANIMATION: Duration = Duration::from_millis(250);

/// Duration of the re-center animation after game over.
pub const GAMEOVER_ANIMATION: Duration = Duration::from_millis(250);

/// Directory for persisted blobs (options, score, achievements).
pub fn data_dir() -> PathBuf {
    env::var("WINDOWKILL_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".windowkill"))
}
