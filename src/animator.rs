//! Smooth window geometry animation.
//!
//! One animator per window drives linearly interpolated resize/reposition
//! toward a target over a fixed duration, sampling once per frame tick.
//! Starting a new animation cancels the in-flight one (replace, not stack),
//! so a window never has two competing geometry writers. Platform failures
//! are logged and the animation carries on best-effort.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::warn;

use crate::config::TICK_INTERVAL;
use crate::platform::WindowPlatform;

/// Which edge stays put while the size changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Position untouched; the window grows/shrinks to the right and down.
    Free,
    /// Right edge fixed: expanding to the left moves the window left.
    Left,
    /// Bottom edge fixed: expanding upward moves the window up.
    Top,
    /// Both axes change symmetrically around the center.
    Center,
}

struct Animation {
    cancelled: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct WindowAnimator {
    platform: Arc<dyn WindowPlatform>,
    window_id: String,
    current: Option<Animation>,
}

impl WindowAnimator {
    pub fn new(platform: Arc<dyn WindowPlatform>, window_id: impl Into<String>) -> Self {
        Self {
            platform,
            window_id: window_id.into(),
            current: None,
        }
    }

    /// Animates the window size by `(dw, dh)` over `duration`, holding the
    /// edge selected by `anchor`. Replaces any in-flight animation. Returns
    /// immediately; use [`join`](Self::join) to wait for completion.
    pub async fn start(&mut self, dw: f64, dh: f64, duration: Duration, anchor: Anchor) {
        // The old task must be fully gone before the new one exists, so the
        // window never has two geometry writers.
        if let Some(anim) = self.current.take() {
            anim.cancelled.store(true, Ordering::Relaxed);
            anim.handle.abort();
            let _ = anim.handle.await;
        }

        let (start_w, start_h) = match self.platform.inner_size(&self.window_id).await {
            Ok(size) => size,
            Err(e) => {
                warn!(window = %self.window_id, error = %e, "cannot read size, skipping animation");
                return;
            }
        };
        let start_pos = match self.platform.outer_position(&self.window_id).await {
            Ok(pos) => pos,
            Err(e) => {
                warn!(window = %self.window_id, error = %e, "cannot read position, skipping animation");
                return;
            }
        };

        let cancelled = Arc::new(AtomicBool::new(false));
        let platform = Arc::clone(&self.platform);
        let id = self.window_id.clone();
        let token = Arc::clone(&cancelled);

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = interval(TICK_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if token.load(Ordering::Relaxed) {
                    return;
                }

                // Clamp so the final sample lands exactly on the target.
                let progress = if duration.is_zero() {
                    1.0
                } else {
                    (started.elapsed().as_secs_f64() / duration.as_secs_f64()).min(1.0)
                };

                let w = start_w + dw * progress;
                let h = start_h + dh * progress;
                let (x, y) = match anchor {
                    Anchor::Free => (start_pos.x, start_pos.y),
                    Anchor::Left => (start_pos.x - dw * progress, start_pos.y),
                    Anchor::Top => (start_pos.x, start_pos.y - dh * progress),
                    Anchor::Center => (
                        start_pos.x - dw * progress / 2.0,
                        start_pos.y - dh * progress / 2.0,
                    ),
                };

                if let Err(e) = platform.set_size(&id, w, h).await {
                    warn!(window = %id, error = %e, "set_size failed");
                }
                if let Err(e) = platform.set_position(&id, x, y).await {
                    warn!(window = %id, error = %e, "set_position failed");
                }

                if progress >= 1.0 {
                    return;
                }
            }
        });

        self.current = Some(Animation { cancelled, handle });
    }

    /// Cancels the in-flight animation, if any. The window keeps whatever
    /// intermediate geometry it had.
    pub fn cancel(&mut self) {
        if let Some(anim) = self.current.take() {
            anim.cancelled.store(true, Ordering::Relaxed);
            anim.handle.abort();
        }
    }

    /// Waits for the current animation to run to completion.
    pub async fn join(&mut self) {
        if let Some(anim) = self.current.take() {
            let _ = anim.handle.await;
        }
    }
}
