//! Boundary to the OS windowing system.
//!
//! The game core only ever talks to [`WindowPlatform`]; a desktop shell would
//! implement it against real OS windows. [`HeadlessPlatform`] is the
//! in-process implementation used by the demo binary and the tests: windows
//! are plain rectangles in a shared registry, and window lifecycle events are
//! rebroadcast so a supervisor can attach a session to each new window.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::geometry::{Vec2, WindowRect};

#[derive(Debug, Clone)]
pub enum PlatformError {
    WindowNotFound(String),
    NoMonitor,
    Backend(String),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::WindowNotFound(id) => write!(f, "window {id:?} not found"),
            PlatformError::NoMonitor => write!(f, "no monitor detected"),
            PlatformError::Backend(msg) => write!(f, "platform backend error: {msg}"),
        }
    }
}

impl std::error::Error for PlatformError {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorInfo {
    pub width: f64,
    pub height: f64,
}

impl MonitorInfo {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Parameters for window creation; mirrors the desktop shell's command.
#[derive(Debug, Clone)]
pub struct WindowSpec {
    pub id: String,
    pub rect: WindowRect,
    pub title: String,
    pub decorations: bool,
    pub focused: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WindowEvent {
    Created { id: String },
    Closed { id: String },
    Moved { id: String, position: Vec2 },
}

#[async_trait]
pub trait WindowPlatform: Send + Sync {
    async fn create_window(&self, spec: WindowSpec) -> Result<(), PlatformError>;
    async fn close_window(&self, id: &str) -> Result<(), PlatformError>;
    async fn outer_position(&self, id: &str) -> Result<Vec2, PlatformError>;
    async fn inner_size(&self, id: &str) -> Result<(f64, f64), PlatformError>;
    async fn set_size(&self, id: &str, w: f64, h: f64) -> Result<(), PlatformError>;
    async fn set_position(&self, id: &str, x: f64, y: f64) -> Result<(), PlatformError>;
    /// Rects of every open window, for overlap checks when placing new ones.
    async fn window_rects(&self) -> Result<Vec<WindowRect>, PlatformError>;
    /// `None` degrades centering operations to no-ops during gameplay.
    async fn current_monitor(&self) -> Option<MonitorInfo>;
    async fn monitor_count(&self) -> usize {
        1
    }
    async fn scale_factor(&self) -> f64 {
        1.0
    }
    fn subscribe_windows(&self) -> broadcast::Receiver<WindowEvent>;
}

/// Window registry with no OS behind it.
pub struct HeadlessPlatform {
    windows: Mutex<HashMap<String, WindowRect>>,
    monitor: MonitorInfo,
    events: broadcast::Sender<WindowEvent>,
}

impl HeadlessPlatform {
    pub fn new(monitor: MonitorInfo) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            windows: Mutex::new(HashMap::new()),
            monitor,
            events,
        })
    }

    fn with_window<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut WindowRect) -> T,
    ) -> Result<T, PlatformError> {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        windows
            .get_mut(id)
            .map(f)
            .ok_or_else(|| PlatformError::WindowNotFound(id.to_string()))
    }
}

#[async_trait]
impl WindowPlatform for HeadlessPlatform {
    async fn create_window(&self, spec: WindowSpec) -> Result<(), PlatformError> {
        {
            let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
            // An existing id is focused, not re-created.
            if windows.contains_key(&spec.id) {
                return Ok(());
            }
            windows.insert(spec.id.clone(), spec.rect);
        }
        let _ = self.events.send(WindowEvent::Created { id: spec.id });
        Ok(())
    }

    async fn close_window(&self, id: &str) -> Result<(), PlatformError> {
        let removed = {
            let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
            windows.remove(id).is_some()
        };
        if !removed {
            return Err(PlatformError::WindowNotFound(id.to_string()));
        }
        let _ = self.events.send(WindowEvent::Closed { id: id.to_string() });
        Ok(())
    }

    async fn outer_position(&self, id: &str) -> Result<Vec2, PlatformError> {
        self.with_window(id, |r| r.position())
    }

    async fn inner_size(&self, id: &str) -> Result<(f64, f64), PlatformError> {
        self.with_window(id, |r| (r.w, r.h))
    }

    async fn set_size(&self, id: &str, w: f64, h: f64) -> Result<(), PlatformError> {
        self.with_window(id, |r| {
            r.w = w;
            r.h = h;
        })
    }

    async fn set_position(&self, id: &str, x: f64, y: f64) -> Result<(), PlatformError> {
        let position = self.with_window(id, |r| {
            r.x = x;
            r.y = y;
            r.position()
        })?;
        let _ = self.events.send(WindowEvent::Moved {
            id: id.to_string(),
            position,
        });
        Ok(())
    }

    async fn window_rects(&self) -> Result<Vec<WindowRect>, PlatformError> {
        let windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(windows.values().copied().collect())
    }

    async fn current_monitor(&self) -> Option<MonitorInfo> {
        Some(self.monitor)
    }

    fn subscribe_windows(&self) -> broadcast::Receiver<WindowEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_resize_close_round_trip() {
        let platform = HeadlessPlatform::new(MonitorInfo {
            width: 1920.0,
            height: 1080.0,
        });
        let mut events = platform.subscribe_windows();

        platform
            .create_window(WindowSpec {
                id: "main".into(),
                rect: WindowRect::new(10.0, 20.0, 600.0, 600.0),
                title: "WindowKill".into(),
                decorations: false,
                focused: true,
            })
            .await
            .unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            WindowEvent::Created { id: "main".into() }
        );

        platform.set_size("main", 400.0, 350.0).await.unwrap();
        assert_eq!(platform.inner_size("main").await.unwrap(), (400.0, 350.0));
        assert_eq!(
            platform.outer_position("main").await.unwrap(),
            Vec2::new(10.0, 20.0)
        );

        platform.close_window("main").await.unwrap();
        assert!(matches!(
            platform.inner_size("main").await,
            Err(PlatformError::WindowNotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_create_is_a_focus_noop() {
        let platform = HeadlessPlatform::new(MonitorInfo {
            width: 1920.0,
            height: 1080.0,
        });
        let spec = WindowSpec {
            id: "main".into(),
            rect: WindowRect::new(0.0, 0.0, 600.0, 600.0),
            title: "WindowKill".into(),
            decorations: false,
            focused: true,
        };
        platform.create_window(spec.clone()).await.unwrap();
        platform.set_size("main", 300.0, 300.0).await.unwrap();
        platform.create_window(spec).await.unwrap();
        // The original rect survives the second create.
        assert_eq!(platform.inner_size("main").await.unwrap(), (300.0, 300.0));
    }
}
