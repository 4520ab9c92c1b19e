//! Points, window rectangles and the canvas<->monitor coordinate transforms
//! used when an entity crosses a window boundary.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Unit vector pointing from `self` toward `target`.
    pub fn direction_to(self, target: Vec2) -> Vec2 {
        let angle = (target.y - self.y).atan2(target.x - self.x);
        Vec2::new(angle.cos(), angle.sin())
    }
}

/// Canvas-local point expressed in monitor space, given the window's outer
/// position on the monitor.
pub fn canvas_to_monitor(p: Vec2, window_pos: Vec2) -> Vec2 {
    Vec2::new(p.x + window_pos.x, p.y + window_pos.y)
}

/// Monitor-space point expressed in a window's canvas-local frame.
pub fn monitor_to_canvas(p: Vec2, window_pos: Vec2) -> Vec2 {
    Vec2::new(p.x - window_pos.x, p.y - window_pos.y)
}

/// Outer position plus inner size of one OS window, in monitor space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindowRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl WindowRect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.x + self.w && p.y >= self.y && p.y <= self.y + self.h
    }

    pub fn overlaps(&self, other: &WindowRect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }
}
