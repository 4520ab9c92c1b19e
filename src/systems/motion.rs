//! Entity advancement and canvas-exit classification.

use crate::entity::Entity;

/// Which canvas bound an entity crossed, fully radius-inclusive: an entity
/// has exited only once its whole circle is outside the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Left,
    Right,
    Top,
    Bottom,
}

/// Advances every entity by one tick.
pub fn advance_all(entities: &mut [Entity]) {
    for e in entities.iter_mut() {
        e.advance();
    }
}

/// Classifies an out-of-bounds entity by the bound it crossed, or `None`
/// while any part of it is still on the canvas.
pub fn exit_side(e: &Entity, width: f64, height: f64) -> Option<Exit> {
    if e.pos.x + e.radius < 0.0 {
        Some(Exit::Left)
    } else if e.pos.x - e.radius > width {
        Some(Exit::Right)
    } else if e.pos.y + e.radius < 0.0 {
        Some(Exit::Top)
    } else if e.pos.y - e.radius > height {
        Some(Exit::Bottom)
    } else {
        None
    }
}
