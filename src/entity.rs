//! Simulation entities shared by every window: the player, projectiles,
//! enemies and N-gon bosses, as one tagged type with a common physical core.

use serde::{Deserialize, Serialize};

use crate::geometry::Vec2;

/// Radius lost per projectile hit.
pub const HIT_RADIUS_LOSS: f64 = 10.0;

/// An entity whose radius would drop to this or below after a hit dies
/// instead of shrinking.
pub const KILL_RADIUS: f64 = 5.0;

/// Minimum radius for polygon-sided (boss) entities.
pub const MIN_BOSS_RADIUS: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityKind {
    Player,
    Projectile,
    Enemy,
    /// Regular N-gon with a fixed random rotation, drawn sides-first.
    Boss { sides: u32, rotation: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub pos: Vec2,
    pub radius: f64,
    pub color: String,
    pub velocity: Vec2,
    pub velocity_multiplier: f64,
    /// Eligible for transfer to another window instead of despawning when it
    /// leaves the canvas.
    pub cross_window: bool,
    #[serde(flatten)]
    pub kind: EntityKind,
}

/// What a projectile hit did to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    Shrunk,
    Killed,
}

impl Entity {
    pub fn player(pos: Vec2, radius: f64, color: &str) -> Self {
        Self {
            pos,
            radius,
            color: color.to_string(),
            velocity: Vec2::default(),
            velocity_multiplier: 1.0,
            cross_window: false,
            kind: EntityKind::Player,
        }
    }

    pub fn projectile(pos: Vec2, radius: f64, color: &str, velocity: Vec2) -> Self {
        Self {
            pos,
            radius,
            color: color.to_string(),
            velocity,
            velocity_multiplier: 1.0,
            cross_window: false,
            kind: EntityKind::Projectile,
        }
    }

    pub fn enemy(pos: Vec2, radius: f64, color: &str, velocity: Vec2) -> Self {
        Self {
            pos,
            radius,
            color: color.to_string(),
            velocity,
            velocity_multiplier: 1.0,
            cross_window: false,
            kind: EntityKind::Enemy,
        }
    }

    pub fn boss(pos: Vec2, radius: f64, color: &str, sides: u32, rotation: f64) -> Self {
        Self {
            pos,
            radius: radius.max(MIN_BOSS_RADIUS),
            color: color.to_string(),
            velocity: Vec2::default(),
            velocity_multiplier: 1.0,
            cross_window: false,
            kind: EntityKind::Boss {
                sides: sides.max(3),
                rotation,
            },
        }
    }

    /// One simulation tick: position advances by velocity times multiplier.
    pub fn advance(&mut self) {
        self.pos.x += self.velocity.x * self.velocity_multiplier;
        self.pos.y += self.velocity.y * self.velocity_multiplier;
    }

    pub fn is_boss(&self) -> bool {
        matches!(self.kind, EntityKind::Boss { .. })
    }

    /// Applies one projectile hit. The entity shrinks by [`HIT_RADIUS_LOSS`]
    /// only if the result stays above [`KILL_RADIUS`]; otherwise it dies.
    pub fn apply_hit(&mut self) -> HitOutcome {
        if self.radius - HIT_RADIUS_LOSS > KILL_RADIUS {
            self.radius -= HIT_RADIUS_LOSS;
            HitOutcome::Shrunk
        } else {
            HitOutcome::Killed
        }
    }
}
