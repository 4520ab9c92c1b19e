// Per-tick simulation systems, orchestrated by the session controller.

pub mod combat;
pub mod motion;

pub use combat::{collides, player_touches_edge, resolve_projectile_hits};
pub use motion::{advance_all, exit_side, Exit};
