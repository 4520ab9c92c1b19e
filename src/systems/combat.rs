//! Collision resolution between player, projectiles and enemies.
//!
//! The touching threshold is center distance minus both radii under 1px —
//! deliberately not `<= 0`; the slack is part of the game feel. Enemies do
//! not collide with each other.

use tracing::debug;

use crate::entity::{Entity, HitOutcome};

/// 1px of slack on every collision check.
pub const COLLISION_SLACK: f64 = 1.0;

pub fn collides(a: &Entity, b: &Entity) -> bool {
    a.pos.distance(b.pos) - a.radius - b.radius < COLLISION_SLACK
}

/// Resolves projectile/enemy hits in place. A hit consumes the projectile
/// and either shrinks the enemy or, when the remaining radius would be too
/// small, removes it. Returns the number of enemies killed this tick.
pub fn resolve_projectile_hits(enemies: &mut Vec<Entity>, projectiles: &mut Vec<Entity>) -> u32 {
    let mut kills = 0;
    'enemies: for ei in (0..enemies.len()).rev() {
        for pi in (0..projectiles.len()).rev() {
            if !collides(&enemies[ei], &projectiles[pi]) {
                continue;
            }
            projectiles.remove(pi);
            match enemies[ei].apply_hit() {
                HitOutcome::Shrunk => {
                    debug!(radius = enemies[ei].radius, "enemy shrunk");
                }
                HitOutcome::Killed => {
                    enemies.remove(ei);
                    kills += 1;
                    continue 'enemies;
                }
            }
        }
    }
    kills
}

/// True once the player's bounding circle touches or crosses any canvas edge.
pub fn player_touches_edge(player: &Entity, width: f64, height: f64) -> bool {
    player.pos.x - player.radius <= 0.0
        || player.pos.x + player.radius >= width
        || player.pos.y - player.radius <= 0.0
        || player.pos.y + player.radius >= height
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec2;

    fn enemy(x: f64, radius: f64) -> Entity {
        Entity::enemy(Vec2::new(x, 0.0), radius, "#ff0000", Vec2::default())
    }

    fn projectile(x: f64) -> Entity {
        Entity::projectile(Vec2::new(x, 0.0), 5.0, "#ffffff", Vec2::default())
    }

    #[test]
    fn collision_threshold_sits_just_under_one_pixel() {
        let a = enemy(0.0, 10.0);
        // gap = d - r1 - r2; radii sum to 15.
        let touching = projectile(15.999);
        let apart = projectile(16.001);
        assert!(collides(&a, &touching));
        assert!(!collides(&a, &apart));
    }

    #[test]
    fn big_enemy_shrinks_small_enemy_dies() {
        let mut enemies = vec![enemy(0.0, 16.0)];
        let mut projectiles = vec![projectile(10.0)];
        let kills = resolve_projectile_hits(&mut enemies, &mut projectiles);
        assert_eq!(kills, 0);
        assert_eq!(enemies.len(), 1);
        assert!((enemies[0].radius - 6.0).abs() < 1e-9);
        assert!(projectiles.is_empty());

        let mut enemies = vec![enemy(0.0, 14.0)];
        let mut projectiles = vec![projectile(10.0)];
        let kills = resolve_projectile_hits(&mut enemies, &mut projectiles);
        assert_eq!(kills, 1);
        assert!(enemies.is_empty());
        assert!(projectiles.is_empty());
    }

    #[test]
    fn two_hits_in_one_tick_can_finish_an_enemy() {
        // 26 -> 16 after the first hit, killed by the second (16 - 10 <= 5 is
        // false, so it survives; a 16-radius enemy shrinks to 6).
        let mut enemies = vec![enemy(0.0, 26.0)];
        let mut projectiles = vec![projectile(20.0), projectile(-20.0)];
        let kills = resolve_projectile_hits(&mut enemies, &mut projectiles);
        assert_eq!(kills, 0);
        assert_eq!(enemies.len(), 1);
        assert!((enemies[0].radius - 6.0).abs() < 1e-9);
        assert!(projectiles.is_empty());
    }

    #[test]
    fn player_edge_check_includes_touching() {
        let mut player = Entity::player(Vec2::new(200.0, 150.0), 10.0, "#ffffff");
        assert!(!player_touches_edge(&player, 400.0, 300.0));
        player.pos.x = 10.0;
        assert!(player_touches_edge(&player, 400.0, 300.0));
        player.pos.x = 390.0;
        assert!(player_touches_edge(&player, 400.0, 300.0));
        player.pos = Vec2::new(200.0, 290.0);
        assert!(player_touches_edge(&player, 400.0, 300.0));
    }
}
