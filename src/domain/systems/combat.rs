use crate::domain::state::{Bullet, LobbyWorld, PlayerId};
use crate::domain::tuning::enemies::EnemyBehavior;
use crate::domain::tuning::world::{
    BULLET_BOUNDS_MARGIN, BULLET_DAMAGE, BULLET_HIT_RADIUS, BULLET_HIT_RADIUS_TANK, BULLET_SPEED,
    BULLET_SPAWN_OFFSET, ENEMY_BULLET_DAMAGE_SCALE, ENEMY_BULLET_HIT_RADIUS, WORLD_HEIGHT,
    WORLD_WIDTH,
};

/// Spawns one player bullet traveling toward `(dir_x, dir_y)`. Dead or
/// unknown shooters and zero or non-finite directions are dropped silently;
/// lagging clients send plenty of both.
pub fn fire_bullet(world: &mut LobbyWorld, player_id: PlayerId, dir_x: f32, dir_y: f32) {
    let Some(player) = world.player(player_id) else {
        return;
    };
    if player.dead {
        return;
    }

    let length = dir_x.hypot(dir_y);
    if !length.is_finite() || length == 0.0 {
        return;
    }

    world.bullets.push(Bullet {
        x: player.x + BULLET_SPAWN_OFFSET,
        y: player.y + BULLET_SPAWN_OFFSET,
        vx: dir_x / length * BULLET_SPEED,
        vy: dir_y / length * BULLET_SPEED,
        owner: player_id,
        hit: false,
    });
}

/// Moves player bullets, resolves hits against enemies, and culls spent
/// bullets and dead enemies. Every bullet is tested against every enemy:
/// one bullet can strike several overlapping enemies in the same tick.
pub fn tick_bullets(world: &mut LobbyWorld) {
    for bullet in &mut world.bullets {
        bullet.x += bullet.vx;
        bullet.y += bullet.vy;
    }

    for bullet in &mut world.bullets {
        for enemy in &mut world.enemies {
            let radius = if enemy.behavior == EnemyBehavior::Tank {
                BULLET_HIT_RADIUS_TANK
            } else {
                BULLET_HIT_RADIUS
            };
            if (bullet.x - enemy.x).hypot(bullet.y - enemy.y) < radius {
                enemy.hp -= BULLET_DAMAGE;
                bullet.hit = true;
            }
        }
    }

    world
        .bullets
        .retain(|b| !b.hit && in_extended_bounds(b.x, b.y));
    world.enemies.retain(|e| e.hp > 0.0);
}

/// Moves enemy bullets and resolves hits against living players, applying
/// the scaled bullet damage.
pub fn tick_enemy_bullets(world: &mut LobbyWorld) {
    for bullet in &mut world.enemy_bullets {
        bullet.x += bullet.vx;
        bullet.y += bullet.vy;

        for player in &mut world.players {
            if player.dead {
                continue;
            }
            if (bullet.x - player.x).hypot(bullet.y - player.y) < ENEMY_BULLET_HIT_RADIUS {
                player.hp -= bullet.damage * ENEMY_BULLET_DAMAGE_SCALE;
                bullet.hit = true;
                if player.hp <= 0.0 {
                    player.dead = true;
                }
            }
        }
    }

    world
        .enemy_bullets
        .retain(|b| !b.hit && in_extended_bounds(b.x, b.y));
}

fn in_extended_bounds(x: f32, y: f32) -> bool {
    x >= -BULLET_BOUNDS_MARGIN
        && x <= WORLD_WIDTH + BULLET_BOUNDS_MARGIN
        && y >= -BULLET_BOUNDS_MARGIN
        && y <= WORLD_HEIGHT + BULLET_BOUNDS_MARGIN
}
