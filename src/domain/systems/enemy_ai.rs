use crate::domain::state::{EnemyBullet, LobbyWorld, Player};
use crate::domain::tuning::enemies::EnemyBehavior;
use crate::domain::tuning::world::{
    ENEMY_BULLET_SPEED, ENEMY_CONTACT_RADIUS, RANGED_ATTACK_RANGE, RANGED_RETREAT_RANGE,
};

/// Runs one AI step for every enemy against its nearest living player.
///
/// Melee behaviors walk straight at the target and deal contact damage when
/// the pre-move distance is inside the contact radius. Ranged enemies keep
/// a standoff band and fire at the target's current position whenever their
/// cooldown expires.
pub fn tick_enemies(world: &mut LobbyWorld, dt: f32) {
    let LobbyWorld {
        players,
        enemies,
        enemy_bullets,
        ..
    } = world;

    for enemy in enemies.iter_mut() {
        let Some(target_index) = nearest_alive_player(players, enemy.x, enemy.y) else {
            continue;
        };
        let target = &mut players[target_index];

        let dx = target.x - enemy.x;
        let dy = target.y - enemy.y;
        let dist = dx.hypot(dy);

        match enemy.behavior {
            EnemyBehavior::Standard | EnemyBehavior::Fast | EnemyBehavior::Tank => {
                if dist > 0.0 {
                    enemy.x += dx / dist * enemy.speed;
                    enemy.y += dy / dist * enemy.speed;
                }

                if dist < ENEMY_CONTACT_RADIUS {
                    target.hp -= enemy.damage;
                    if target.hp <= 0.0 {
                        target.dead = true;
                    }
                }
            }
            EnemyBehavior::Ranged => {
                if dist > RANGED_ATTACK_RANGE {
                    enemy.x += dx / dist * enemy.speed;
                    enemy.y += dy / dist * enemy.speed;
                } else if dist < RANGED_RETREAT_RANGE && dist > 0.0 {
                    enemy.x -= dx / dist * enemy.speed;
                    enemy.y -= dy / dist * enemy.speed;
                }

                enemy.shoot_timer -= dt;
                if enemy.shoot_timer <= 0.0 && dist > 0.0 {
                    enemy_bullets.push(EnemyBullet {
                        x: enemy.x,
                        y: enemy.y,
                        vx: dx / dist * ENEMY_BULLET_SPEED,
                        vy: dy / dist * ENEMY_BULLET_SPEED,
                        damage: enemy.damage,
                        hit: false,
                    });
                    enemy.shoot_timer = enemy.shoot_cooldown;
                }
            }
        }
    }
}

/// Index of the nearest living player. Strict comparison keeps the first
/// minimum, so equidistant targets resolve to the earliest-joined player.
fn nearest_alive_player(players: &[Player], x: f32, y: f32) -> Option<usize> {
    let mut nearest = None;
    let mut min_dist = f32::INFINITY;
    for (index, player) in players.iter().enumerate() {
        if player.dead {
            continue;
        }
        let dist = (player.x - x).hypot(player.y - y);
        if dist < min_dist {
            min_dist = dist;
            nearest = Some(index);
        }
    }
    nearest
}
