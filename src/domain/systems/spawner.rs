use crate::domain::state::{Enemy, LobbyWorld};
use crate::domain::tuning::enemies::ENEMY_ARCHETYPES;
use crate::domain::tuning::world::{
    ENEMIES_PER_WAVE, ENEMY_BASE_HP, ENEMY_BASE_SPEED, ENEMY_HP_PER_WAVE, ENEMY_SPAWN_MARGIN,
    ENEMY_SPEED_PER_WAVE, SPAWN_BATCH_SIZE, SPAWN_INTERVAL_SECS, WORLD_HEIGHT, WORLD_WIDTH,
};
use rand::Rng;

/// Resets per-wave state: clears the field, refills the spawn budget, and
/// returns every player to spawn with a fresh input buffer. Player bullets
/// in flight survive the transition.
pub fn setup_wave(world: &mut LobbyWorld) {
    world.enemies.clear();
    world.enemy_bullets.clear();
    world.enemies_to_spawn = world.wave * ENEMIES_PER_WAVE;
    world.spawn_timer = SPAWN_INTERVAL_SECS;
    for player in &mut world.players {
        player.reset();
    }
    world.inputs.clear();
}

/// Releases a batch of enemies each time the spawn interval elapses, until
/// the wave's budget runs out.
pub fn tick_spawns(world: &mut LobbyWorld, dt: f32, rng: &mut impl Rng) {
    if world.enemies_to_spawn == 0 {
        return;
    }
    world.spawn_timer -= dt;
    if world.spawn_timer > 0.0 {
        return;
    }
    world.spawn_timer = SPAWN_INTERVAL_SECS;

    let batch = SPAWN_BATCH_SIZE.min(world.enemies_to_spawn);
    for _ in 0..batch {
        let enemy = spawn_enemy(world.wave, rng);
        world.enemies.push(enemy);
        world.enemies_to_spawn -= 1;
    }
}

/// Rolls a uniformly random archetype and edge position, scaling hp and
/// speed with the wave number.
pub fn spawn_enemy(wave: u32, rng: &mut impl Rng) -> Enemy {
    let archetype = &ENEMY_ARCHETYPES[rng.gen_range(0..ENEMY_ARCHETYPES.len())];
    let (x, y) = edge_spawn_point(rng);

    Enemy {
        color: archetype.color,
        behavior: archetype.behavior,
        x,
        y,
        hp: (ENEMY_BASE_HP + wave as f32 * ENEMY_HP_PER_WAVE) * archetype.hp_multiplier,
        speed: (ENEMY_BASE_SPEED + wave as f32 * ENEMY_SPEED_PER_WAVE) * archetype.speed_multiplier,
        damage: archetype.damage,
        shoot_cooldown: archetype.shoot_cooldown,
        shoot_timer: 0.0,
    }
}

/// Picks a point just outside one of the four arena edges.
fn edge_spawn_point(rng: &mut impl Rng) -> (f32, f32) {
    match rng.gen_range(0..4) {
        0 => (rng.gen_range(0.0..WORLD_WIDTH), -ENEMY_SPAWN_MARGIN),
        1 => (
            rng.gen_range(0.0..WORLD_WIDTH),
            WORLD_HEIGHT + ENEMY_SPAWN_MARGIN,
        ),
        2 => (-ENEMY_SPAWN_MARGIN, rng.gen_range(0.0..WORLD_HEIGHT)),
        _ => (
            WORLD_WIDTH + ENEMY_SPAWN_MARGIN,
            rng.gen_range(0.0..WORLD_HEIGHT),
        ),
    }
}
