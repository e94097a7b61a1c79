// Arena and combat tuning. These values are part of the wire contract with
// the client; changing them desyncs client-side prediction.

pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 600.0;

/// Player sprites are 20px wide, so the clamp range ends 20 short of the edge.
pub const PLAYER_MAX_X: f32 = WORLD_WIDTH - 20.0;
pub const PLAYER_MAX_Y: f32 = WORLD_HEIGHT - 20.0;

pub const PLAYER_SPAWN_X: f32 = WORLD_WIDTH / 2.0;
pub const PLAYER_SPAWN_Y: f32 = WORLD_HEIGHT / 2.0;
pub const PLAYER_MAX_HP: f32 = 100.0;

/// Movement applied per processed input, in world units per tick.
pub const PLAYER_SPEED: f32 = 5.0;

pub const MAX_PLAYERS: usize = 4;

pub const BULLET_SPEED: f32 = 10.0; // units per tick
pub const BULLET_SPAWN_OFFSET: f32 = 10.0;
pub const BULLET_DAMAGE: f32 = 20.0;
pub const BULLET_HIT_RADIUS: f32 = 15.0;
pub const BULLET_HIT_RADIUS_TANK: f32 = 25.0;

/// Bullets despawn once they drift this far past the arena edge.
pub const BULLET_BOUNDS_MARGIN: f32 = 50.0;

pub const ENEMY_CONTACT_RADIUS: f32 = 20.0;
pub const ENEMY_BULLET_SPEED: f32 = 5.0; // units per tick
pub const ENEMY_BULLET_HIT_RADIUS: f32 = 10.0;

/// Stored enemy damage is tuned for per-tick contact; bullets hit in one
/// burst instead, scaled up. Balance constant, not a bug.
pub const ENEMY_BULLET_DAMAGE_SCALE: f32 = 10.0;

/// Enemies materialize just off-screen before walking in.
pub const ENEMY_SPAWN_MARGIN: f32 = 20.0;

pub const MAX_WAVES: u32 = 20;
pub const ENEMIES_PER_WAVE: u32 = 10; // multiplied by the wave number

pub const SPAWN_INTERVAL_SECS: f32 = 2.0;
pub const SPAWN_BATCH_SIZE: u32 = 3;

pub const ENEMY_BASE_HP: f32 = 50.0;
pub const ENEMY_HP_PER_WAVE: f32 = 10.0;
pub const ENEMY_BASE_SPEED: f32 = 1.0;
pub const ENEMY_SPEED_PER_WAVE: f32 = 0.1;

/// Ranged enemies close in beyond this distance...
pub const RANGED_ATTACK_RANGE: f32 = 150.0;
/// ...and back off inside this one, holding position in between.
pub const RANGED_RETREAT_RANGE: f32 = 100.0;
