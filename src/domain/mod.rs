// Domain layer: core simulation types and rules.

pub mod state;
pub mod systems;
pub mod tuning;

pub use state::{
    Bullet, BulletSnapshot, Enemy, EnemyBullet, EnemyBulletSnapshot, EnemySnapshot, InputCommand,
    InputQueue, LobbyWorld, Player, PlayerId, PlayerSnapshot,
};
