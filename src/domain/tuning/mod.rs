// Gameplay tuning, kept separate from runtime/server configuration.

pub mod enemies;
pub mod world;

pub use enemies::{ENEMY_ARCHETYPES, EnemyArchetype, EnemyBehavior, EnemyColor};
