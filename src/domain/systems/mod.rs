// Simulation systems, called in a fixed order by the tick orchestrator.

pub mod combat;
pub mod enemy_ai;
pub mod movement;
pub mod spawner;
