use serde::Serialize;

/// Visual tag for an enemy. The color doubles as the type id on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyColor {
    Red,
    Green,
    Purple,
    Orange,
}

/// AI policy governing an enemy's movement and attack pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyBehavior {
    Standard,
    Fast,
    Tank,
    Ranged,
}

/// Static per-type stats layered on top of wave scaling.
#[derive(Debug, Clone, Copy)]
pub struct EnemyArchetype {
    pub color: EnemyColor,
    pub behavior: EnemyBehavior,
    pub speed_multiplier: f32,
    pub hp_multiplier: f32,
    pub damage: f32,
    /// Seconds between shots. Only meaningful for ranged behavior.
    pub shoot_cooldown: f32,
}

pub const ENEMY_ARCHETYPES: [EnemyArchetype; 4] = [
    EnemyArchetype {
        color: EnemyColor::Red,
        behavior: EnemyBehavior::Standard,
        speed_multiplier: 1.0,
        hp_multiplier: 1.0,
        damage: 1.0,
        shoot_cooldown: 0.0,
    },
    EnemyArchetype {
        color: EnemyColor::Green,
        behavior: EnemyBehavior::Fast,
        speed_multiplier: 1.5,
        hp_multiplier: 0.5,
        damage: 0.5,
        shoot_cooldown: 0.0,
    },
    EnemyArchetype {
        color: EnemyColor::Purple,
        behavior: EnemyBehavior::Tank,
        speed_multiplier: 0.7,
        hp_multiplier: 2.0,
        damage: 2.0,
        shoot_cooldown: 0.0,
    },
    EnemyArchetype {
        color: EnemyColor::Orange,
        behavior: EnemyBehavior::Ranged,
        speed_multiplier: 1.0,
        hp_multiplier: 1.0,
        damage: 1.0,
        shoot_cooldown: 2.0,
    },
];

impl EnemyColor {
    /// Looks up the static definition for this color.
    pub fn archetype(self) -> &'static EnemyArchetype {
        match self {
            EnemyColor::Red => &ENEMY_ARCHETYPES[0],
            EnemyColor::Green => &ENEMY_ARCHETYPES[1],
            EnemyColor::Purple => &ENEMY_ARCHETYPES[2],
            EnemyColor::Orange => &ENEMY_ARCHETYPES[3],
        }
    }
}
