// Use-case level inputs/outputs for the lobby loop.

use crate::domain::state::{
    BulletSnapshot, EnemyBulletSnapshot, EnemySnapshot, InputCommand, PlayerId, PlayerSnapshot,
};
use tokio::sync::oneshot;

/// Inbound events delivered to a lobby's task. Everything that can mutate a
/// lobby flows through this enum, so the task is the only writer.
#[derive(Debug)]
pub enum GameEvent {
    Join {
        player_id: PlayerId,
        respond_to: oneshot::Sender<Result<(), JoinError>>,
    },
    Leave {
        player_id: PlayerId,
    },
    Input {
        player_id: PlayerId,
        command: InputCommand,
    },
    Fire {
        player_id: PlayerId,
        dir_x: f32,
        dir_y: f32,
    },
    Start {
        player_id: PlayerId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    Full,
}

/// One roster entry: stable id plus the 1-based display slot.
#[derive(Debug, Clone)]
pub struct LobbyMember {
    pub id: PlayerId,
    pub index: u32,
}

/// Lifecycle announcements, broadcast alongside (not inside) the per-tick
/// snapshot stream.
#[derive(Debug, Clone)]
pub enum LobbyEvent {
    MembershipChanged { players: Vec<LobbyMember> },
    GameStarted,
    Victory,
    GameOver,
}

/// Coarse lobby state observed by the registry's cleanup watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyPhase {
    Idle,
    Running,
    Closed,
}

/// Authoritative state snapshot produced once per tick while running.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub players: Vec<PlayerSnapshot>,
    pub enemies: Vec<EnemySnapshot>,
    pub bullets: Vec<BulletSnapshot>,
    pub enemy_bullets: Vec<EnemyBulletSnapshot>,
    pub wave: u32,
    /// Minimum acknowledged input sequence across all players; clients trim
    /// their replay buffers up to this point.
    pub last_processed_input: u64,
}
