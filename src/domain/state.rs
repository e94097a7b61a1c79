// Domain-level simulation entities and input/snapshot types.

use crate::domain::tuning::enemies::{EnemyBehavior, EnemyColor};
use crate::domain::tuning::world::{
    MAX_WAVES, PLAYER_MAX_HP, PLAYER_SPAWN_X, PLAYER_SPAWN_Y, SPAWN_INTERVAL_SECS,
};
use std::collections::HashMap;

pub type PlayerId = u64;

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    /// 1-based slot shown to clients, recomputed on every membership change.
    pub index: u32,
    /// Facing direction reported to clients; defaults to "up".
    pub dir_x: f32,
    pub dir_y: f32,
    pub dead: bool,
    /// Sequence number of the last applied input, for client reconciliation.
    pub last_processed_input: u64,
}

impl Player {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            x: PLAYER_SPAWN_X,
            y: PLAYER_SPAWN_Y,
            hp: PLAYER_MAX_HP,
            index: 1,
            dir_x: 0.0,
            dir_y: -1.0,
            dead: false,
            last_processed_input: 0,
        }
    }

    /// Returns the player to spawn with full health. Clients restart input
    /// numbering from zero after a reset, so the reconciliation counter
    /// resets with it.
    pub fn reset(&mut self) {
        self.x = PLAYER_SPAWN_X;
        self.y = PLAYER_SPAWN_Y;
        self.hp = PLAYER_MAX_HP;
        self.dead = false;
        self.last_processed_input = 0;
    }
}

#[derive(Debug, Clone)]
pub struct Enemy {
    pub color: EnemyColor,
    pub behavior: EnemyBehavior,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    /// Units per tick, wave-scaled.
    pub speed: f32,
    pub damage: f32,
    /// Seconds between shots; zero for melee behaviors.
    pub shoot_cooldown: f32,
    /// Seconds until the next allowed shot. Starts at zero so ranged
    /// enemies fire on their first AI step.
    pub shoot_timer: f32,
}

#[derive(Debug, Clone)]
pub struct Bullet {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub owner: PlayerId,
    /// Set during collision resolution; consumed bullets are culled at the
    /// end of the phase.
    pub hit: bool,
}

#[derive(Debug, Clone)]
pub struct EnemyBullet {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub damage: f32,
    pub hit: bool,
}

/// A single buffered movement command from a client.
#[derive(Debug, Clone, Copy)]
pub struct InputCommand {
    pub sequence: u64,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// Per-player buffers of pending movement commands. Event handlers append,
/// the tick drains. Both run on the lobby task, so a drain is an atomic
/// boundary: commands arriving afterwards belong to the next tick.
#[derive(Debug, Default)]
pub struct InputQueue {
    pending: HashMap<PlayerId, Vec<InputCommand>>,
}

impl InputQueue {
    pub fn enqueue(&mut self, player_id: PlayerId, command: InputCommand) {
        self.pending.entry(player_id).or_default().push(command);
    }

    /// Removes and returns every buffered command for `player_id` in
    /// arrival order. A command handed out here can never be handed out
    /// again.
    pub fn take(&mut self, player_id: PlayerId) -> Vec<InputCommand> {
        self.pending.remove(&player_id).unwrap_or_default()
    }

    pub fn remove_player(&mut self, player_id: PlayerId) {
        self.pending.remove(&player_id);
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pending.values().all(Vec::is_empty)
    }
}

/// Full mutable simulation state for one lobby. Owned exclusively by that
/// lobby's task; nothing outside the task ever touches it.
pub struct LobbyWorld {
    /// Join order. This vector is the fixed iteration order used for
    /// nearest-player tie-breaks and host handoff.
    pub players: Vec<Player>,
    pub enemies: Vec<Enemy>,
    pub bullets: Vec<Bullet>,
    pub enemy_bullets: Vec<EnemyBullet>,
    pub inputs: InputQueue,
    pub wave: u32,
    pub max_waves: u32,
    pub running: bool,
    pub host: Option<PlayerId>,
    pub enemies_to_spawn: u32,
    /// Seconds until the next spawn batch is released.
    pub spawn_timer: f32,
}

impl LobbyWorld {
    pub fn new() -> Self {
        Self {
            players: Vec::new(),
            enemies: Vec::new(),
            bullets: Vec::new(),
            enemy_bullets: Vec::new(),
            inputs: InputQueue::default(),
            wave: 1,
            max_waves: MAX_WAVES,
            running: false,
            host: None,
            enemies_to_spawn: 0,
            spawn_timer: SPAWN_INTERVAL_SECS,
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Adds a player at the end of the join order and makes them host if
    /// the lobby had none. Capacity is checked by the caller.
    pub fn add_player(&mut self, id: PlayerId) {
        self.players.push(Player::new(id));
        if self.host.is_none() {
            self.host = Some(id);
        }
        self.reindex_players();
    }

    /// Removes a player, dropping their pending inputs and handing the host
    /// slot to the earliest-joined survivor if needed. Returns false if the
    /// id was not a member.
    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.id != id);
        if self.players.len() == before {
            return false;
        }
        self.inputs.remove_player(id);
        if self.host == Some(id) {
            self.host = self.players.first().map(|p| p.id);
        }
        self.reindex_players();
        true
    }

    fn reindex_players(&mut self) {
        for (i, player) in self.players.iter_mut().enumerate() {
            player.index = i as u32 + 1;
        }
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= crate::domain::tuning::world::MAX_PLAYERS
    }
}

impl Default for LobbyWorld {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    pub index: u32,
    pub dir_x: f32,
    pub dir_y: f32,
    pub dead: bool,
    pub last_processed_input: u64,
}

#[derive(Debug, Clone)]
pub struct EnemySnapshot {
    pub color: EnemyColor,
    pub behavior: EnemyBehavior,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
}

#[derive(Debug, Clone)]
pub struct BulletSnapshot {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

#[derive(Debug, Clone)]
pub struct EnemyBulletSnapshot {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl From<&Player> for PlayerSnapshot {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            x: p.x,
            y: p.y,
            hp: p.hp,
            index: p.index,
            dir_x: p.dir_x,
            dir_y: p.dir_y,
            dead: p.dead,
            last_processed_input: p.last_processed_input,
        }
    }
}

impl From<&Enemy> for EnemySnapshot {
    fn from(e: &Enemy) -> Self {
        Self {
            color: e.color,
            behavior: e.behavior,
            x: e.x,
            y: e.y,
            hp: e.hp,
        }
    }
}

impl From<&Bullet> for BulletSnapshot {
    fn from(b: &Bullet) -> Self {
        Self {
            x: b.x,
            y: b.y,
            vx: b.vx,
            vy: b.vy,
        }
    }
}

impl From<&EnemyBullet> for EnemyBulletSnapshot {
    fn from(b: &EnemyBullet) -> Self {
        Self {
            x: b.x,
            y: b.y,
            vx: b.vx,
            vy: b.vy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_queue_take_clears_the_buffer() {
        let mut queue = InputQueue::default();
        let command = InputCommand {
            sequence: 1,
            up: true,
            down: false,
            left: false,
            right: false,
        };
        queue.enqueue(7, command);
        queue.enqueue(7, InputCommand {
            sequence: 2,
            ..command
        });

        let drained = queue.take(7);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].sequence, 1);
        assert_eq!(drained[1].sequence, 2);

        // Nothing is handed out twice.
        assert!(queue.take(7).is_empty());
    }

    #[test]
    fn input_queue_keeps_players_separate() {
        let mut queue = InputQueue::default();
        let command = InputCommand {
            sequence: 5,
            up: false,
            down: true,
            left: false,
            right: false,
        };
        queue.enqueue(1, command);
        queue.enqueue(2, command);

        assert_eq!(queue.take(1).len(), 1);
        assert_eq!(queue.take(2).len(), 1);
    }

    #[test]
    fn first_player_becomes_host() {
        let mut world = LobbyWorld::new();
        world.add_player(10);
        world.add_player(20);
        assert_eq!(world.host, Some(10));
        assert_eq!(world.player(10).unwrap().index, 1);
        assert_eq!(world.player(20).unwrap().index, 2);
    }

    #[test]
    fn host_leaving_hands_off_to_earliest_joined() {
        let mut world = LobbyWorld::new();
        world.add_player(10);
        world.add_player(20);
        world.add_player(30);

        assert!(world.remove_player(10));
        assert_eq!(world.host, Some(20));
        // Indexes are recomputed so the roster stays 1-based and dense.
        assert_eq!(world.player(20).unwrap().index, 1);
        assert_eq!(world.player(30).unwrap().index, 2);
    }

    #[test]
    fn removing_a_stranger_is_a_no_op() {
        let mut world = LobbyWorld::new();
        world.add_player(10);
        assert!(!world.remove_player(99));
        assert_eq!(world.host, Some(10));
    }

    #[test]
    fn lobby_is_full_at_four_players() {
        let mut world = LobbyWorld::new();
        for id in 1..=4 {
            world.add_player(id);
        }
        assert!(world.is_full());
    }
}
