use crate::domain::state::{
    BulletSnapshot, EnemyBulletSnapshot, EnemySnapshot, LobbyWorld, PlayerSnapshot,
};
use crate::domain::systems::{combat, enemy_ai, movement, spawner};
use crate::domain::tuning::world::SPAWN_INTERVAL_SECS;
use crate::use_cases::types::{GameEvent, JoinError, LobbyEvent, LobbyMember, LobbyPhase, Snapshot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Outbound channels owned by one lobby task.
pub struct LobbyChannels {
    /// Per-tick snapshots while a game is running.
    pub snapshot_tx: broadcast::Sender<Snapshot>,
    /// Membership and lifecycle announcements.
    pub event_tx: broadcast::Sender<LobbyEvent>,
    /// Coarse phase for the registry's cleanup watcher.
    pub phase_tx: watch::Sender<LobbyPhase>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Victory,
    Defeat,
}

/// Result of one simulation tick.
pub struct TickReport {
    pub snapshot: Snapshot,
    pub outcome: Option<GameOutcome>,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

/// The authoritative loop for one lobby.
///
/// All mutation of the lobby's world happens on this task: inbound events
/// and simulation ticks are interleaved through a single `select!`, so a
/// handler can never observe a half-finished tick. While idle the task only
/// waits for events; the ticker exists exactly while a game is running.
pub async fn lobby_task(
    code: Arc<str>,
    mut events_rx: mpsc::Receiver<GameEvent>,
    channels: LobbyChannels,
    shutdown: Arc<Notify>,
    tick_interval: Duration,
) {
    let mut world = LobbyWorld::new();
    let mut rng = StdRng::from_entropy();
    let dt = tick_interval.as_secs_f32();
    let mut ticker: Option<tokio::time::Interval> = None;

    loop {
        if world.running && ticker.is_none() {
            let start = tokio::time::Instant::now() + tick_interval;
            let mut interval = tokio::time::interval_at(start, tick_interval);
            // An overrunning tick must not be followed by a burst of
            // catch-up ticks.
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker = Some(interval);
        } else if !world.running {
            ticker = None;
        }

        match ticker.as_mut() {
            Some(interval) => {
                tokio::select! {
                    _ = shutdown.notified() => break,
                    event = events_rx.recv() => match event {
                        Some(event) => {
                            if handle_event(&mut world, event, &channels) == Flow::Close {
                                break;
                            }
                        }
                        None => break,
                    },
                    _ = interval.tick() => {
                        run_tick(&mut world, dt, &mut rng, &channels, &code);
                    }
                }
            }
            None => {
                tokio::select! {
                    _ = shutdown.notified() => break,
                    event = events_rx.recv() => match event {
                        Some(event) => {
                            if handle_event(&mut world, event, &channels) == Flow::Close {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
        }
    }

    let _ = channels.phase_tx.send(LobbyPhase::Closed);
    info!(lobby = %code, "lobby closed");
}

fn handle_event(world: &mut LobbyWorld, event: GameEvent, channels: &LobbyChannels) -> Flow {
    match event {
        GameEvent::Join {
            player_id,
            respond_to,
        } => {
            if world.is_full() {
                let _ = respond_to.send(Err(JoinError::Full));
                return Flow::Continue;
            }
            world.add_player(player_id);
            let _ = respond_to.send(Ok(()));
            info!(player_id, "player joined");
            let _ = channels.event_tx.send(LobbyEvent::MembershipChanged {
                players: roster(world),
            });
        }
        GameEvent::Leave { player_id } => {
            if !world.remove_player(player_id) {
                return Flow::Continue;
            }
            info!(player_id, "player left");
            if world.players.is_empty() {
                return Flow::Close;
            }
            let _ = channels.event_tx.send(LobbyEvent::MembershipChanged {
                players: roster(world),
            });
        }
        GameEvent::Input { player_id, command } => {
            // Dead or unknown players cannot queue movement.
            if world.player(player_id).is_some_and(|p| !p.dead) {
                world.inputs.enqueue(player_id, command);
            }
        }
        GameEvent::Fire {
            player_id,
            dir_x,
            dir_y,
        } => {
            combat::fire_bullet(world, player_id, dir_x, dir_y);
        }
        GameEvent::Start { player_id } => {
            // Only the host can start, and only from idle.
            if world.host != Some(player_id) || world.running {
                return Flow::Continue;
            }
            start_game(world);
            let _ = channels.phase_tx.send(LobbyPhase::Running);
            let _ = channels.event_tx.send(LobbyEvent::GameStarted);
            info!(player_id, "game started");
        }
    }
    Flow::Continue
}

/// Runs one tick behind an unwind boundary. A fault inside the simulation
/// is logged and costs that tick's snapshot; the lobby task keeps going and
/// other lobbies are untouched.
fn run_tick(
    world: &mut LobbyWorld,
    dt: f32,
    rng: &mut StdRng,
    channels: &LobbyChannels,
    code: &Arc<str>,
) {
    match std::panic::catch_unwind(AssertUnwindSafe(|| step(world, dt, rng))) {
        Ok(report) => {
            match report.outcome {
                Some(GameOutcome::Victory) => {
                    info!(lobby = %code, "victory");
                    let _ = channels.event_tx.send(LobbyEvent::Victory);
                    let _ = channels.phase_tx.send(LobbyPhase::Idle);
                }
                Some(GameOutcome::Defeat) => {
                    info!(lobby = %code, "game over");
                    let _ = channels.event_tx.send(LobbyEvent::GameOver);
                    let _ = channels.phase_tx.send(LobbyPhase::Idle);
                }
                None => {}
            }
            let _ = channels.snapshot_tx.send(report.snapshot);
        }
        Err(panic) => {
            error!(
                lobby = %code,
                reason = panic_message(panic.as_ref()),
                "tick panicked; skipping snapshot"
            );
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Begins a fresh game at wave 1.
pub fn start_game(world: &mut LobbyWorld) {
    world.wave = 1;
    world.running = true;
    spawner::setup_wave(world);
}

/// Stops the simulation and restores lobby defaults. Runs inside the tick
/// that detected the outcome, so no later tick can observe pre-reset state.
fn end_game(world: &mut LobbyWorld) {
    world.running = false;
    world.wave = 1;
    world.enemies.clear();
    world.bullets.clear();
    world.enemy_bullets.clear();
    world.enemies_to_spawn = 0;
    world.spawn_timer = SPAWN_INTERVAL_SECS;
    for player in &mut world.players {
        player.reset();
    }
    world.inputs.clear();
}

/// One full simulation tick, in contract order: inputs, spawns, player
/// bullets, wave progression, enemy AI, enemy bullets, defeat check,
/// snapshot. On a game-ending tick the returned snapshot reflects the
/// already-reset lobby.
pub fn step(world: &mut LobbyWorld, dt: f32, rng: &mut impl Rng) -> TickReport {
    movement::apply_inputs(world);
    spawner::tick_spawns(world, dt, rng);
    combat::tick_bullets(world);

    let mut outcome = None;
    if world.enemies.is_empty() && world.enemies_to_spawn == 0 {
        if world.wave < world.max_waves {
            world.wave += 1;
            spawner::setup_wave(world);
        } else {
            outcome = Some(GameOutcome::Victory);
        }
    }

    if outcome.is_none() {
        enemy_ai::tick_enemies(world, dt);
        combat::tick_enemy_bullets(world);
        if !world.players.is_empty() && world.players.iter().all(|p| p.dead) {
            outcome = Some(GameOutcome::Defeat);
        }
    }

    if outcome.is_some() {
        end_game(world);
    }

    TickReport {
        snapshot: snapshot(world),
        outcome,
    }
}

pub fn snapshot(world: &LobbyWorld) -> Snapshot {
    Snapshot {
        players: world.players.iter().map(PlayerSnapshot::from).collect(),
        enemies: world.enemies.iter().map(EnemySnapshot::from).collect(),
        bullets: world.bullets.iter().map(BulletSnapshot::from).collect(),
        enemy_bullets: world
            .enemy_bullets
            .iter()
            .map(EnemyBulletSnapshot::from)
            .collect(),
        wave: world.wave,
        last_processed_input: world
            .players
            .iter()
            .map(|p| p.last_processed_input)
            .min()
            .unwrap_or(0),
    }
}

pub fn roster(world: &LobbyWorld) -> Vec<LobbyMember> {
    world
        .players
        .iter()
        .map(|p| LobbyMember {
            id: p.id,
            index: p.index,
        })
        .collect()
}
