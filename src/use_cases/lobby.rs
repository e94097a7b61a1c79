// Lobby directory: creates, looks up, and retires per-lobby world tasks.

use crate::domain::state::PlayerId;
use crate::use_cases::game::{LobbyChannels, lobby_task};
use crate::use_cases::types::{GameEvent, JoinError, LobbyEvent, LobbyPhase, Snapshot};
use axum::extract::ws::Utf8Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock, broadcast, mpsc, oneshot, watch};
use tracing::info;

/// Shared configuration for spawning lobby worlds.
#[derive(Debug, Clone)]
pub struct LobbySettings {
    /// Capacity for inbound lobby events.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast snapshots.
    pub snapshot_broadcast_capacity: usize,
    /// Capacity for broadcast lifecycle events.
    pub event_broadcast_capacity: usize,
    /// Fixed tick interval for the game loop.
    pub tick_interval: Duration,
}

/// Errors returned by lobby registry operations.
#[derive(Debug, PartialEq, Eq)]
pub enum LobbyError {
    /// No lobby is registered under the given code.
    NotFound,
    /// The lobby already holds the maximum number of players.
    Full,
}

/// Per-lobby channels handed to connections.
#[derive(Clone)]
pub struct LobbyHandle {
    /// Code clients use to target this lobby.
    pub code: Arc<str>,
    /// Sender for game events into the lobby world task.
    pub events_tx: mpsc::Sender<GameEvent>,
    /// Broadcast sender for raw snapshots.
    pub snapshot_tx: broadcast::Sender<Snapshot>,
    /// Broadcast sender for serialized snapshots.
    pub snapshot_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Watch sender holding the latest serialized snapshot, for lag recovery.
    pub snapshot_latest_tx: watch::Sender<Utf8Bytes>,
    /// Broadcast sender for membership/lifecycle events.
    pub event_tx: broadcast::Sender<LobbyEvent>,
    /// Watch sender for the coarse lobby phase.
    pub phase_tx: watch::Sender<LobbyPhase>,
    /// Stops the world task without waiting for its channel to drain.
    pub shutdown: Arc<Notify>,
}

impl LobbyHandle {
    /// Asks the lobby task to admit a player. The task owns the capacity
    /// check, so concurrent joins cannot oversubscribe a lobby.
    pub async fn request_join(&self, player_id: PlayerId) -> Result<(), LobbyError> {
        let (respond_to, reply_rx) = oneshot::channel();
        self.events_tx
            .send(GameEvent::Join {
                player_id,
                respond_to,
            })
            .await
            .map_err(|_| LobbyError::NotFound)?;

        match reply_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(JoinError::Full)) => Err(LobbyError::Full),
            // Task went away between lookup and reply.
            Err(_) => Err(LobbyError::NotFound),
        }
    }
}

/// Thread-safe directory of active lobbies. Owns lobby lifecycle: codes are
/// generated here, world tasks are spawned here, and a watcher retires the
/// map entry once a lobby's task reports itself closed.
pub struct LobbyRegistry {
    settings: LobbySettings,
    lobbies: RwLock<HashMap<String, LobbyHandle>>,
}

const CODE_LEN: usize = 5;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn generate_code() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

impl LobbyRegistry {
    pub fn new(settings: LobbySettings) -> Self {
        Self {
            settings,
            lobbies: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a lobby under a freshly generated code and spawns its world
    /// task. The caller is expected to join a player promptly; a lobby only
    /// closes once its last member leaves.
    pub async fn create_lobby(self: &Arc<Self>) -> LobbyHandle {
        let mut lobbies = self.lobbies.write().await;
        let code = loop {
            let candidate = generate_code();
            if !lobbies.contains_key(&candidate) {
                break candidate;
            }
        };

        // Channel wiring for the lobby world loop.
        let (events_tx, events_rx) =
            mpsc::channel::<GameEvent>(self.settings.input_channel_capacity);
        let (snapshot_tx, _) =
            broadcast::channel::<Snapshot>(self.settings.snapshot_broadcast_capacity);
        let (snapshot_bytes_tx, _) =
            broadcast::channel::<Utf8Bytes>(self.settings.snapshot_broadcast_capacity);
        let (snapshot_latest_tx, _) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
        let (event_tx, _) = broadcast::channel::<LobbyEvent>(self.settings.event_broadcast_capacity);
        let (phase_tx, phase_rx) = watch::channel(LobbyPhase::Idle);
        let shutdown = Arc::new(Notify::new());

        let handle = LobbyHandle {
            code: Arc::from(code.as_str()),
            events_tx,
            snapshot_tx: snapshot_tx.clone(),
            snapshot_bytes_tx,
            snapshot_latest_tx,
            event_tx: event_tx.clone(),
            phase_tx: phase_tx.clone(),
            shutdown: shutdown.clone(),
        };

        // Spawn the authoritative world loop for this lobby.
        tokio::spawn(lobby_task(
            handle.code.clone(),
            events_rx,
            LobbyChannels {
                snapshot_tx,
                event_tx,
                phase_tx,
            },
            shutdown,
            self.settings.tick_interval,
        ));
        self.clone().spawn_close_watcher(handle.code.clone(), phase_rx);

        info!(lobby = %handle.code, "lobby created");
        lobbies.insert(code, handle.clone());
        handle
    }

    /// Returns the handle for a code, if the lobby is still alive.
    pub async fn get_lobby(&self, code: &str) -> Option<LobbyHandle> {
        let lobbies = self.lobbies.read().await;
        lobbies.get(code).cloned()
    }

    /// Routes a join through the lobby task, which owns the capacity check.
    pub async fn join_lobby(
        &self,
        code: &str,
        player_id: PlayerId,
    ) -> Result<LobbyHandle, LobbyError> {
        let lobby = self.get_lobby(code).await.ok_or(LobbyError::NotFound)?;
        lobby.request_join(player_id).await?;
        Ok(lobby)
    }

    /// Watches a lobby's phase and drops the map entry once the world task
    /// reports itself closed, keeping the directory free of dead codes.
    fn spawn_close_watcher(self: Arc<Self>, code: Arc<str>, mut phase_rx: watch::Receiver<LobbyPhase>) {
        tokio::spawn(async move {
            loop {
                if *phase_rx.borrow_and_update() == LobbyPhase::Closed {
                    break;
                }
                if phase_rx.changed().await.is_err() {
                    break;
                }
            }
            let mut lobbies = self.lobbies.write().await;
            if lobbies.remove(code.as_ref()).is_some() {
                info!(lobby = %code, "lobby removed from directory");
            }
        });
    }

    /// Number of currently registered lobbies.
    pub async fn len(&self) -> usize {
        self.lobbies.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.lobbies.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_have_the_expected_shape() {
        for _ in 0..32 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(
                code.bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
            );
        }
    }
}
