use crate::domain::state::PlayerId;
use crate::interface_adapters::protocol::{
    ClientMessage, LobbyDataDto, ServerMessage, SnapshotDto,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids::next_player_id;
use crate::use_cases::{GameEvent, LobbyError, LobbyEvent, LobbyHandle, LobbyRegistry, Snapshot};

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures_util::sink::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, watch};
use tracing::{Instrument, debug, error, info, info_span, warn};

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;

const ERR_LOBBY_FULL: &str = "Lobby is full.";
const ERR_LOBBY_MISSING: &str = "Lobby does not exist.";
const ERR_ALREADY_IN_LOBBY: &str = "Already in a lobby.";

/// Serializes each snapshot once and fans the shared bytes out to every
/// connection in the lobby, keeping the latest copy for lag recovery.
pub async fn snapshot_serializer(
    mut snapshot_rx: broadcast::Receiver<Snapshot>,
    snapshot_bytes_tx: broadcast::Sender<Utf8Bytes>,
    snapshot_latest_tx: watch::Sender<Utf8Bytes>,
) {
    loop {
        match snapshot_rx.recv().await {
            Ok(snapshot) => {
                let msg = ServerMessage::UpdateState(SnapshotDto::from(snapshot));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize snapshot");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                let _ = snapshot_latest_tx.send(bytes.clone());
                let _ = snapshot_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "snapshot serializer lagged; skipping to latest");
            }
            Err(broadcast::error::RecvError::Closed) => {
                // Lobby task is gone; nothing left to serialize.
                break;
            }
        }
    }
}

pub fn spawn_lobby_serializer(lobby: &LobbyHandle) {
    tokio::spawn(snapshot_serializer(
        lobby.snapshot_tx.subscribe(),
        lobby.snapshot_bytes_tx.clone(),
        lobby.snapshot_latest_tx.clone(),
    ));
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let registry = state.lobby_registry.clone();
    ws.on_upgrade(move |socket| {
        // One id per connection; it doubles as the player identity.
        let player_id = next_player_id();
        handle_socket(socket, registry, player_id).instrument(info_span!("conn", player_id))
    })
}

struct Session {
    player_id: PlayerId,
    registry: Arc<LobbyRegistry>,
    invalid_json: u32,
    last_invalid_log: Instant,
    last_input_full_log: Instant,
    last_lag_log: Instant,
}

/// Receivers for one lobby's outbound streams. Taken before the join
/// request goes out, so the roster update triggered by our own join is not
/// missed.
struct LobbySubscriptions {
    snapshot_rx: broadcast::Receiver<Utf8Bytes>,
    latest_rx: watch::Receiver<Utf8Bytes>,
    event_rx: broadcast::Receiver<LobbyEvent>,
}

impl LobbySubscriptions {
    fn subscribe(lobby: &LobbyHandle) -> Self {
        Self {
            snapshot_rx: lobby.snapshot_bytes_tx.subscribe(),
            latest_rx: lobby.snapshot_latest_tx.subscribe(),
            event_rx: lobby.event_tx.subscribe(),
        }
    }
}

/// How an attached lobby session ended.
enum LobbyExit {
    /// The client left the lobby but kept the socket; it may create or
    /// join another one.
    Detached,
    Disconnected,
}

async fn handle_socket(mut socket: WebSocket, registry: Arc<LobbyRegistry>, player_id: PlayerId) {
    info!("client connected");

    let throttle_start = Instant::now() - LOG_THROTTLE;
    let mut session = Session {
        player_id,
        registry,
        invalid_json: 0,
        last_invalid_log: throttle_start,
        last_input_full_log: throttle_start,
        last_lag_log: throttle_start,
    };

    loop {
        // Outside a lobby the socket only negotiates create/join.
        let Some((lobby, subscriptions)) = select_lobby(&mut socket, &mut session).await else {
            break;
        };

        match run_lobby_session(&mut socket, &mut session, lobby, subscriptions).await {
            LobbyExit::Detached => continue,
            LobbyExit::Disconnected => break,
        }
    }

    info!("client disconnected");
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), axum::Error> {
    let txt = serde_json::to_string(msg).map_err(axum::Error::new)?;
    socket.send(Message::Text(txt.into())).await
}

async fn close_with_reason(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
    let _ = socket.close().await;
}

/// Counts a malformed message against the connection. Returns true once the
/// client has burned through its allowance and should be dropped.
fn register_invalid_json(session: &mut Session, raw_len: usize, error: &serde_json::Error) -> bool {
    session.invalid_json += 1;
    if should_log(&mut session.last_invalid_log) {
        warn!(bytes = raw_len, %error, "failed to parse client message");
    }
    session.invalid_json > MAX_INVALID_JSON
}

/// Pre-lobby phase: waits for a createLobby/joinLobby that sticks. Returns
/// None when the socket closes instead.
async fn select_lobby(
    socket: &mut WebSocket,
    session: &mut Session,
) -> Option<(LobbyHandle, LobbySubscriptions)> {
    loop {
        let incoming = socket.recv().await?;
        let message = match incoming {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "websocket recv error");
                return None;
            }
        };

        let text = match message {
            Message::Text(text) => text,
            Message::Binary(_) => {
                close_with_reason(socket, close_code::UNSUPPORTED, "binary not supported").await;
                return None;
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Close(_) => return None,
        };

        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::CreateLobby) => {
                let lobby = session.registry.create_lobby().await;
                spawn_lobby_serializer(&lobby);
                let subscriptions = LobbySubscriptions::subscribe(&lobby);
                // The creator always fits in a brand-new lobby.
                if let Err(e) = lobby.request_join(session.player_id).await {
                    error!(error = ?e, lobby = %lobby.code, "failed to join freshly created lobby");
                    // Never leave an unjoinable lobby behind in the directory.
                    lobby.shutdown.notify_one();
                    return None;
                }
                let ack = ServerMessage::LobbyCreated {
                    code: lobby.code.to_string(),
                    player_id: session.player_id.to_string(),
                };
                if send_message(socket, &ack).await.is_err() {
                    let _ = lobby
                        .events_tx
                        .send(GameEvent::Leave {
                            player_id: session.player_id,
                        })
                        .await;
                    return None;
                }
                return Some((lobby, subscriptions));
            }
            Ok(ClientMessage::JoinLobby { code }) => {
                let code = code.trim().to_uppercase();
                let Some(lobby) = session.registry.get_lobby(&code).await else {
                    if send_error(socket, ERR_LOBBY_MISSING).await.is_err() {
                        return None;
                    }
                    continue;
                };

                let subscriptions = LobbySubscriptions::subscribe(&lobby);
                match lobby.request_join(session.player_id).await {
                    Ok(()) => {
                        let ack = ServerMessage::LobbyJoined {
                            code: lobby.code.to_string(),
                            player_id: session.player_id.to_string(),
                        };
                        if send_message(socket, &ack).await.is_err() {
                            let _ = lobby
                                .events_tx
                                .send(GameEvent::Leave {
                                    player_id: session.player_id,
                                })
                                .await;
                            return None;
                        }
                        return Some((lobby, subscriptions));
                    }
                    Err(LobbyError::Full) => {
                        if send_error(socket, ERR_LOBBY_FULL).await.is_err() {
                            return None;
                        }
                    }
                    Err(LobbyError::NotFound) => {
                        // Lobby died between lookup and join.
                        if send_error(socket, ERR_LOBBY_MISSING).await.is_err() {
                            return None;
                        }
                    }
                }
            }
            Ok(other) => {
                // Game messages make no sense before entering a lobby.
                if should_log(&mut session.last_invalid_log) {
                    debug!(message = ?other, "game message before joining a lobby; ignored");
                }
            }
            Err(parse_err) => {
                if register_invalid_json(session, text.len(), &parse_err) {
                    close_with_reason(socket, close_code::POLICY, "too many invalid messages")
                        .await;
                    return None;
                }
            }
        }
    }
}

async fn send_error(socket: &mut WebSocket, message: &str) -> Result<(), axum::Error> {
    send_message(
        socket,
        &ServerMessage::Error {
            message: message.to_string(),
        },
    )
    .await
}

/// In-lobby phase: pumps client input into the lobby task and forwards
/// snapshots and lifecycle events back out.
async fn run_lobby_session(
    socket: &mut WebSocket,
    session: &mut Session,
    lobby: LobbyHandle,
    subscriptions: LobbySubscriptions,
) -> LobbyExit {
    let LobbySubscriptions {
        mut snapshot_rx,
        latest_rx,
        mut event_rx,
    } = subscriptions;

    info!(lobby = %lobby.code, "entered lobby");

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming(socket, session, &lobby, incoming).await {
                    Some(exit) => return exit,
                    None => {}
                }
            }

            snapshot = snapshot_rx.recv() => {
                match snapshot {
                    Ok(bytes) => {
                        if socket.send(Message::Text(bytes)).await.is_err() {
                            send_leave(&lobby, session.player_id).await;
                            return LobbyExit::Disconnected;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut session.last_lag_log) {
                            warn!(missed = n, "snapshot stream lagged; sending latest");
                        }
                        let latest = latest_rx.borrow().clone();
                        if !latest.is_empty()
                            && socket.send(Message::Text(latest)).await.is_err()
                        {
                            send_leave(&lobby, session.player_id).await;
                            return LobbyExit::Disconnected;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // Lobby task ended underneath us.
                        return LobbyExit::Detached;
                    }
                }
            }

            event = event_rx.recv() => {
                match event {
                    Ok(event) => {
                        let msg = lobby_event_message(event);
                        if send_message(socket, &msg).await.is_err() {
                            send_leave(&lobby, session.player_id).await;
                            return LobbyExit::Disconnected;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "lobby event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return LobbyExit::Detached;
                    }
                }
            }
        }
    }
}

fn lobby_event_message(event: LobbyEvent) -> ServerMessage {
    match event {
        LobbyEvent::MembershipChanged { players } => {
            ServerMessage::LobbyData(LobbyDataDto::from(players.as_slice()))
        }
        LobbyEvent::GameStarted => ServerMessage::GameStarted,
        LobbyEvent::Victory => ServerMessage::Victory,
        LobbyEvent::GameOver => ServerMessage::GameOver,
    }
}

/// Handles one inbound frame while attached. Returns Some(exit) when the
/// session phase should end.
async fn handle_incoming(
    socket: &mut WebSocket,
    session: &mut Session,
    lobby: &LobbyHandle,
    incoming: Option<Result<Message, axum::Error>>,
) -> Option<LobbyExit> {
    let message = match incoming {
        Some(Ok(message)) => message,
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            send_leave(lobby, session.player_id).await;
            return Some(LobbyExit::Disconnected);
        }
        None => {
            send_leave(lobby, session.player_id).await;
            return Some(LobbyExit::Disconnected);
        }
    };

    let text = match message {
        Message::Text(text) => text,
        Message::Binary(_) => {
            close_with_reason(socket, close_code::UNSUPPORTED, "binary not supported").await;
            send_leave(lobby, session.player_id).await;
            return Some(LobbyExit::Disconnected);
        }
        Message::Ping(_) | Message::Pong(_) => return None,
        Message::Close(_) => {
            send_leave(lobby, session.player_id).await;
            return Some(LobbyExit::Disconnected);
        }
    };

    match serde_json::from_str::<ClientMessage>(&text) {
        Ok(ClientMessage::PlayerMovement(input)) => {
            forward_event(
                session,
                lobby,
                GameEvent::Input {
                    player_id: session.player_id,
                    command: input.into(),
                },
            );
            None
        }
        Ok(ClientMessage::Shoot { direction }) => {
            // NaN/infinite directions would poison the simulation; drop them
            // the same way the sim drops zero vectors.
            if !direction.x.is_finite() || !direction.y.is_finite() {
                if should_log(&mut session.last_invalid_log) {
                    warn!("non-finite shoot direction; dropping");
                }
                return None;
            }
            forward_event(
                session,
                lobby,
                GameEvent::Fire {
                    player_id: session.player_id,
                    dir_x: direction.x,
                    dir_y: direction.y,
                },
            );
            None
        }
        Ok(ClientMessage::StartGame) => {
            forward_event(
                session,
                lobby,
                GameEvent::Start {
                    player_id: session.player_id,
                },
            );
            None
        }
        Ok(ClientMessage::LeaveLobby) => {
            send_leave(lobby, session.player_id).await;
            info!(lobby = %lobby.code, "left lobby");
            Some(LobbyExit::Detached)
        }
        Ok(ClientMessage::CreateLobby) | Ok(ClientMessage::JoinLobby { .. }) => {
            let _ = send_error(socket, ERR_ALREADY_IN_LOBBY).await;
            None
        }
        Err(parse_err) => {
            if register_invalid_json(session, text.len(), &parse_err) {
                close_with_reason(socket, close_code::POLICY, "too many invalid messages").await;
                send_leave(lobby, session.player_id).await;
                return Some(LobbyExit::Disconnected);
            }
            None
        }
    }
}

/// Never blocks the socket on a busy lobby: full channels drop the event
/// with a throttled warning.
fn forward_event(session: &mut Session, lobby: &LobbyHandle, event: GameEvent) {
    match lobby.events_tx.try_send(event) {
        Ok(()) => {}
        Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
            if should_log(&mut session.last_input_full_log) {
                warn!(lobby = %lobby.code, "lobby event channel full; dropping");
            }
        }
        Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
            debug!(lobby = %lobby.code, "lobby event channel closed");
        }
    }
}

async fn send_leave(lobby: &LobbyHandle, player_id: PlayerId) {
    let _ = lobby.events_tx.send(GameEvent::Leave { player_id }).await;
}
