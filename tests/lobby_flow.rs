// Directory and lobby-task lifecycle flows, driven through the use-case
// layer without sockets.

use horde_server::use_cases::{
    GameEvent, LobbyError, LobbyEvent, LobbyPhase, LobbyRegistry, LobbySettings,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn registry() -> Arc<LobbyRegistry> {
    Arc::new(LobbyRegistry::new(LobbySettings {
        input_channel_capacity: 64,
        snapshot_broadcast_capacity: 64,
        event_broadcast_capacity: 64,
        // Fast ticks keep these tests snappy.
        tick_interval: Duration::from_millis(2),
    }))
}

async fn recv_event(rx: &mut broadcast::Receiver<LobbyEvent>) -> LobbyEvent {
    timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for lobby event")
        .expect("event channel closed")
}

#[tokio::test]
async fn capacity_is_enforced_at_four_players() {
    let registry = registry();
    let lobby = registry.create_lobby().await;

    for player_id in 1..=4 {
        lobby.request_join(player_id).await.expect("join");
    }
    assert_eq!(lobby.request_join(5).await, Err(LobbyError::Full));
}

#[tokio::test]
async fn joining_an_unknown_code_fails() {
    let registry = registry();
    assert!(matches!(
        registry.join_lobby("ZZZZZ", 1).await,
        Err(LobbyError::NotFound)
    ));
}

#[tokio::test]
async fn join_by_code_routes_to_the_same_lobby() {
    let registry = registry();
    let lobby = registry.create_lobby().await;
    lobby.request_join(1).await.expect("creator joins");

    let mut events = lobby.event_tx.subscribe();
    let joined = registry
        .join_lobby(lobby.code.as_ref(), 2)
        .await
        .expect("join by code");
    assert_eq!(joined.code, lobby.code);

    match recv_event(&mut events).await {
        LobbyEvent::MembershipChanged { players } => {
            assert_eq!(players.len(), 2);
            assert_eq!(players[0].id, 1);
            assert_eq!(players[0].index, 1);
            assert_eq!(players[1].id, 2);
            assert_eq!(players[1].index, 2);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn host_leaving_hands_the_lobby_to_the_next_player() {
    let registry = registry();
    let lobby = registry.create_lobby().await;
    lobby.request_join(1).await.expect("host joins");
    lobby.request_join(2).await.expect("guest joins");
    let mut events = lobby.event_tx.subscribe();

    lobby
        .events_tx
        .send(GameEvent::Leave { player_id: 1 })
        .await
        .expect("leave");

    match recv_event(&mut events).await {
        LobbyEvent::MembershipChanged { players } => {
            assert_eq!(players.len(), 1);
            assert_eq!(players[0].id, 2);
            assert_eq!(players[0].index, 1);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // The survivor inherited the host slot: their start request works.
    lobby
        .events_tx
        .send(GameEvent::Start { player_id: 2 })
        .await
        .expect("start");
    assert!(matches!(
        recv_event(&mut events).await,
        LobbyEvent::GameStarted
    ));
}

#[tokio::test]
async fn last_player_leaving_destroys_the_lobby() {
    let registry = registry();
    let lobby = registry.create_lobby().await;
    lobby.request_join(1).await.expect("join");
    let code = lobby.code.to_string();
    assert!(registry.get_lobby(&code).await.is_some());

    let mut phase_rx = lobby.phase_tx.subscribe();
    lobby
        .events_tx
        .send(GameEvent::Leave { player_id: 1 })
        .await
        .expect("leave");

    // The world task announces its own shutdown...
    timeout(RECV_TIMEOUT, async {
        loop {
            if *phase_rx.borrow_and_update() == LobbyPhase::Closed {
                break;
            }
            phase_rx.changed().await.expect("phase channel");
        }
    })
    .await
    .expect("lobby never closed");

    // ...and the directory entry disappears shortly after.
    timeout(RECV_TIMEOUT, async {
        while registry.get_lobby(&code).await.is_some() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("lobby never removed from the directory");
}

#[tokio::test]
async fn started_game_emits_snapshots_and_acknowledges_inputs() {
    let registry = registry();
    let lobby = registry.create_lobby().await;
    lobby.request_join(1).await.expect("join");

    let mut events = lobby.event_tx.subscribe();
    let mut snapshots = lobby.snapshot_tx.subscribe();

    lobby
        .events_tx
        .send(GameEvent::Start { player_id: 1 })
        .await
        .expect("start");
    assert!(matches!(
        recv_event(&mut events).await,
        LobbyEvent::GameStarted
    ));

    let snapshot = timeout(RECV_TIMEOUT, snapshots.recv())
        .await
        .expect("timed out waiting for a snapshot")
        .expect("snapshot channel closed");
    assert_eq!(snapshot.wave, 1);
    assert_eq!(snapshot.players.len(), 1);
    assert_eq!(snapshot.players[0].hp, 100.0);

    lobby
        .events_tx
        .send(GameEvent::Input {
            player_id: 1,
            command: horde_server::domain::InputCommand {
                sequence: 1,
                up: false,
                down: false,
                left: false,
                right: true,
            },
        })
        .await
        .expect("input");

    let moved = timeout(RECV_TIMEOUT, async {
        loop {
            match snapshots.recv().await {
                Ok(snapshot) if snapshot.last_processed_input == 1 => break snapshot,
                Ok(_) => {}
                // Falling behind the tick rate is fine; keep polling.
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("snapshot channel closed"),
            }
        }
    })
    .await
    .expect("input never acknowledged");
    assert_eq!(moved.players[0].x, 405.0);
    assert_eq!(moved.players[0].last_processed_input, 1);
}

#[tokio::test]
async fn non_host_start_requests_are_ignored() {
    let registry = registry();
    let lobby = registry.create_lobby().await;
    lobby.request_join(1).await.expect("host joins");
    lobby.request_join(2).await.expect("guest joins");
    let mut events = lobby.event_tx.subscribe();

    lobby
        .events_tx
        .send(GameEvent::Start { player_id: 2 })
        .await
        .expect("send");
    // Follow with a host start; the first event to arrive must be the
    // host's GameStarted, proving the guest's request did nothing.
    lobby
        .events_tx
        .send(GameEvent::Start { player_id: 1 })
        .await
        .expect("send");

    assert!(matches!(
        recv_event(&mut events).await,
        LobbyEvent::GameStarted
    ));
    // Idempotence: starting an already-running game emits nothing more.
    lobby
        .events_tx
        .send(GameEvent::Start { player_id: 1 })
        .await
        .expect("send");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(matches!(
        events.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}
