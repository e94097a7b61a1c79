// Wire protocol DTOs and conversions for public game server messages.
// Domain types never cross the socket directly.

use crate::domain::state::{
    BulletSnapshot, EnemyBulletSnapshot, EnemySnapshot, InputCommand, PlayerSnapshot,
};
use crate::domain::tuning::enemies::{EnemyBehavior, EnemyColor};
use crate::use_cases::types::{LobbyMember, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    // Acks for lobby creation/joining, carrying the shareable code and the
    // id under which this connection appears in snapshots.
    #[serde(rename_all = "camelCase")]
    LobbyCreated { code: String, player_id: String },
    #[serde(rename_all = "camelCase")]
    LobbyJoined { code: String, player_id: String },
    // Current roster with stable 1-based slots.
    LobbyData(LobbyDataDto),
    GameStarted,
    // Authoritative snapshot for one tick.
    UpdateState(SnapshotDto),
    Victory,
    GameOver,
    Error { message: String },
}

/// Messages clients send to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    CreateLobby,
    JoinLobby { code: String },
    PlayerMovement(PlayerInputDto),
    Shoot { direction: DirectionDto },
    StartGame,
    LeaveLobby,
}

/// One buffered movement command: held keys plus the client's sequence
/// number for reconciliation.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PlayerInputDto {
    pub movement: MovementFlagsDto,
    pub seq: u64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MovementFlagsDto {
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DirectionDto {
    pub x: f32,
    pub y: f32,
}

impl From<PlayerInputDto> for InputCommand {
    fn from(input: PlayerInputDto) -> Self {
        Self {
            sequence: input.seq,
            up: input.movement.up,
            down: input.movement.down,
            left: input.movement.left,
            right: input.movement.right,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LobbyDataDto {
    pub players: Vec<LobbyMemberDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LobbyMemberDto {
    pub id: String,
    pub index: u32,
}

impl From<&[LobbyMember]> for LobbyDataDto {
    fn from(members: &[LobbyMember]) -> Self {
        Self {
            players: members
                .iter()
                .map(|m| LobbyMemberDto {
                    id: m.id.to_string(),
                    index: m.index,
                })
                .collect(),
        }
    }
}

/// Snapshot of the lobby sent to clients on each tick.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDto {
    pub players: HashMap<String, PlayerStateDto>,
    pub enemies: Vec<EnemyStateDto>,
    pub bullets: Vec<BulletStateDto>,
    pub enemy_bullets: Vec<BulletStateDto>,
    pub wave: u32,
    pub last_processed_input: u64,
}

impl From<Snapshot> for SnapshotDto {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            players: snapshot
                .players
                .iter()
                .map(|p| (p.id.to_string(), PlayerStateDto::from(p)))
                .collect(),
            enemies: snapshot.enemies.iter().map(EnemyStateDto::from).collect(),
            bullets: snapshot.bullets.iter().map(BulletStateDto::from).collect(),
            enemy_bullets: snapshot
                .enemy_bullets
                .iter()
                .map(BulletStateDto::from)
                .collect(),
            wave: snapshot.wave,
            last_processed_input: snapshot.last_processed_input,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStateDto {
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    pub index: u32,
    pub direction: DirectionDto,
    pub dead: bool,
    pub last_processed_input: u64,
}

impl From<&PlayerSnapshot> for PlayerStateDto {
    fn from(player: &PlayerSnapshot) -> Self {
        Self {
            x: player.x,
            y: player.y,
            hp: player.hp,
            index: player.index,
            direction: DirectionDto {
                x: player.dir_x,
                y: player.dir_y,
            },
            dead: player.dead,
            last_processed_input: player.last_processed_input,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnemyStateDto {
    pub x: f32,
    pub y: f32,
    pub color: EnemyColor,
    pub behavior: EnemyBehavior,
    pub hp: f32,
}

impl From<&EnemySnapshot> for EnemyStateDto {
    fn from(enemy: &EnemySnapshot) -> Self {
        Self {
            x: enemy.x,
            y: enemy.y,
            color: enemy.color,
            behavior: enemy.behavior,
            hp: enemy.hp,
        }
    }
}

/// Shared by player and enemy bullets: position plus per-tick velocity so
/// clients can interpolate between snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct BulletStateDto {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}

impl From<&BulletSnapshot> for BulletStateDto {
    fn from(bullet: &BulletSnapshot) -> Self {
        Self {
            x: bullet.x,
            y: bullet.y,
            dx: bullet.vx,
            dy: bullet.vy,
        }
    }
}

impl From<&EnemyBulletSnapshot> for BulletStateDto {
    fn from(bullet: &EnemyBulletSnapshot) -> Self {
        Self {
            x: bullet.x,
            y: bullet.y,
            dx: bullet.vx,
            dy: bullet.vy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_the_original_event_names() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"createLobby"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::CreateLobby));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"joinLobby","data":{"code":"AB12C"}}"#).unwrap();
        assert!(matches!(msg, ClientMessage::JoinLobby { code } if code == "AB12C"));

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"playerMovement","data":{"movement":{"up":true,"right":true},"seq":17}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::PlayerMovement(input) => {
                assert!(input.movement.up && input.movement.right);
                assert!(!input.movement.down && !input.movement.left);
                assert_eq!(input.seq, 17);
            }
            other => panic!("unexpected message: {other:?}"),
        }

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"shoot","data":{"direction":{"x":1.0,"y":-0.5}}}"#)
                .unwrap();
        assert!(matches!(msg, ClientMessage::Shoot { .. }));
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"warp"}"#).is_err());
        assert!(
            serde_json::from_str::<ClientMessage>(
                r#"{"type":"playerMovement","data":{"movement":{},"seq":"not-a-number"}}"#
            )
            .is_err()
        );
    }

    #[test]
    fn server_messages_serialize_with_camel_case_tags() {
        let value = serde_json::to_value(ServerMessage::LobbyCreated {
            code: "XY9Z0".into(),
            player_id: "7".into(),
        })
        .unwrap();
        assert_eq!(value["type"], "lobbyCreated");
        assert_eq!(value["data"]["code"], "XY9Z0");
        assert_eq!(value["data"]["playerId"], "7");

        let value = serde_json::to_value(ServerMessage::GameStarted).unwrap();
        assert_eq!(value["type"], "gameStarted");
    }

    #[test]
    fn snapshot_dto_keys_players_by_id_and_uses_camel_case() {
        let snapshot = Snapshot {
            players: vec![PlayerSnapshot {
                id: 42,
                x: 400.0,
                y: 300.0,
                hp: 100.0,
                index: 1,
                dir_x: 0.0,
                dir_y: -1.0,
                dead: false,
                last_processed_input: 9,
            }],
            enemies: vec![EnemySnapshot {
                color: EnemyColor::Purple,
                behavior: EnemyBehavior::Tank,
                x: 1.0,
                y: 2.0,
                hp: 120.0,
            }],
            bullets: vec![],
            enemy_bullets: vec![],
            wave: 3,
            last_processed_input: 9,
        };

        let value =
            serde_json::to_value(ServerMessage::UpdateState(SnapshotDto::from(snapshot))).unwrap();
        assert_eq!(value["type"], "updateState");
        let data = &value["data"];
        assert_eq!(data["players"]["42"]["lastProcessedInput"], 9);
        assert_eq!(data["players"]["42"]["direction"]["y"], -1.0);
        assert_eq!(data["enemies"][0]["color"], "purple");
        assert_eq!(data["enemies"][0]["behavior"], "tank");
        assert_eq!(data["wave"], 3);
        assert!(data["enemyBullets"].as_array().unwrap().is_empty());
        assert_eq!(data["lastProcessedInput"], 9);
    }
}
