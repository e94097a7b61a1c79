use crate::domain::state::{InputCommand, LobbyWorld, Player};
use crate::domain::tuning::world::{PLAYER_MAX_X, PLAYER_MAX_Y, PLAYER_SPEED};

/// Drains every player's buffered commands and applies them in arrival
/// order. The sequence number of the last applied command is recorded for
/// client reconciliation.
pub fn apply_inputs(world: &mut LobbyWorld) {
    for player in &mut world.players {
        for command in world.inputs.take(player.id) {
            apply_command(player, &command);
            player.last_processed_input = command.sequence;
        }
    }
}

/// Converts movement flags into a unit direction scaled by the per-tick
/// speed, then clamps the result to the arena. Opposing flags cancel out; a
/// zero-length direction moves nothing.
pub fn apply_command(player: &mut Player, command: &InputCommand) {
    let mut move_x = 0.0f32;
    let mut move_y = 0.0f32;
    if command.up {
        move_y -= 1.0;
    }
    if command.down {
        move_y += 1.0;
    }
    if command.left {
        move_x -= 1.0;
    }
    if command.right {
        move_x += 1.0;
    }

    let length = move_x.hypot(move_y);
    if length > 0.0 {
        player.x += move_x / length * PLAYER_SPEED;
        player.y += move_y / length * PLAYER_SPEED;
    }

    player.x = player.x.clamp(0.0, PLAYER_MAX_X);
    player.y = player.y.clamp(0.0, PLAYER_MAX_Y);
}
