//! Roster: who is in the game and which team they race for

use tracing::{debug, info};

use super::state::{ConnectionId, GameState, Player, RacePhase};

/// Longest display name kept, in characters
pub const MAX_NAME_CHARS: usize = 24;

/// Trim and truncate a display name; `None` if nothing usable remains
pub fn sanitize_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_NAME_CHARS).collect())
}

/// Add a player while the lobby is open. Returns whether the roster changed.
pub fn join(state: &mut GameState, id: ConnectionId, raw_name: &str) -> bool {
    if state.status != RacePhase::Waiting {
        debug!(connection_id = %id, "join ignored outside lobby");
        return false;
    }
    if state.player(&id).is_some() {
        debug!(connection_id = %id, "connection already joined");
        return false;
    }
    let Some(name) = sanitize_name(raw_name) else {
        debug!(connection_id = %id, "join with empty name ignored");
        return false;
    };

    info!(connection_id = %id, name = %name, players = state.players.len() + 1, "Player joined");
    state.players.push(Player::new(id, name));
    true
}

/// Drop a player from the roster and from their team's member list.
/// Team progress is left untouched. Returns whether anything was removed.
pub fn leave(state: &mut GameState, id: ConnectionId) -> bool {
    let Some(index) = state.players.iter().position(|p| p.id == id) else {
        return false;
    };
    let player = state.players.remove(index);

    if let Some(team_id) = player.team_id {
        if let Some(team) = state.team_mut(team_id) {
            team.members.retain(|m| m.id != id);
        }
    }

    info!(connection_id = %id, name = %player.name, "Player left");
    true
}
