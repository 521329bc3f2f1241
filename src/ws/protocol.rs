//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Enter the lobby under a display name
    JoinGame {
        name: String,
    },

    /// Operator: form teams and begin the countdown
    StartGame,

    /// One tap from a phone
    Tap,

    /// Operator: discard everything and reopen the lobby
    ResetGame,

    /// Operator: end the running race now
    SkipToFinish,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        connection_id: Uuid,
        server_time: DateTime<Utc>,
    },

    /// Full authoritative state
    GameState(GameStateSnapshot),

    /// Teams were formed and the countdown started
    GameStarted,

    /// A team's gate opened; its taps count from now on
    TeamStarted {
        team_id: u32,
    },

    /// A scripted disruption hit a team
    ServiceDisruption {
        team_id: u32,
        disruption_type: String,
    },
}

/// Race phase as seen by clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisiblePhase {
    Waiting,
    Countdown,
    Racing,
    Finished,
}

/// Full game state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStateSnapshot {
    /// Increases with every snapshot the server publishes
    pub seq: u64,
    pub status: VisiblePhase,
    pub players: Vec<PlayerSnapshot>,
    pub teams: Vec<TeamSnapshot>,
    pub countdown_time: u32,
    pub race_started_at: Option<u64>,
    pub race_ended_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ResultsSnapshot>,
}

/// Player state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: Uuid,
    pub name: String,
    pub team_id: Option<u32>,
    pub taps: u32,
}

/// Team state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSnapshot {
    pub id: u32,
    pub name: String,
    pub color: String,
    pub emoji: String,
    pub members: Vec<String>,
    /// Percentage of the track covered (0-100)
    pub position: f32,
    pub velocity: f32,
    pub can_race: bool,
    pub finished: bool,
    pub dnf: bool,
    pub start_time: Option<u64>,
    pub finish_time: Option<u64>,
    /// Milliseconds from gate opening to the finish line
    pub race_time: Option<u64>,
    pub total_taps: u32,
    pub disrupted: bool,
    pub disruption_type: Option<String>,
    pub momentum: f32,
}

/// Final standings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsSnapshot {
    pub standings: Vec<u32>,
    pub winner: Option<u32>,
}
