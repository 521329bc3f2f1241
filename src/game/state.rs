//! Authoritative race data: players, teams and the session state they live in

use uuid::Uuid;

/// Connection-scoped player identity
pub type ConnectionId = Uuid;

/// Team identifier (1-based, in formation order)
pub type TeamId = u32;

/// Race phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RacePhase {
    /// Accepting joins
    Waiting,
    /// Teams formed, counting down
    Countdown,
    /// Progress loop active
    Racing,
    /// Results computed, nothing moves
    Finished,
}

/// A joined participant
#[derive(Debug, Clone)]
pub struct Player {
    pub id: ConnectionId,
    pub name: String,
    pub team_id: Option<TeamId>,
    pub taps: u32,
}

impl Player {
    pub fn new(id: ConnectionId, name: String) -> Self {
        Self {
            id,
            name,
            team_id: None,
            taps: 0,
        }
    }
}

/// Roster entry inside a team
#[derive(Debug, Clone)]
pub struct TeamMember {
    pub id: ConnectionId,
    pub name: String,
}

/// Team race state (authoritative)
#[derive(Debug, Clone)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub color: &'static str,
    pub emoji: &'static str,
    pub members: Vec<TeamMember>,

    // Track
    pub position: f32,
    pub velocity: f32,

    // Gating
    pub can_race: bool,
    pub finished: bool,
    pub dnf: bool,

    // Timing (race clock ms)
    pub start_time: Option<u64>,
    pub finish_time: Option<u64>,
    pub race_time: Option<u64>,

    pub total_taps: u32,

    // Scripted disruption
    pub disrupted: bool,
    pub disruption_type: Option<String>,
    pub momentum: f32,
    pub momentum_decay: f32,
    pub momentum_ticks: u32,
    pub blocked_ticks: u32,
    /// Indices of disruption rules that already fired for this team
    pub fired_rules: Vec<usize>,
}

impl Team {
    pub fn new(id: TeamId, name: String, color: &'static str, emoji: &'static str) -> Self {
        Self {
            id,
            name,
            color,
            emoji,
            members: Vec::new(),
            position: 0.0,
            velocity: 0.0,
            can_race: false,
            finished: false,
            dnf: false,
            start_time: None,
            finish_time: None,
            race_time: None,
            total_taps: 0,
            disrupted: false,
            disruption_type: None,
            momentum: 0.0,
            momentum_decay: 1.0,
            momentum_ticks: 0,
            blocked_ticks: 0,
            fired_rules: Vec::new(),
        }
    }

    /// Whether a tap from a member would move this team right now
    pub fn accepts_taps(&self) -> bool {
        self.can_race && !self.finished && self.blocked_ticks == 0
    }

    /// Whether the progress loop integrates this team
    pub fn is_moving(&self) -> bool {
        self.can_race && !self.finished
    }
}

/// Final standings
#[derive(Debug, Clone, PartialEq)]
pub struct RaceResults {
    /// Team ids in finishing order
    pub standings: Vec<TeamId>,
    pub winner: Option<TeamId>,
}

/// The whole mutable game: one per session
#[derive(Debug, Clone)]
pub struct GameState {
    pub status: RacePhase,
    pub players: Vec<Player>,
    pub teams: Vec<Team>,
    pub countdown_time: u32,
    pub race_started_at: Option<u64>,
    /// When the progress loop stopped; DNF teams were cut off here
    pub race_ended_at: Option<u64>,
    pub results: Option<RaceResults>,
}

impl GameState {
    pub fn new(countdown_secs: u32) -> Self {
        Self {
            status: RacePhase::Waiting,
            players: Vec::new(),
            teams: Vec::new(),
            countdown_time: countdown_secs,
            race_started_at: None,
            race_ended_at: None,
            results: None,
        }
    }

    pub fn player(&self, id: &ConnectionId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn team_mut(&mut self, id: TeamId) -> Option<&mut Team> {
        self.teams.iter_mut().find(|t| t.id == id)
    }
}
