//! Snapshot building for network transmission

use crate::ws::protocol::{
    GameStateSnapshot, PlayerSnapshot, ResultsSnapshot, ServerMsg, TeamSnapshot, VisiblePhase,
};

use super::session::RaceEvent;
use super::state::{GameState, Player, RacePhase, RaceResults, Team};

impl From<RacePhase> for VisiblePhase {
    fn from(phase: RacePhase) -> Self {
        match phase {
            RacePhase::Waiting => VisiblePhase::Waiting,
            RacePhase::Countdown => VisiblePhase::Countdown,
            RacePhase::Racing => VisiblePhase::Racing,
            RacePhase::Finished => VisiblePhase::Finished,
        }
    }
}

impl From<&Player> for PlayerSnapshot {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            team_id: p.team_id,
            taps: p.taps,
        }
    }
}

impl From<&Team> for TeamSnapshot {
    fn from(t: &Team) -> Self {
        Self {
            id: t.id,
            name: t.name.clone(),
            color: t.color.to_string(),
            emoji: t.emoji.to_string(),
            members: t.members.iter().map(|m| m.name.clone()).collect(),
            position: t.position,
            velocity: t.velocity,
            can_race: t.can_race,
            finished: t.finished,
            dnf: t.dnf,
            start_time: t.start_time,
            finish_time: t.finish_time,
            race_time: t.race_time,
            total_taps: t.total_taps,
            disrupted: t.disrupted,
            disruption_type: t.disruption_type.clone(),
            momentum: t.momentum,
        }
    }
}

impl From<&RaceResults> for ResultsSnapshot {
    fn from(r: &RaceResults) -> Self {
        Self {
            standings: r.standings.clone(),
            winner: r.winner,
        }
    }
}

/// Builds numbered snapshots so observers can discard anything older than
/// what they already rendered
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    seq: u64,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the next snapshot of `state`
    pub fn build(&mut self, state: &GameState) -> GameStateSnapshot {
        self.seq += 1;
        GameStateSnapshot {
            seq: self.seq,
            status: state.status.into(),
            players: state.players.iter().map(PlayerSnapshot::from).collect(),
            teams: state.teams.iter().map(TeamSnapshot::from).collect(),
            countdown_time: state.countdown_time,
            race_started_at: state.race_started_at,
            race_ended_at: state.race_ended_at,
            results: state.results.as_ref().map(ResultsSnapshot::from),
        }
    }

    /// Turn a drained batch of session events into outgoing messages.
    ///
    /// Point events keep their order. Any number of state changes collapse
    /// into one snapshot of the final state, sent where the first change
    /// happened.
    pub fn messages(&mut self, events: Vec<RaceEvent>, state: &GameState) -> Vec<ServerMsg> {
        let mut out = Vec::with_capacity(events.len());
        let mut snapshot_sent = false;
        for event in events {
            match event {
                RaceEvent::GameStarted => out.push(ServerMsg::GameStarted),
                RaceEvent::TeamStarted(team_id) => out.push(ServerMsg::TeamStarted { team_id }),
                RaceEvent::ServiceDisruption { team_id, kind } => {
                    out.push(ServerMsg::ServiceDisruption {
                        team_id,
                        disruption_type: kind,
                    })
                }
                RaceEvent::StateChanged if !snapshot_sent => {
                    snapshot_sent = true;
                    out.push(ServerMsg::GameState(self.build(state)));
                }
                RaceEvent::StateChanged => {}
            }
        }
        out
    }
}
