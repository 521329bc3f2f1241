//! Race session: the owned, explicitly-lifecycled game
//!
//! All mutation goes through the methods below. Time is passed in as race
//! clock milliseconds, so the session itself never sleeps or reads a clock.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::config::{RaceConfig, RaceEndPolicy};

use super::disruption;
use super::progress::ProgressSystem;
use super::results;
use super::roster;
use super::schedule::{ScheduledTask, Scheduler, TaskKind};
use super::state::{ConnectionId, GameState, RacePhase, TeamId};
use super::teams::form_teams;

const COUNTDOWN_STEP_MS: u64 = 1_000;

/// Something observers should hear about, in the order it happened
#[derive(Debug, Clone, PartialEq)]
pub enum RaceEvent {
    /// Teams are formed and the countdown began
    GameStarted,
    /// A team's gate opened
    TeamStarted(TeamId),
    /// A scripted disruption hit a team
    ServiceDisruption { team_id: TeamId, kind: String },
    /// State changed; a full snapshot is due
    StateChanged,
}

pub struct RaceSession {
    config: RaceConfig,
    state: GameState,
    scheduler: Scheduler,
    /// Bumped on every reset; timers from older generations are ignored
    generation: u64,
    seed: u64,
    rng: ChaCha8Rng,
    tick: u64,
    events: Vec<RaceEvent>,
}

impl RaceSession {
    pub fn new(config: RaceConfig, seed: u64) -> Self {
        let state = GameState::new(config.countdown_secs);
        Self {
            config,
            state,
            scheduler: Scheduler::new(),
            generation: 0,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> RacePhase {
        self.state.status
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Earliest pending timer, if any
    pub fn next_due(&self) -> Option<u64> {
        self.scheduler.next_due()
    }

    /// Take everything that happened since the last drain
    pub fn drain_events(&mut self) -> Vec<RaceEvent> {
        std::mem::take(&mut self.events)
    }

    fn changed(&mut self) {
        self.events.push(RaceEvent::StateChanged);
    }

    fn schedule(&mut self, due_ms: u64, kind: TaskKind) {
        let task = ScheduledTask {
            generation: self.generation,
            kind,
        };
        self.scheduler.schedule_at(due_ms, task);
    }

    // ------------------------------------------------------------------
    // Roster
    // ------------------------------------------------------------------

    pub fn join(&mut self, id: ConnectionId, name: &str) -> bool {
        let joined = roster::join(&mut self.state, id, name);
        if joined {
            self.changed();
        }
        joined
    }

    pub fn leave(&mut self, id: ConnectionId) -> bool {
        let left = roster::leave(&mut self.state, id);
        if left {
            self.changed();
        }
        left
    }

    // ------------------------------------------------------------------
    // Phase transitions
    // ------------------------------------------------------------------

    /// Form teams and start the countdown. Silent no-op outside the lobby or
    /// with too few players.
    pub fn start(&mut self, now_ms: u64) -> bool {
        if self.state.status != RacePhase::Waiting {
            debug!(phase = ?self.state.status, "start ignored outside lobby");
            return false;
        }
        let needed = self.config.min_players.max(1);
        if self.state.players.len() < needed {
            debug!(players = self.state.players.len(), needed, "start refused, not enough players");
            return false;
        }

        self.state.teams = form_teams(&mut self.state.players, self.config.team_count, &mut self.rng);
        self.state.status = RacePhase::Countdown;
        self.state.countdown_time = self.config.countdown_secs;
        self.state.results = None;
        self.tick = 0;

        info!(
            players = self.state.players.len(),
            teams = self.state.teams.len(),
            seed = self.seed,
            "Teams formed, countdown started"
        );

        // Observers get the formed teams before the start notice
        self.changed();
        self.events.push(RaceEvent::GameStarted);
        if self.config.countdown_secs == 0 {
            self.begin_race(now_ms);
        } else {
            self.schedule(now_ms + COUNTDOWN_STEP_MS, TaskKind::CountdownTick);
        }
        true
    }

    /// Back to an empty lobby from any phase, cancelling every pending timer
    pub fn reset(&mut self) {
        self.generation += 1;
        self.scheduler.cancel_all();
        self.state = GameState::new(self.config.countdown_secs);
        self.tick = 0;
        info!(generation = self.generation, "Game reset");
        self.changed();
    }

    /// Operator shortcut: end the running race now
    pub fn skip_to_finish(&mut self, now_ms: u64) -> bool {
        if self.state.status != RacePhase::Racing {
            return false;
        }
        info!("Race ended by operator");
        self.end_race(now_ms);
        true
    }

    fn on_countdown_tick(&mut self, at_ms: u64) {
        if self.state.status != RacePhase::Countdown {
            return;
        }
        self.state.countdown_time = self.state.countdown_time.saturating_sub(1);
        if self.state.countdown_time == 0 {
            self.begin_race(at_ms);
        } else {
            self.schedule(at_ms + COUNTDOWN_STEP_MS, TaskKind::CountdownTick);
        }
        self.changed();
    }

    fn begin_race(&mut self, at_ms: u64) {
        self.state.status = RacePhase::Racing;
        self.state.race_started_at = Some(at_ms);
        self.tick = 0;
        info!(teams = self.state.teams.len(), "Race started");

        let gates: Vec<(TeamId, u64)> = self
            .state
            .teams
            .iter()
            .enumerate()
            .map(|(index, team)| (team.id, self.config.stagger_for(index).as_millis() as u64))
            .collect();
        for (team_id, delay_ms) in gates {
            if delay_ms == 0 {
                self.open_gate(team_id, at_ms);
            } else {
                self.schedule(at_ms + delay_ms, TaskKind::OpenGate(team_id));
            }
        }

        let tick_ms = self.tick_ms();
        self.schedule(at_ms + tick_ms, TaskKind::ProgressTick);
    }

    fn open_gate(&mut self, team_id: TeamId, at_ms: u64) {
        if self.state.status != RacePhase::Racing {
            return;
        }
        let Some(team) = self.state.team_mut(team_id) else {
            warn!(team_id, "gate timer for unknown team");
            return;
        };
        if team.can_race {
            return;
        }
        team.can_race = true;
        team.start_time = Some(at_ms);
        info!(team_id, "Team gate opened");
        self.events.push(RaceEvent::TeamStarted(team_id));
        self.changed();
    }

    fn end_race(&mut self, at_ms: u64) {
        if self.state.status != RacePhase::Racing {
            return;
        }
        self.scheduler.cancel_all();
        for team in self.state.teams.iter_mut() {
            team.velocity = 0.0;
            if !team.finished {
                team.dnf = true;
            }
        }
        self.state.status = RacePhase::Finished;
        self.state.race_ended_at = Some(at_ms);

        let results = results::rank(&self.state.teams);
        info!(winner = ?results.winner, ticks = self.tick, "Race finished");
        self.state.results = Some(results);
        self.changed();
    }

    // ------------------------------------------------------------------
    // Taps
    // ------------------------------------------------------------------

    /// Count a tap from `id` if its team may move right now
    pub fn tap(&mut self, id: ConnectionId) -> bool {
        if self.state.status != RacePhase::Racing {
            return false;
        }
        let Some(player) = self.state.players.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        let Some(team_id) = player.team_id else {
            return false;
        };
        let Some(team) = self.state.teams.iter_mut().find(|t| t.id == team_id) else {
            warn!(connection_id = %id, team_id, "player assigned to missing team");
            return false;
        };
        if !team.accepts_taps() {
            return false;
        }

        team.velocity += self.config.tap_increment;
        team.total_taps += 1;
        player.taps += 1;
        self.changed();
        true
    }

    // ------------------------------------------------------------------
    // Progress loop
    // ------------------------------------------------------------------

    fn tick_ms(&self) -> u64 {
        (self.config.tick_interval.as_millis() as u64).max(1)
    }

    /// Fire every timer due at or before `now_ms`, in due order
    pub fn advance(&mut self, now_ms: u64) {
        while let Some((due, task)) = self.scheduler.pop_due(now_ms) {
            if task.generation != self.generation {
                debug!(?task, "stale timer dropped");
                continue;
            }
            match task.kind {
                TaskKind::CountdownTick => self.on_countdown_tick(due),
                TaskKind::OpenGate(team_id) => self.open_gate(team_id, due),
                TaskKind::ProgressTick => self.on_progress_tick(due),
            }
        }
    }

    fn on_progress_tick(&mut self, at_ms: u64) {
        if self.state.status != RacePhase::Racing {
            return;
        }
        self.tick += 1;

        let model = self.config.velocity_model;
        let finish_line = self.config.finish_line;
        for team in self.state.teams.iter_mut().filter(|t| t.is_moving()) {
            ProgressSystem::integrate(team, model);
            ProgressSystem::coast(team);

            for fired in disruption::evaluate(&self.config.disruptions, team) {
                info!(team_id = fired.team_id, kind = %fired.kind, "Service disruption");
                self.events.push(RaceEvent::ServiceDisruption {
                    team_id: fired.team_id,
                    kind: fired.kind,
                });
            }

            if ProgressSystem::check_finish(team, finish_line, at_ms) {
                info!(team_id = team.id, race_time_ms = ?team.race_time, "Team finished");
            }
        }

        let over = match self.config.end_policy {
            RaceEndPolicy::FirstFinisher => self.state.teams.iter().any(|t| t.finished),
            // A team whose members all left can never finish
            RaceEndPolicy::AllFinished => self
                .state
                .teams
                .iter()
                .all(|t| t.finished || t.members.is_empty()),
        };
        if over {
            self.end_race(at_ms);
        } else {
            let tick_ms = self.tick_ms();
            self.schedule(at_ms + tick_ms, TaskKind::ProgressTick);
            self.changed();
        }
    }
}
