//! Session host: the task that owns a race session
//!
//! Inputs and timers are serialised through one loop, so every handler runs
//! to completion against the session before the next one starts.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::config::RaceConfig;
use crate::util::time::RaceClock;
use crate::ws::protocol::{ClientMsg, GameStateSnapshot, ServerMsg};

use super::session::RaceSession;
use super::snapshot::SnapshotBuilder;
use super::{RacePhase, SessionInput};

const INPUT_CHANNEL_CAPACITY: usize = 1024;
const BROADCAST_CHANNEL_CAPACITY: usize = 256;

/// The session task has shut down
#[derive(Debug, thiserror::Error)]
#[error("race session is no longer running")]
pub struct HostClosed;

/// Cloneable handle to a running session
#[derive(Clone)]
pub struct RaceHandle {
    input_tx: mpsc::Sender<SessionInput>,
    broadcast_tx: broadcast::Sender<ServerMsg>,
    latest: Arc<RwLock<GameStateSnapshot>>,
}

impl RaceHandle {
    /// Queue an input for the session
    pub async fn send(&self, input: SessionInput) -> Result<(), HostClosed> {
        self.input_tx.send(input).await.map_err(|_| HostClosed)
    }

    /// Receive everything the session broadcasts from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.broadcast_tx.subscribe()
    }

    /// Most recently published state
    pub fn latest_snapshot(&self) -> GameStateSnapshot {
        self.latest.read().clone()
    }

    /// Number of live broadcast subscribers
    pub fn observer_count(&self) -> usize {
        self.broadcast_tx.receiver_count()
    }
}

/// The task side of a session
pub struct RaceHost {
    session: RaceSession,
    input_rx: mpsc::Receiver<SessionInput>,
    broadcast_tx: broadcast::Sender<ServerMsg>,
    latest: Arc<RwLock<GameStateSnapshot>>,
    builder: SnapshotBuilder,
    clock: RaceClock,
}

impl RaceHost {
    /// Create a session host and the handle used to talk to it
    pub fn new(config: RaceConfig, seed: u64, clock: RaceClock) -> (Self, RaceHandle) {
        let (input_tx, input_rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CHANNEL_CAPACITY);

        let session = RaceSession::new(config, seed);
        let mut builder = SnapshotBuilder::new();
        let latest = Arc::new(RwLock::new(builder.build(session.state())));

        let handle = RaceHandle {
            input_tx,
            broadcast_tx: broadcast_tx.clone(),
            latest: latest.clone(),
        };
        let host = Self {
            session,
            input_rx,
            broadcast_tx,
            latest,
            builder,
            clock,
        };

        (host, handle)
    }

    /// Run until every handle has been dropped
    pub async fn run(mut self) {
        info!(seed = self.session.seed(), "Race session host started");

        loop {
            let deadline = self
                .session
                .next_due()
                .map(|due| self.clock.instant_at(due));

            tokio::select! {
                maybe_input = self.input_rx.recv() => {
                    let Some(input) = maybe_input else {
                        break;
                    };
                    self.handle_input(input);
                }
                _ = wait_until(deadline) => {
                    self.session.advance(self.clock.now_ms());
                }
            }

            self.publish();
        }

        info!("Race session host stopped");
    }

    fn handle_input(&mut self, input: SessionInput) {
        let now = self.clock.now_ms();
        // Timers that came due before this input apply first
        self.session.advance(now);

        match input {
            SessionInput::Client { connection_id, msg } => match msg {
                ClientMsg::JoinGame { name } => {
                    self.session.join(connection_id, &name);
                }
                ClientMsg::StartGame => {
                    self.session.start(now);
                }
                ClientMsg::Tap => {
                    if !self.session.tap(connection_id) && self.session.phase() == RacePhase::Racing {
                        debug!(connection_id = %connection_id, "tap dropped");
                    }
                }
                ClientMsg::ResetGame => self.session.reset(),
                ClientMsg::SkipToFinish => {
                    self.session.skip_to_finish(now);
                }
            },
            SessionInput::Disconnected(connection_id) => {
                self.session.leave(connection_id);
            }
        }
    }

    /// Broadcast whatever the last handler produced
    fn publish(&mut self) {
        let events = self.session.drain_events();
        if events.is_empty() {
            return;
        }
        for msg in self.builder.messages(events, self.session.state()) {
            if let ServerMsg::GameState(snapshot) = &msg {
                *self.latest.write() = snapshot.clone();
            }
            // No subscribers is fine; the display may not be connected yet
            let _ = self.broadcast_tx.send(msg);
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::VisiblePhase;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_test::assert_ok;
    use uuid::Uuid;

    fn spawn(config: RaceConfig) -> RaceHandle {
        let (host, handle) = RaceHost::new(config, 1, RaceClock::new());
        tokio::spawn(host.run());
        handle
    }

    async fn next_state(rx: &mut broadcast::Receiver<ServerMsg>) -> GameStateSnapshot {
        loop {
            let received = timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("timed out waiting for broadcast");
            match received {
                Ok(ServerMsg::GameState(snapshot)) => return snapshot,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("broadcast closed"),
            }
        }
    }

    fn client(connection_id: Uuid, msg: ClientMsg) -> SessionInput {
        SessionInput::Client { connection_id, msg }
    }

    #[tokio::test]
    async fn join_is_broadcast_and_cached() {
        let handle = spawn(RaceConfig::default());
        let mut rx = handle.subscribe();
        let id = Uuid::new_v4();

        assert_ok!(handle.send(client(id, ClientMsg::JoinGame { name: "Ada".into() })).await);
        let snapshot = next_state(&mut rx).await;
        assert_eq!(snapshot.status, VisiblePhase::Waiting);
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.players[0].name, "Ada");

        let cached = handle.latest_snapshot();
        assert_eq!(cached.seq, snapshot.seq);
    }

    #[tokio::test]
    async fn rejected_inputs_publish_nothing() {
        let handle = spawn(RaceConfig::default());
        let mut rx = handle.subscribe();
        let id = Uuid::new_v4();

        // Tap in the lobby and a start with one player are both dropped
        assert_ok!(handle.send(client(id, ClientMsg::Tap)).await);
        assert_ok!(handle.send(client(id, ClientMsg::StartGame)).await);
        assert_ok!(handle.send(client(id, ClientMsg::JoinGame { name: "Ada".into() })).await);

        let first = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        match first {
            ServerMsg::GameState(snapshot) => assert_eq!(snapshot.players.len(), 1),
            other => panic!("expected the join snapshot first, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn race_runs_to_completion_on_real_timers() {
        let config = RaceConfig {
            team_count: 1,
            min_players: 1,
            countdown_secs: 0,
            tick_interval: Duration::from_millis(5),
            disruptions: Vec::new(),
            ..RaceConfig::default()
        };
        let handle = spawn(config);
        let mut rx = handle.subscribe();
        let id = Uuid::new_v4();

        assert_ok!(handle.send(client(id, ClientMsg::JoinGame { name: "Ada".into() })).await);
        assert_ok!(handle.send(client(id, ClientMsg::StartGame)).await);
        for _ in 0..100 {
            assert_ok!(handle.send(client(id, ClientMsg::Tap)).await);
        }

        let finished = loop {
            let snapshot = next_state(&mut rx).await;
            if snapshot.status == VisiblePhase::Finished {
                break snapshot;
            }
        };
        assert_eq!(finished.teams[0].position, 100.0);
        assert!(finished.teams[0].finished);
        assert_eq!(finished.results.and_then(|r| r.winner), Some(1));

        assert_ok!(handle.send(client(id, ClientMsg::ResetGame)).await);
        let reset = next_state(&mut rx).await;
        assert_eq!(reset.status, VisiblePhase::Waiting);
        assert!(reset.players.is_empty());
    }

    #[tokio::test]
    async fn disconnect_removes_player() {
        let handle = spawn(RaceConfig::default());
        let mut rx = handle.subscribe();
        let id = Uuid::new_v4();

        assert_ok!(handle.send(client(id, ClientMsg::JoinGame { name: "Ada".into() })).await);
        next_state(&mut rx).await;
        assert_ok!(handle.send(SessionInput::Disconnected(id)).await);
        let snapshot = next_state(&mut rx).await;
        assert!(snapshot.players.is_empty());
    }
}
