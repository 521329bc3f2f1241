//! Application state shared across routes

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::game::{RaceHandle, RaceHost};
use crate::util::time::RaceClock;

/// Bookkeeping for one open socket
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub connected_at: DateTime<Utc>,
}

impl ConnectionInfo {
    pub fn new() -> Self {
        Self {
            connected_at: Utc::now(),
        }
    }

    /// Whole seconds the socket has been open as of `now`
    pub fn connected_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.connected_at).num_seconds().max(0)
    }
}

impl Default for ConnectionInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// The single race session this server hosts
    pub race: RaceHandle,
    /// Open sockets, keyed by connection id
    pub connections: Arc<DashMap<Uuid, ConnectionInfo>>,
}

impl AppState {
    /// Build the state and spawn the session host. Must be called from
    /// inside a tokio runtime.
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let seed = rand::random::<u64>();
        let (host, race) = RaceHost::new(config.race.clone(), seed, RaceClock::new());
        tokio::spawn(host.run());
        info!(seed, "Race session spawned");

        Self {
            config,
            race,
            connections: Arc::new(DashMap::new()),
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn register_connection(&self, id: Uuid) {
        self.connections.insert(id, ConnectionInfo::new());
    }

    /// Forget a socket, returning what was recorded for it
    pub fn unregister_connection(&self, id: &Uuid) -> Option<ConnectionInfo> {
        self.connections.remove(id).map(|(_, info)| info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn connected_secs_never_goes_negative() {
        let info = ConnectionInfo::new();
        assert_eq!(info.connected_secs(info.connected_at + Duration::seconds(42)), 42);
        assert_eq!(info.connected_secs(info.connected_at - Duration::seconds(5)), 0);
    }

    #[tokio::test]
    async fn connections_register_and_unregister() {
        let config = Config::from_lookup(|_| None).unwrap();
        let state = AppState::new(config);
        let id = Uuid::new_v4();

        state.register_connection(id);
        assert_eq!(state.connection_count(), 1);

        let info = state.unregister_connection(&id).unwrap();
        assert!(info.connected_at <= Utc::now());
        assert_eq!(state.connection_count(), 0);
        assert!(state.unregister_connection(&id).is_none());
    }
}
