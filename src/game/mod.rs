//! Race simulation modules

pub mod disruption;
pub mod host;
pub mod progress;
pub mod results;
pub mod roster;
pub mod schedule;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod teams;

pub use host::{RaceHandle, RaceHost};
pub use state::{ConnectionId, RacePhase};

use crate::ws::protocol::ClientMsg;

/// Input delivered to a session, scoped to the connection it came from
#[derive(Debug, Clone)]
pub enum SessionInput {
    /// Decoded client event
    Client {
        connection_id: ConnectionId,
        msg: ClientMsg,
    },
    /// The connection went away
    Disconnected(ConnectionId),
}
