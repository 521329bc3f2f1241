//! Time utilities for the race simulation

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<(Instant, DateTime<Utc>)> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(|| (Instant::now(), Utc::now()));
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|(start, _)| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Wall-clock instant the server started, if initialized
pub fn started_at() -> Option<DateTime<Utc>> {
    SERVER_START.get().map(|(_, at)| *at)
}

/// Monotonic millisecond clock anchored to the Unix epoch.
///
/// Readings look like Unix timestamps (so clients can display them) but never
/// go backwards when the system clock is adjusted.
#[derive(Debug, Clone, Copy)]
pub struct RaceClock {
    origin: Instant,
    origin_unix_ms: u64,
}

impl RaceClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            origin_unix_ms: unix_millis(),
        }
    }

    /// Current reading in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.origin_unix_ms + self.origin.elapsed().as_millis() as u64
    }

    /// Convert a reading back into a tokio instant for sleeping
    pub fn instant_at(&self, ms: u64) -> tokio::time::Instant {
        let offset = Duration::from_millis(ms.saturating_sub(self.origin_unix_ms));
        tokio::time::Instant::from_std(self.origin + offset)
    }
}

impl Default for RaceClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic_and_round_trips_instants() {
        let clock = RaceClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);

        let later = clock.instant_at(a + 250);
        let earlier = clock.instant_at(a);
        assert_eq!(later - earlier, Duration::from_millis(250));
    }
}
