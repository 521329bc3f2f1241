//! Per-session timer queue
//!
//! Every delayed callback of a race (countdown seconds, staggered gate
//! openings, progress ticks) lives here so a reset can drop all of them at
//! once. Tasks are stamped with the session generation that scheduled them.

use std::collections::BTreeMap;

use super::state::TeamId;

/// Work to perform when a timer comes due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    CountdownTick,
    OpenGate(TeamId),
    ProgressTick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    /// Session generation the task belongs to
    pub generation: u64,
    pub kind: TaskKind,
}

/// Ordered by due time, then by insertion order
#[derive(Debug, Default)]
pub struct Scheduler {
    next_seq: u64,
    pending: BTreeMap<(u64, u64), ScheduledTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_at(&mut self, due_ms: u64, task: ScheduledTask) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert((due_ms, seq), task);
    }

    /// Drop every pending task
    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    /// Earliest due time, if anything is pending
    pub fn next_due(&self) -> Option<u64> {
        self.pending.keys().next().map(|(due, _)| *due)
    }

    /// Pop the earliest task due at or before `now_ms`
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(u64, ScheduledTask)> {
        let (&(due, seq), _) = self.pending.iter().next()?;
        if due > now_ms {
            return None;
        }
        self.pending.remove(&(due, seq)).map(|task| (due, task))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
