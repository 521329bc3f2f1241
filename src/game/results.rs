//! Final standings

use std::cmp::Ordering;

use super::state::{RaceResults, Team};

fn has_finished(team: &Team) -> bool {
    team.finished && team.race_time.is_some()
}

/// Finished teams first (fastest race time first), then everyone else by
/// distance covered. Stable: equal teams keep their input order.
pub fn compare(a: &Team, b: &Team) -> Ordering {
    match (has_finished(a), has_finished(b)) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => a.race_time.cmp(&b.race_time),
        (false, false) => b.position.total_cmp(&a.position),
    }
}

/// Rank teams; the first entry is the winner
pub fn rank(teams: &[Team]) -> RaceResults {
    let mut ordered: Vec<&Team> = teams.iter().collect();
    ordered.sort_by(|a, b| compare(a, b));

    let standings: Vec<u32> = ordered.iter().map(|t| t.id).collect();
    RaceResults {
        winner: standings.first().copied(),
        standings,
    }
}
