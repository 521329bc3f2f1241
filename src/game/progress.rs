//! Track progress: integrate velocity into position and detect finishes

use crate::config::VelocityModel;

use super::disruption;
use super::state::Team;

/// Float slack when comparing against the finish line
pub const FINISH_EPSILON: f32 = 1e-3;

/// Progress system for moving teams along the track
pub struct ProgressSystem;

impl ProgressSystem {
    /// Move a team by its accumulated velocity and apply the velocity policy
    pub fn integrate(team: &mut Team, model: VelocityModel) {
        team.position += team.velocity.max(0.0);
        team.velocity = match model {
            VelocityModel::Instant => 0.0,
            VelocityModel::Momentum { friction } => (team.velocity - friction).max(0.0),
        };
    }

    /// Apply autonomous momentum from an active disruption
    pub fn coast(team: &mut Team) {
        team.position += disruption::advance(team);
    }

    /// Clamp to the finish line. Records the finish the first time the line is
    /// reached and returns true only on that tick.
    pub fn check_finish(team: &mut Team, finish_line: f32, now_ms: u64) -> bool {
        if team.finished {
            team.position = finish_line;
            return false;
        }
        if team.position + FINISH_EPSILON < finish_line {
            return false;
        }

        team.position = finish_line;
        team.velocity = 0.0;
        team.momentum = 0.0;
        team.momentum_ticks = 0;
        team.finished = true;
        team.finish_time = Some(now_ms);
        team.race_time = team.start_time.map(|start| now_ms.saturating_sub(start));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn racing_team() -> Team {
        let mut team = Team::new(1, "Team 1".into(), "#f093fb", "🚀");
        team.can_race = true;
        team.start_time = Some(1_000);
        team
    }

    #[test]
    fn instant_model_consumes_velocity() {
        let mut team = racing_team();
        team.velocity = 3.0;
        ProgressSystem::integrate(&mut team, VelocityModel::Instant);
        assert_eq!(team.position, 3.0);
        assert_eq!(team.velocity, 0.0);
        ProgressSystem::integrate(&mut team, VelocityModel::Instant);
        assert_eq!(team.position, 3.0);
    }

    #[test]
    fn momentum_model_bleeds_friction() {
        let mut team = racing_team();
        team.velocity = 2.0;
        let model = VelocityModel::Momentum { friction: 0.5 };
        let mut positions = Vec::new();
        for _ in 0..6 {
            ProgressSystem::integrate(&mut team, model);
            positions.push(team.position);
        }
        assert_eq!(positions, vec![2.0, 3.5, 4.5, 5.0, 5.0, 5.0]);
        assert_eq!(team.velocity, 0.0);
    }

    #[test]
    fn finish_is_recorded_once_and_clamped() {
        let mut team = racing_team();
        team.position = 104.0;
        assert!(ProgressSystem::check_finish(&mut team, 100.0, 31_000));
        assert_eq!(team.position, 100.0);
        assert_eq!(team.finish_time, Some(31_000));
        assert_eq!(team.race_time, Some(30_000));

        assert!(!ProgressSystem::check_finish(&mut team, 100.0, 40_000));
        assert_eq!(team.finish_time, Some(31_000));
        assert_eq!(team.race_time, Some(30_000));
    }

    #[test]
    fn just_short_of_the_line_is_not_a_finish() {
        let mut team = racing_team();
        team.position = 99.5;
        assert!(!ProgressSystem::check_finish(&mut team, 100.0, 2_000));
        assert!(!team.finished);
        assert_eq!(team.position, 99.5);
    }
}
