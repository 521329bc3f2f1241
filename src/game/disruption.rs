//! Scripted mid-race disruptions
//!
//! A script is an ordered list of rules. Each rule fires at most once per
//! team, the first tick its trigger holds.

use super::state::Team;

/// Condition checked against a team every progress tick
#[derive(Debug, Clone, PartialEq)]
pub enum DisruptionTrigger {
    /// Team has accumulated at least this many taps
    TapsReached(u32),
    /// Team has covered at least this much of the track
    PositionReached(f32),
}

impl DisruptionTrigger {
    pub fn is_met(&self, team: &Team) -> bool {
        match *self {
            DisruptionTrigger::TapsReached(taps) => team.total_taps >= taps,
            DisruptionTrigger::PositionReached(position) => team.position >= position,
        }
    }
}

/// Autonomous advance granted while the input channel is down
#[derive(Debug, Clone, PartialEq)]
pub struct MomentumGrant {
    /// Track percentage moved on the first tick
    pub initial: f32,
    /// Multiplier applied after every tick (0..=1)
    pub decay: f32,
    /// Hard cap on how many ticks the grant lasts
    pub max_ticks: u32,
}

/// What happens to a team when a rule fires
#[derive(Debug, Clone, PartialEq)]
pub struct DisruptionEffect {
    /// Ticks during which the team's taps are ignored (0 = never blocked)
    pub block_ticks: u32,
    pub momentum: Option<MomentumGrant>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisruptionRule {
    /// Label reported to observers, e.g. `connection_lost`
    pub kind: String,
    pub trigger: DisruptionTrigger,
    pub effect: DisruptionEffect,
}

/// Built-in script: halfway through, each team's taps stop landing for three
/// seconds while in-flight momentum keeps it rolling.
pub fn default_script() -> Vec<DisruptionRule> {
    vec![DisruptionRule {
        kind: "connection_lost".to_string(),
        trigger: DisruptionTrigger::TapsReached(50),
        effect: DisruptionEffect {
            block_ticks: 60,
            momentum: Some(MomentumGrant {
                initial: 0.5,
                decay: 0.95,
                max_ticks: 60,
            }),
        },
    }]
}

/// A rule that fired this tick
#[derive(Debug, Clone, PartialEq)]
pub struct Triggered {
    pub team_id: u32,
    pub kind: String,
}

/// Advance an active disruption by one tick: apply momentum, count down the
/// tap block. Returns the distance momentum moved the team.
pub fn advance(team: &mut Team) -> f32 {
    let mut moved = 0.0;
    if team.momentum_ticks > 0 {
        moved = team.momentum.max(0.0);
        team.momentum *= team.momentum_decay;
        team.momentum_ticks -= 1;
        if team.momentum_ticks == 0 {
            team.momentum = 0.0;
        }
    }
    if team.blocked_ticks > 0 {
        team.blocked_ticks -= 1;
    }
    if team.disrupted && team.blocked_ticks == 0 && team.momentum_ticks == 0 {
        team.disrupted = false;
    }
    moved
}

/// Fire every rule whose trigger holds for the first time on this team
pub fn evaluate(rules: &[DisruptionRule], team: &mut Team) -> Vec<Triggered> {
    let mut fired = Vec::new();
    for (index, rule) in rules.iter().enumerate() {
        if team.fired_rules.contains(&index) || !rule.trigger.is_met(team) {
            continue;
        }
        team.fired_rules.push(index);
        team.disrupted = true;
        team.disruption_type = Some(rule.kind.clone());
        team.blocked_ticks = team.blocked_ticks.max(rule.effect.block_ticks);
        if let Some(grant) = &rule.effect.momentum {
            team.momentum = grant.initial;
            team.momentum_decay = grant.decay.clamp(0.0, 1.0);
            team.momentum_ticks = grant.max_ticks;
        }
        fired.push(Triggered {
            team_id: team.id,
            kind: rule.kind.clone(),
        });
    }
    fired
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team() -> Team {
        let mut team = Team::new(1, "Team 1".into(), "#f093fb", "🚀");
        team.can_race = true;
        team
    }

    fn outage(taps: u32, block_ticks: u32, momentum: Option<MomentumGrant>) -> DisruptionRule {
        DisruptionRule {
            kind: "connection_lost".into(),
            trigger: DisruptionTrigger::TapsReached(taps),
            effect: DisruptionEffect {
                block_ticks,
                momentum,
            },
        }
    }

    #[test]
    fn rule_fires_once_per_team() {
        let rules = vec![outage(10, 2, None)];
        let mut team = team();
        team.total_taps = 9;
        assert!(evaluate(&rules, &mut team).is_empty());

        team.total_taps = 10;
        let fired = evaluate(&rules, &mut team);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].kind, "connection_lost");
        assert!(team.disrupted);
        assert!(!team.accepts_taps());

        team.total_taps = 500;
        assert!(evaluate(&rules, &mut team).is_empty());
    }

    #[test]
    fn block_expires_and_team_recovers() {
        let rules = vec![outage(0, 2, None)];
        let mut team = team();
        evaluate(&rules, &mut team);
        assert_eq!(advance(&mut team), 0.0);
        assert!(team.disrupted);
        advance(&mut team);
        assert!(!team.disrupted);
        assert!(team.accepts_taps());
        assert_eq!(team.disruption_type.as_deref(), Some("connection_lost"));
    }

    #[test]
    fn momentum_decays_and_is_bounded_by_ticks() {
        let grant = MomentumGrant {
            initial: 1.0,
            decay: 0.5,
            max_ticks: 3,
        };
        let rules = vec![outage(0, 0, Some(grant))];
        let mut team = team();
        evaluate(&rules, &mut team);

        let moves: Vec<f32> = (0..5).map(|_| advance(&mut team)).collect();
        assert_eq!(moves, vec![1.0, 0.5, 0.25, 0.0, 0.0]);
        assert_eq!(team.momentum, 0.0);
        assert!(!team.disrupted);
    }

    #[test]
    fn position_trigger() {
        let rule = DisruptionRule {
            kind: "slowdown".into(),
            trigger: DisruptionTrigger::PositionReached(75.0),
            effect: DisruptionEffect {
                block_ticks: 1,
                momentum: None,
            },
        };
        let mut team = team();
        team.position = 74.9;
        assert!(!rule.trigger.is_met(&team));
        team.position = 75.0;
        assert!(rule.trigger.is_met(&team));
    }
}
