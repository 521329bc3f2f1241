//! Race policy: the constants a single race runs under

use std::time::Duration;

use super::{parse_number, ConfigError};
use crate::game::disruption::{default_script, DisruptionRule, DisruptionTrigger};

/// How velocity carries over between progress ticks
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VelocityModel {
    /// Velocity is consumed every tick; only fresh taps move the team
    Instant,
    /// Velocity survives the tick, losing `friction` per tick
    Momentum { friction: f32 },
}

/// When the race as a whole is over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceEndPolicy {
    /// First finisher ends the race, everyone else is DNF
    FirstFinisher,
    /// Race runs until every team has crossed the line
    AllFinished,
}

/// Immutable policy for a race
#[derive(Debug, Clone)]
pub struct RaceConfig {
    /// Number of teams players are split into
    pub team_count: usize,
    /// Minimum roster size before a race may start
    pub min_players: usize,
    /// Track percentage added to velocity per accepted tap
    pub tap_increment: f32,
    /// Velocity carry-over policy
    pub velocity_model: VelocityModel,
    /// Gate delay per team index, measured from race start.
    /// Teams past the end of the list reuse the last entry.
    pub stagger_delays: Vec<Duration>,
    /// Progress loop period
    pub tick_interval: Duration,
    /// Countdown length in seconds
    pub countdown_secs: u32,
    /// Position at which a team has finished
    pub finish_line: f32,
    /// Race end policy
    pub end_policy: RaceEndPolicy,
    /// Scripted disruptions, evaluated in order
    pub disruptions: Vec<DisruptionRule>,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            team_count: 3,
            min_players: 2,
            tap_increment: 1.0,
            velocity_model: VelocityModel::Instant,
            stagger_delays: vec![
                Duration::ZERO,
                Duration::from_secs(3),
                Duration::from_secs(6),
            ],
            tick_interval: Duration::from_millis(50),
            countdown_secs: 3,
            finish_line: 100.0,
            end_policy: RaceEndPolicy::AllFinished,
            disruptions: default_script(),
        }
    }
}

impl RaceConfig {
    /// Build a race config from `RACE_*` variables, defaulting anything unset
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("RACE_TEAM_COUNT") {
            config.team_count = parse_number("RACE_TEAM_COUNT", &raw)?;
            if config.team_count == 0 {
                return Err(ConfigError::Invalid("RACE_TEAM_COUNT", raw));
            }
        }
        if let Some(raw) = lookup("RACE_MIN_PLAYERS") {
            config.min_players = parse_number("RACE_MIN_PLAYERS", &raw)?;
        }
        if let Some(raw) = lookup("RACE_TAP_INCREMENT") {
            config.tap_increment = parse_number("RACE_TAP_INCREMENT", &raw)?;
            if config.tap_increment.is_nan() || config.tap_increment <= 0.0 {
                return Err(ConfigError::Invalid("RACE_TAP_INCREMENT", raw));
            }
        }

        let friction = match lookup("RACE_FRICTION") {
            Some(raw) => {
                let friction: f32 = parse_number("RACE_FRICTION", &raw)?;
                if friction < 0.0 {
                    return Err(ConfigError::Invalid("RACE_FRICTION", raw));
                }
                friction
            }
            None => 0.5,
        };
        if let Some(raw) = lookup("RACE_VELOCITY_MODEL") {
            config.velocity_model = match raw.trim() {
                "instant" => VelocityModel::Instant,
                "momentum" => VelocityModel::Momentum { friction },
                _ => return Err(ConfigError::Invalid("RACE_VELOCITY_MODEL", raw)),
            };
        }

        if let Some(raw) = lookup("RACE_STAGGER_MS") {
            let delays = raw
                .split(',')
                .filter(|part| !part.trim().is_empty())
                .map(|part| parse_number::<u64>("RACE_STAGGER_MS", part).map(Duration::from_millis))
                .collect::<Result<Vec<_>, _>>()?;
            if delays.is_empty() {
                return Err(ConfigError::Invalid("RACE_STAGGER_MS", raw));
            }
            config.stagger_delays = delays;
        }
        if let Some(raw) = lookup("RACE_TICK_MS") {
            let ms: u64 = parse_number("RACE_TICK_MS", &raw)?;
            if ms == 0 {
                return Err(ConfigError::Invalid("RACE_TICK_MS", raw));
            }
            config.tick_interval = Duration::from_millis(ms);
        }
        if let Some(raw) = lookup("RACE_COUNTDOWN_SECS") {
            config.countdown_secs = parse_number("RACE_COUNTDOWN_SECS", &raw)?;
        }
        if let Some(raw) = lookup("RACE_END_POLICY") {
            config.end_policy = match raw.trim() {
                "first_finisher" => RaceEndPolicy::FirstFinisher,
                "all_finished" => RaceEndPolicy::AllFinished,
                _ => return Err(ConfigError::Invalid("RACE_END_POLICY", raw)),
            };
        }
        if let Some(raw) = lookup("RACE_DISRUPTIONS") {
            match raw.trim() {
                "on" => {}
                "off" => config.disruptions.clear(),
                _ => return Err(ConfigError::Invalid("RACE_DISRUPTIONS", raw)),
            }
        }
        if let Some(raw) = lookup("RACE_DISRUPTION_TRIGGER") {
            let trigger = parse_trigger(&raw)
                .ok_or_else(|| ConfigError::Invalid("RACE_DISRUPTION_TRIGGER", raw.clone()))?;
            for rule in config.disruptions.iter_mut() {
                rule.trigger = trigger.clone();
            }
        }

        Ok(config)
    }

    /// Gate delay for the team at `index` (0-based)
    pub fn stagger_for(&self, index: usize) -> Duration {
        self.stagger_delays
            .get(index)
            .or_else(|| self.stagger_delays.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

/// `taps:<count>` or `position:<percent>`
fn parse_trigger(raw: &str) -> Option<DisruptionTrigger> {
    let (kind, value) = raw.trim().split_once(':')?;
    let value = value.trim();
    match kind.trim() {
        "taps" => value.parse().ok().map(DisruptionTrigger::TapsReached),
        "position" => {
            let position: f32 = value.parse().ok()?;
            (position.is_finite() && position >= 0.0).then_some(DisruptionTrigger::PositionReached(position))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(pairs: &[(&str, &str)]) -> Result<RaceConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RaceConfig::from_lookup(&|key: &str| map.get(key).cloned())
    }

    #[test]
    fn momentum_model_picks_up_friction() {
        let config = parse(&[("RACE_VELOCITY_MODEL", "momentum"), ("RACE_FRICTION", "0.25")]).unwrap();
        assert_eq!(config.velocity_model, VelocityModel::Momentum { friction: 0.25 });
    }

    #[test]
    fn stagger_list_is_parsed_and_extended() {
        let config = parse(&[("RACE_STAGGER_MS", "0, 1500")]).unwrap();
        assert_eq!(config.stagger_for(0), Duration::ZERO);
        assert_eq!(config.stagger_for(1), Duration::from_millis(1500));
        assert_eq!(config.stagger_for(4), Duration::from_millis(1500));
    }

    #[test]
    fn end_policy_and_disruptions_switch() {
        let config = parse(&[("RACE_END_POLICY", "first_finisher"), ("RACE_DISRUPTIONS", "off")]).unwrap();
        assert_eq!(config.end_policy, RaceEndPolicy::FirstFinisher);
        assert!(config.disruptions.is_empty());
    }

    #[test]
    fn disruption_trigger_can_be_moved_to_a_position() {
        let config = parse(&[("RACE_DISRUPTION_TRIGGER", "position:40")]).unwrap();
        assert_eq!(config.disruptions.len(), 1);
        assert_eq!(config.disruptions[0].trigger, DisruptionTrigger::PositionReached(40.0));

        let config = parse(&[("RACE_DISRUPTION_TRIGGER", "taps: 20")]).unwrap();
        assert_eq!(config.disruptions[0].trigger, DisruptionTrigger::TapsReached(20));

        assert!(parse(&[("RACE_DISRUPTION_TRIGGER", "distance:40")]).is_err());
        assert!(parse(&[("RACE_DISRUPTION_TRIGGER", "position:-1")]).is_err());
        assert!(parse(&[("RACE_DISRUPTION_TRIGGER", "taps")]).is_err());
    }

    #[test]
    fn nonsense_values_are_rejected() {
        assert!(parse(&[("RACE_TEAM_COUNT", "0")]).is_err());
        assert!(parse(&[("RACE_TICK_MS", "0")]).is_err());
        assert!(parse(&[("RACE_VELOCITY_MODEL", "warp")]).is_err());
        assert!(parse(&[("RACE_TAP_INCREMENT", "-1")]).is_err());
        assert!(parse(&[("RACE_TAP_INCREMENT", "NaN")]).is_err());
        assert!(parse(&[("RACE_STAGGER_MS", ",")]).is_err());
    }
}
