use std::time::Duration;
use thiserror::Error;

use crate::{ChannelId, RoleId};

pub const DEFAULT_ELIMINATION_CHANCE: f64 = 0.99;
pub const DEFAULT_ELIMINATION_DELAY_SECS: f64 = 2.0;
pub const DEFAULT_MIN_DECAY_CHANCE: f64 = 0.01;
pub const DEFAULT_MAX_DECAY_CHANCE: f64 = 0.99;
pub const DEFAULT_REACT_MARKER: &str = "✅";
pub const DEFAULT_SPECTATOR_ROLE: &str = "Ban Royale Spectator";

/// Smallest accepted chance (0.01%).
pub const MIN_CHANCE: f64 = 0.0001;
pub const MAX_ELIMINATION_DELAY_SECS: f64 = 60.0;

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("min_decay_chance ({min}) must be less than max_decay_chance ({max})")]
    DecayRange { min: f64, max: f64 },
}

/// Process-wide game configuration, mutable at runtime.
///
/// Every setter validates its input; `min_decay_chance < max_decay_chance`
/// holds after every successful write.
#[derive(Clone, Debug, PartialEq)]
pub struct GameSettings {
    controller_role: RoleId,
    elimination_channel: ChannelId,
    log_channel: ChannelId,
    elimination_chance: f64,
    elimination_delay_secs: f64,
    decay_mode: bool,
    min_decay_chance: f64,
    max_decay_chance: f64,
    react_marker: String,
    spectator_role: String,
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), SettingsError> {
    // NaN fails both comparisons.
    if !(value >= min && value <= max) {
        return Err(SettingsError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

impl GameSettings {
    pub fn new(
        controller_role: RoleId,
        elimination_channel: ChannelId,
        log_channel: ChannelId,
    ) -> Self {
        Self {
            controller_role,
            elimination_channel,
            log_channel,
            elimination_chance: DEFAULT_ELIMINATION_CHANCE,
            elimination_delay_secs: DEFAULT_ELIMINATION_DELAY_SECS,
            decay_mode: false,
            min_decay_chance: DEFAULT_MIN_DECAY_CHANCE,
            max_decay_chance: DEFAULT_MAX_DECAY_CHANCE,
            react_marker: DEFAULT_REACT_MARKER.to_string(),
            spectator_role: DEFAULT_SPECTATOR_ROLE.to_string(),
        }
    }

    pub fn controller_role(&self) -> RoleId {
        self.controller_role
    }

    pub fn elimination_channel(&self) -> ChannelId {
        self.elimination_channel
    }

    pub fn log_channel(&self) -> ChannelId {
        self.log_channel
    }

    pub fn elimination_chance(&self) -> f64 {
        self.elimination_chance
    }

    pub fn elimination_delay(&self) -> Duration {
        Duration::from_secs_f64(self.elimination_delay_secs)
    }

    pub fn elimination_delay_secs(&self) -> f64 {
        self.elimination_delay_secs
    }

    pub fn decay_mode(&self) -> bool {
        self.decay_mode
    }

    pub fn min_decay_chance(&self) -> f64 {
        self.min_decay_chance
    }

    pub fn max_decay_chance(&self) -> f64 {
        self.max_decay_chance
    }

    pub fn react_marker(&self) -> &str {
        &self.react_marker
    }

    pub fn spectator_role(&self) -> &str {
        &self.spectator_role
    }

    pub fn set_elimination_chance(&mut self, chance: f64) -> Result<(), SettingsError> {
        check_range("elimination_chance", chance, MIN_CHANCE, 1.0)?;
        self.elimination_chance = chance;
        Ok(())
    }

    pub fn set_elimination_delay_secs(&mut self, secs: f64) -> Result<(), SettingsError> {
        check_range(
            "elimination_delay_secs",
            secs,
            0.0,
            MAX_ELIMINATION_DELAY_SECS,
        )?;
        self.elimination_delay_secs = secs;
        Ok(())
    }

    pub fn set_decay_mode(&mut self, enabled: bool) {
        self.decay_mode = enabled;
    }

    /// Flip decay mode, returning the new value.
    pub fn toggle_decay_mode(&mut self) -> bool {
        self.decay_mode = !self.decay_mode;
        self.decay_mode
    }

    pub fn set_min_decay_chance(&mut self, chance: f64) -> Result<(), SettingsError> {
        check_range("min_decay_chance", chance, MIN_CHANCE, 1.0)?;
        if chance >= self.max_decay_chance {
            return Err(SettingsError::DecayRange {
                min: chance,
                max: self.max_decay_chance,
            });
        }
        self.min_decay_chance = chance;
        Ok(())
    }

    pub fn set_max_decay_chance(&mut self, chance: f64) -> Result<(), SettingsError> {
        check_range("max_decay_chance", chance, MIN_CHANCE, 1.0)?;
        if chance <= self.min_decay_chance {
            return Err(SettingsError::DecayRange {
                min: self.min_decay_chance,
                max: chance,
            });
        }
        self.max_decay_chance = chance;
        Ok(())
    }

    /// Set both decay bounds at once, checking the pair rather than each
    /// bound against the previous value of the other.
    pub fn set_decay_range(&mut self, min: f64, max: f64) -> Result<(), SettingsError> {
        check_range("min_decay_chance", min, MIN_CHANCE, 1.0)?;
        check_range("max_decay_chance", max, MIN_CHANCE, 1.0)?;
        if min >= max {
            return Err(SettingsError::DecayRange { min, max });
        }
        self.min_decay_chance = min;
        self.max_decay_chance = max;
        Ok(())
    }

    pub fn set_react_marker(&mut self, marker: impl Into<String>) {
        self.react_marker = marker.into();
    }

    pub fn set_spectator_role(&mut self, name: impl Into<String>) {
        self.spectator_role = name.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GameSettings {
        GameSettings::new(RoleId(1), ChannelId(2), ChannelId(3))
    }

    #[test]
    fn defaults() {
        let s = settings();
        assert_eq!(s.elimination_chance(), DEFAULT_ELIMINATION_CHANCE);
        assert_eq!(s.elimination_delay(), Duration::from_secs(2));
        assert!(!s.decay_mode());
        assert!(s.min_decay_chance() < s.max_decay_chance());
        assert_eq!(s.spectator_role(), DEFAULT_SPECTATOR_ROLE);
    }

    #[test]
    fn elimination_chance_bounds() {
        let mut s = settings();
        assert!(s.set_elimination_chance(0.5).is_ok());
        assert_eq!(s.elimination_chance(), 0.5);
        assert!(s.set_elimination_chance(1.0).is_ok());
        assert!(matches!(
            s.set_elimination_chance(0.0),
            Err(SettingsError::OutOfRange { field: "elimination_chance", .. })
        ));
        assert!(s.set_elimination_chance(1.01).is_err());
        assert!(s.set_elimination_chance(f64::NAN).is_err());
        assert_eq!(s.elimination_chance(), 1.0);
    }

    #[test]
    fn elimination_delay_bounds() {
        let mut s = settings();
        assert!(s.set_elimination_delay_secs(0.0).is_ok());
        assert_eq!(s.elimination_delay(), Duration::ZERO);
        assert!(s.set_elimination_delay_secs(60.0).is_ok());
        assert!(s.set_elimination_delay_secs(-1.0).is_err());
        assert!(s.set_elimination_delay_secs(60.5).is_err());
    }

    #[test]
    fn decay_bounds_keep_min_below_max() {
        let mut s = settings();
        assert!(s.set_min_decay_chance(0.2).is_ok());
        assert_eq!(
            s.set_min_decay_chance(0.99),
            Err(SettingsError::DecayRange { min: 0.99, max: 0.99 })
        );
        assert!(s.set_max_decay_chance(0.2).is_err());
        assert!(s.set_max_decay_chance(0.5).is_ok());
        assert!(s.set_min_decay_chance(0.6).is_err());
        assert_eq!(s.min_decay_chance(), 0.2);
        assert_eq!(s.max_decay_chance(), 0.5);
    }

    #[test]
    fn decay_range_checks_the_pair() {
        let mut s = settings();
        // Moving both bounds above the current max in one write.
        assert!(s.set_decay_range(0.995, 1.0).is_ok());
        assert!(s.set_decay_range(0.5, 0.5).is_err());
        assert_eq!(s.min_decay_chance(), 0.995);
    }

    #[test]
    fn toggle_decay() {
        let mut s = settings();
        assert!(s.toggle_decay_mode());
        assert!(!s.toggle_decay_mode());
    }
}
