//! Chance Engine.
//!
//! The elimination chance is either the configured static value or, in decay
//! mode, a linear interpolation between the decay bounds driven by the
//! fraction of effective participants still standing:
//!
//! `chance = min + (max - min) * remaining / effective`

use banroyale_types::GameSettings;
use std::collections::BTreeSet;

/// Progress thresholds (percent of effective participants eliminated) that
/// are announced once each.
pub const CHECKPOINTS: [u8; 10] = [10, 20, 30, 40, 50, 60, 70, 80, 90, 95];

pub fn static_chance(settings: &GameSettings) -> f64 {
    settings.elimination_chance()
}

pub fn decay_chance(settings: &GameSettings, effective: usize, eliminated: usize) -> f64 {
    if effective == 0 {
        return settings.elimination_chance();
    }
    let remaining = effective.saturating_sub(eliminated);
    let factor = remaining as f64 / effective as f64;
    let min = settings.min_decay_chance();
    let max = settings.max_decay_chance();
    min + (max - min) * factor
}

pub fn current_chance(settings: &GameSettings, effective: usize, eliminated: usize) -> f64 {
    if settings.decay_mode() {
        decay_chance(settings, effective, eliminated)
    } else {
        static_chance(settings)
    }
}

/// Percent of effective participants eliminated, or 0 with no participants.
pub fn progress_pct(effective: usize, eliminated: usize) -> f64 {
    if effective == 0 {
        return 0.0;
    }
    eliminated as f64 / effective as f64 * 100.0
}

/// A checkpoint crossed for the first time.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckpointReached {
    pub threshold: u8,
    pub progress_pct: f64,
    pub eliminated: usize,
    pub effective: usize,
    pub chance: f64,
}

/// Thresholds at or below the current progress that are not yet logged, in
/// ascending order.
pub fn pending_checkpoints(
    effective: usize,
    eliminated: usize,
    logged: &BTreeSet<u8>,
) -> Vec<u8> {
    if effective == 0 {
        return Vec::new();
    }
    let progress = progress_pct(effective, eliminated);
    CHECKPOINTS
        .iter()
        .copied()
        .filter(|threshold| progress >= f64::from(*threshold) && !logged.contains(threshold))
        .collect()
}
