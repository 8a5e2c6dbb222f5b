//! Game-state engine for banroyale.
//!
//! The engine owns every piece of game state: the per-space session state
//! machine ([GameSession]), the persisted elimination records
//! ([RecordStore]), the chance curve ([chance]) and the mass reversal
//! workflow ([reversal]). The chat platform is reached only through the
//! [Platform] trait, so hosts decide how commands arrive and how results are
//! rendered.

pub mod backoff;
pub mod chance;
pub mod countdown;
pub mod error;
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
pub mod platform;
pub mod reversal;
pub mod roster;
pub mod session;
pub mod spectator;
pub mod store;

#[cfg(test)]
mod tests;

pub use error::{ErrorKind, GameError, TargetError};
pub use platform::{Clock, Entropy, Platform, PlatformError, RngEntropy, SystemClock};
pub use reversal::{ReversalConfig, ReversalReport};
pub use session::{
    Attempt, Elimination, Enabled, EndGameSummary, GameEnd, GameSession, GameStatus, Phase,
    SettingsApplied, SettingsChange, StatusTier, WinCheck,
};
pub use store::{RecordStore, StoreError};
