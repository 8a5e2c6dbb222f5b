use banroyale_types::SettingsError;
use thiserror::Error;

use crate::platform::PlatformError;
use crate::store::StoreError;

/// Why a target was rejected.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("no target given")]
    Missing,
    #[error("cannot target yourself")]
    SelfTarget,
    #[error("target holds an equal or higher role")]
    Outranked,
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("controller role required")]
    PermissionDenied,
    #[error("game is already enabled")]
    AlreadyEnabled,
    #[error("game is already disabled")]
    AlreadyDisabled,
    #[error("game is not enabled")]
    GameDisabled,
    #[error("invalid target: {0}")]
    InvalidTarget(#[from] TargetError),
    #[error("spectators cannot eliminate participants")]
    SpectatorForbidden,
    #[error("no elimination records to reverse")]
    NoRecords,
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("rate limited after {attempts} attempts")]
    ExternalRateLimited { attempts: u32 },
    #[error("missing platform permissions")]
    ExternalPermissionDenied,
    #[error("member not found")]
    ExternalNotFound,
    #[error(transparent)]
    External(PlatformError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Coarse classification used by hosts to render failures uniformly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PermissionDenied,
    ValidationFailure,
    GameStateConflict,
    ExternalRateLimited,
    ExternalPermissionDenied,
    ExternalNotFound,
    ExternalFailure,
    IoFailure,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied | Self::SpectatorForbidden => ErrorKind::PermissionDenied,
            Self::InvalidTarget(_) | Self::Settings(_) => ErrorKind::ValidationFailure,
            Self::AlreadyEnabled
            | Self::AlreadyDisabled
            | Self::GameDisabled
            | Self::NoRecords => ErrorKind::GameStateConflict,
            Self::ExternalRateLimited { .. } => ErrorKind::ExternalRateLimited,
            Self::ExternalPermissionDenied => ErrorKind::ExternalPermissionDenied,
            Self::ExternalNotFound => ErrorKind::ExternalNotFound,
            Self::External(_) => ErrorKind::ExternalFailure,
            Self::Store(_) => ErrorKind::IoFailure,
        }
    }
}

impl From<PlatformError> for GameError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::NotFound => Self::ExternalNotFound,
            PlatformError::PermissionDenied => Self::ExternalPermissionDenied,
            PlatformError::RateLimited => Self::ExternalRateLimited { attempts: 1 },
            other => Self::External(other),
        }
    }
}
