//! Common types shared by the banroyale engine and its hosts.
//!
//! Identifiers are opaque numeric ids assigned by the chat platform. They are
//! rendered as decimal strings wherever they become map keys in the persisted
//! record document.

use serde::{Deserialize, Serialize};
use std::{fmt, num::ParseIntError, str::FromStr};

pub mod member;
pub mod record;
pub mod settings;

pub use member::{Member, Role};
pub use record::{EliminationRecord, SpaceDocument, StoreDocument, CHECKPOINTS_KEY};
pub use settings::{GameSettings, SettingsError};

macro_rules! platform_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

platform_id!(
    /// A chat community (guild/server).
    SpaceId
);
platform_id!(
    /// A member account within a space.
    MemberId
);
platform_id!(RoleId);
platform_id!(ChannelId);
platform_id!(MessageId);
