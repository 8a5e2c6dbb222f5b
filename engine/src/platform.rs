//! Seams to the chat platform and the process environment.

use banroyale_types::{ChannelId, Member, MemberId, MessageId, Role, RoleId, SpaceId};
use rand::RngCore;
use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Classified result of a failed platform call.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("not found")]
    NotFound,
    #[error("rate limited")]
    RateLimited,
    #[error("missing permissions")]
    PermissionDenied,
    #[error("platform failure: {0}")]
    Other(String),
}

/// Operations consumed from the chat platform.
///
/// Calls are expected to carry their own network timeouts.
pub trait Platform: Send + Sync + 'static {
    /// Current members of a space, with roles and account flags.
    fn members(
        &self,
        space: SpaceId,
    ) -> impl Future<Output = Result<Vec<Member>, PlatformError>> + Send;

    /// The controlling account's own membership in the space, if present.
    fn controller(
        &self,
        space: SpaceId,
    ) -> impl Future<Output = Result<Option<Member>, PlatformError>> + Send;

    /// Remove a member from the space.
    fn eliminate(
        &self,
        space: SpaceId,
        member: MemberId,
        reason: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Restore a removed member. Fails with [PlatformError::NotFound] if the
    /// member is not currently removed.
    fn reverse(
        &self,
        space: SpaceId,
        member: MemberId,
        reason: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    fn find_role(
        &self,
        space: SpaceId,
        name: &str,
    ) -> impl Future<Output = Result<Option<Role>, PlatformError>> + Send;

    fn create_role(
        &self,
        space: SpaceId,
        name: &str,
        reason: &str,
    ) -> impl Future<Output = Result<Role, PlatformError>> + Send;

    fn delete_role(
        &self,
        space: SpaceId,
        role: RoleId,
        reason: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    fn grant_role(
        &self,
        space: SpaceId,
        member: MemberId,
        role: RoleId,
        reason: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    fn revoke_role(
        &self,
        space: SpaceId,
        member: MemberId,
        role: RoleId,
        reason: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Post a message to a channel.
    fn post(
        &self,
        channel: ChannelId,
        text: &str,
    ) -> impl Future<Output = Result<MessageId, PlatformError>> + Send;

    /// Replace the content of a previously posted message.
    fn edit(
        &self,
        channel: ChannelId,
        message: MessageId,
        text: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Send a direct notice to a member.
    fn notify(
        &self,
        member: MemberId,
        text: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;
}

/// Uniform random source for elimination draws.
pub trait Entropy: Send {
    /// A sample in `[0, 1)`.
    fn sample(&mut self) -> f64;
}

/// [Entropy] backed by any [RngCore].
pub struct RngEntropy<R>(pub R);

impl<R: RngCore + Send> Entropy for RngEntropy<R> {
    fn sample(&mut self) -> f64 {
        rand::Rng::gen::<f64>(&mut self.0)
    }
}

/// Wall-clock timestamps for elimination records.
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0)
    }
}
