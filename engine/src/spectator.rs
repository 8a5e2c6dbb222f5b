//! Spectator Tracker.
//!
//! Members who join after a session started are marked with the spectator
//! role and barred from eliminating. Marking happens at most once per member
//! per session.

use banroyale_types::{Member, MemberId, Role, SpaceId};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::platform::{Platform, PlatformError};

const ROLE_REASON: &str = "Ban Royale: joined mid-game";

pub const SPECTATOR_NOTICE: &str = "You joined while a Ban Royale game is running. You are a \
     spectator for this round and cannot eliminate anyone until the next game starts.";

/// Whether a joining member should become a spectator.
pub fn should_mark(
    joiner: &Member,
    initial: Option<&HashSet<MemberId>>,
    marked: &HashSet<MemberId>,
) -> bool {
    if joiner.is_bot || marked.contains(&joiner.id) {
        return false;
    }
    initial.is_some_and(|initial| !initial.contains(&joiner.id))
}

/// Look up the spectator role by name, creating it when missing.
pub async fn spectator_role<P: Platform>(
    platform: &P,
    space: SpaceId,
    name: &str,
) -> Result<Role, PlatformError> {
    if let Some(role) = platform.find_role(space, name).await? {
        return Ok(role);
    }
    info!(%space, role = name, "creating spectator role");
    platform.create_role(space, name, "Ban Royale spectator role").await
}

/// Grant the spectator role and send the notice. Both are best-effort.
pub async fn mark<P: Platform>(platform: &P, space: SpaceId, joiner: &Member, role_name: &str) {
    match spectator_role(platform, space, role_name).await {
        Ok(role) => {
            if let Err(e) = platform.grant_role(space, joiner.id, role.id, ROLE_REASON).await {
                warn!(%space, member = %joiner.id, error = %e, "failed to grant spectator role");
            }
        }
        Err(e) => warn!(%space, error = %e, "spectator role unavailable"),
    }
    if let Err(e) = platform.notify(joiner.id, SPECTATOR_NOTICE).await {
        warn!(%space, member = %joiner.id, error = %e, "failed to send spectator notice");
    }
    info!(%space, member = %joiner.id, "marked spectator");
}

/// Remove the spectator role from every holder, then delete it. Returns how
/// many members held it.
pub async fn clear<P: Platform>(
    platform: &P,
    space: SpaceId,
    role_name: &str,
) -> Result<usize, PlatformError> {
    let Some(role) = platform.find_role(space, role_name).await? else {
        return Ok(0);
    };
    let holders: Vec<MemberId> = platform
        .members(space)
        .await?
        .into_iter()
        .filter(|m| m.has_role(role.id))
        .map(|m| m.id)
        .collect();
    for member in &holders {
        if let Err(e) = platform
            .revoke_role(space, *member, role.id, "Ban Royale: game ended")
            .await
        {
            warn!(%space, %member, error = %e, "failed to revoke spectator role");
        }
    }
    platform
        .delete_role(space, role.id, "Ban Royale: game ended")
        .await?;
    info!(%space, cleared = holders.len(), "spectator role removed");
    Ok(holders.len())
}
