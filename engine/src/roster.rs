//! Participant Roster Resolver.
//!
//! A member is a participant unless it is a platform account, holds the
//! controller role, or sits at or above the controlling account's own rank.
//! Everything here is a pure function of membership and records.

use banroyale_types::{Member, MemberId, RoleId, SpaceDocument};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Roster {
    controller_role: RoleId,
    controller_rank: u32,
}

impl Roster {
    pub fn new(controller_role: RoleId, controller_rank: u32) -> Self {
        Self {
            controller_role,
            controller_rank,
        }
    }

    /// Build from the controlling account's own membership. Without one, no
    /// member has a rank below it and the roster is empty.
    pub fn for_controller(controller_role: RoleId, controller: Option<&Member>) -> Self {
        Self::new(controller_role, controller.map_or(0, Member::top_rank))
    }

    pub fn is_participant(&self, member: &Member) -> bool {
        !member.is_bot
            && !member.has_role(self.controller_role)
            && member.top_rank() < self.controller_rank
    }

    pub fn effective<'a>(&self, members: &'a [Member]) -> Vec<&'a Member> {
        members.iter().filter(|m| self.is_participant(m)).collect()
    }

    pub fn effective_ids(&self, members: &[Member]) -> Vec<MemberId> {
        self.effective(members).into_iter().map(|m| m.id).collect()
    }

    pub fn effective_count(&self, members: &[Member]) -> usize {
        members.iter().filter(|m| self.is_participant(m)).count()
    }

    /// Participants still present plus eliminated members who have left the
    /// space. This is the denominator for decay and progress.
    pub fn game_size(&self, members: &[Member], records: &SpaceDocument) -> usize {
        let departed = records
            .records()
            .filter(|(id, _)| !members.iter().any(|m| m.id == **id))
            .count();
        self.effective_count(members) + departed
    }

    /// Participants without an elimination record, in membership order.
    pub fn remaining<'a>(&self, members: &'a [Member], records: &SpaceDocument) -> Vec<&'a Member> {
        members
            .iter()
            .filter(|m| self.is_participant(m) && !records.contains(m.id))
            .collect()
    }
}
