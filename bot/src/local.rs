//! A console-backed platform: one in-memory space whose messages are printed
//! to stdout.

use banroyale_engine::{Platform, PlatformError};
use banroyale_types::{ChannelId, Member, MemberId, MessageId, Role, RoleId, SpaceId};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Initial membership of the local space.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Fixture {
    /// Membership of the controlling account. Defaults to a bot account
    /// ranked above every fixture member.
    #[serde(default)]
    pub controller: Option<Member>,
    #[serde(default)]
    pub members: Vec<Member>,
}

const CONTROLLER_ID: u64 = 1_000_000;

struct Space {
    members: Vec<Member>,
    controller: Member,
    banned: BTreeSet<MemberId>,
    roles: Vec<Role>,
    next_id: u64,
}

impl Space {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn member_mut(&mut self, member: MemberId) -> Result<&mut Member, PlatformError> {
        self.members
            .iter_mut()
            .find(|m| m.id == member)
            .ok_or(PlatformError::NotFound)
    }
}

/// Space ids are ignored: there is exactly one space.
pub struct LocalPlatform {
    space: Mutex<Space>,
}

impl LocalPlatform {
    pub fn new(fixture: Fixture) -> Self {
        let controller = fixture.controller.unwrap_or_else(|| {
            let rank = fixture
                .members
                .iter()
                .map(Member::top_rank)
                .max()
                .unwrap_or(0)
                + 1;
            Member::new(CONTROLLER_ID, "banroyale").bot().with_role(Role {
                id: RoleId(CONTROLLER_ID),
                name: "Ban Royale".to_string(),
                rank,
            })
        });
        Self {
            space: Mutex::new(Space {
                members: fixture.members,
                controller,
                banned: BTreeSet::new(),
                roles: Vec::new(),
                next_id: 2 * CONTROLLER_ID,
            }),
        }
    }

    fn space(&self) -> MutexGuard<'_, Space> {
        self.space.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn member(&self, member: MemberId) -> Option<Member> {
        self.space().members.iter().find(|m| m.id == member).cloned()
    }

    pub fn join(&self, member: Member) {
        println!("* {} joined", member.shown_name());
        let mut space = self.space();
        space.members.retain(|m| m.id != member.id);
        space.members.push(member);
    }

    pub fn leave(&self, member: MemberId) {
        self.space().members.retain(|m| m.id != member);
    }
}

impl Platform for LocalPlatform {
    async fn members(&self, _space: SpaceId) -> Result<Vec<Member>, PlatformError> {
        Ok(self.space().members.clone())
    }

    async fn controller(&self, _space: SpaceId) -> Result<Option<Member>, PlatformError> {
        Ok(Some(self.space().controller.clone()))
    }

    async fn eliminate(
        &self,
        _space: SpaceId,
        member: MemberId,
        reason: &str,
    ) -> Result<(), PlatformError> {
        {
            let mut space = self.space();
            let before = space.members.len();
            space.members.retain(|m| m.id != member);
            if space.members.len() == before {
                return Err(PlatformError::NotFound);
            }
            space.banned.insert(member);
        }
        println!("* {member} was removed ({reason})");
        Ok(())
    }

    async fn reverse(
        &self,
        _space: SpaceId,
        member: MemberId,
        reason: &str,
    ) -> Result<(), PlatformError> {
        if !self.space().banned.remove(&member) {
            return Err(PlatformError::NotFound);
        }
        println!("* {member} was restored ({reason})");
        Ok(())
    }

    async fn find_role(&self, _space: SpaceId, name: &str) -> Result<Option<Role>, PlatformError> {
        Ok(self.space().roles.iter().find(|r| r.name == name).cloned())
    }

    async fn create_role(
        &self,
        _space: SpaceId,
        name: &str,
        _reason: &str,
    ) -> Result<Role, PlatformError> {
        let mut space = self.space();
        let role = Role {
            id: RoleId(space.next_id()),
            name: name.to_string(),
            rank: 0,
        };
        space.roles.push(role.clone());
        Ok(role)
    }

    async fn delete_role(
        &self,
        _space: SpaceId,
        role: RoleId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        let mut space = self.space();
        let before = space.roles.len();
        space.roles.retain(|r| r.id != role);
        if space.roles.len() == before {
            return Err(PlatformError::NotFound);
        }
        for member in &mut space.members {
            member.roles.retain(|r| r.id != role);
        }
        Ok(())
    }

    async fn grant_role(
        &self,
        _space: SpaceId,
        member: MemberId,
        role: RoleId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        let mut space = self.space();
        let role = space
            .roles
            .iter()
            .find(|r| r.id == role)
            .cloned()
            .ok_or(PlatformError::NotFound)?;
        let member = space.member_mut(member)?;
        if !member.has_role(role.id) {
            member.roles.push(role);
        }
        Ok(())
    }

    async fn revoke_role(
        &self,
        _space: SpaceId,
        member: MemberId,
        role: RoleId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.space()
            .member_mut(member)?
            .roles
            .retain(|r| r.id != role);
        Ok(())
    }

    async fn post(&self, channel: ChannelId, text: &str) -> Result<MessageId, PlatformError> {
        let id = MessageId(self.space().next_id());
        println!("[#{channel}] {text}");
        Ok(id)
    }

    async fn edit(
        &self,
        channel: ChannelId,
        message: MessageId,
        text: &str,
    ) -> Result<(), PlatformError> {
        println!("[#{channel} ~{message}] {text}");
        Ok(())
    }

    async fn notify(&self, member: MemberId, text: &str) -> Result<(), PlatformError> {
        println!("[dm @{member}] {text}");
        Ok(())
    }
}
