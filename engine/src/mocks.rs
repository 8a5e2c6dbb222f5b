//! In-memory collaborators for tests.

use banroyale_types::{ChannelId, Member, MemberId, MessageId, Role, RoleId, SpaceId};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::platform::{Clock, Entropy, Platform, PlatformError};

/// Rank of the controlling account in a fresh [MockPlatform].
pub const CONTROLLER_RANK: u32 = 100;

#[derive(Default)]
struct State {
    members: Vec<Member>,
    controller: Option<Member>,
    banned: BTreeSet<MemberId>,
    roles: Vec<Role>,
    next_id: u64,
    posts: Vec<(ChannelId, MessageId, String)>,
    edits: Vec<(ChannelId, MessageId, String)>,
    notices: Vec<(MemberId, String)>,
    eliminate_script: HashMap<MemberId, VecDeque<PlatformError>>,
    reverse_script: HashMap<MemberId, VecDeque<PlatformError>>,
    eliminate_calls: HashMap<MemberId, usize>,
    reverse_calls: HashMap<MemberId, usize>,
    fail_edits: bool,
    fail_grants: bool,
    post_failures: usize,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// A single space held in memory. Space ids are ignored.
///
/// Eliminating a member removes it from the membership and marks it banned;
/// reversing only clears the ban. Failures can be scripted per member and are
/// consumed before the default behaviour applies.
pub struct MockPlatform {
    state: Mutex<State>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlatform {
    pub fn new() -> Self {
        let controller = Member::new(1_000_000, "banroyale").bot().with_role(Role {
            id: RoleId(1_000_000),
            name: "Ban Royale".to_string(),
            rank: CONTROLLER_RANK,
        });
        Self {
            state: Mutex::new(State {
                controller: Some(controller),
                next_id: 2_000_000,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn with_members(self, members: impl IntoIterator<Item = Member>) -> Self {
        self.state().members.extend(members);
        self
    }

    pub fn add_member(&self, member: Member) {
        self.state().members.push(member);
    }

    pub fn remove_member(&self, member: MemberId) {
        self.state().members.retain(|m| m.id != member);
    }

    pub fn set_controller(&self, controller: Option<Member>) {
        self.state().controller = controller;
    }

    pub fn member(&self, member: MemberId) -> Option<Member> {
        self.state().members.iter().find(|m| m.id == member).cloned()
    }

    pub fn mark_banned(&self, member: MemberId) {
        self.state().banned.insert(member);
    }

    pub fn banned(&self) -> Vec<MemberId> {
        self.state().banned.iter().copied().collect()
    }

    pub fn script_eliminate(&self, member: MemberId, errors: Vec<PlatformError>) {
        self.state()
            .eliminate_script
            .entry(member)
            .or_default()
            .extend(errors);
    }

    pub fn script_reverse(&self, member: MemberId, errors: Vec<PlatformError>) {
        self.state()
            .reverse_script
            .entry(member)
            .or_default()
            .extend(errors);
    }

    pub fn eliminate_calls(&self, member: MemberId) -> usize {
        self.state().eliminate_calls.get(&member).copied().unwrap_or(0)
    }

    pub fn reverse_calls(&self, member: MemberId) -> usize {
        self.state().reverse_calls.get(&member).copied().unwrap_or(0)
    }

    pub fn fail_edits(&self, fail: bool) {
        self.state().fail_edits = fail;
    }

    /// Fail the next `count` posts.
    pub fn fail_next_posts(&self, count: usize) {
        self.state().post_failures = count;
    }

    pub fn fail_grants(&self, fail: bool) {
        self.state().fail_grants = fail;
    }

    pub fn posts_to(&self, channel: ChannelId) -> Vec<String> {
        self.state()
            .posts
            .iter()
            .filter(|(c, _, _)| *c == channel)
            .map(|(_, _, text)| text.clone())
            .collect()
    }

    pub fn edits_to(&self, channel: ChannelId) -> Vec<String> {
        self.state()
            .edits
            .iter()
            .filter(|(c, _, _)| *c == channel)
            .map(|(_, _, text)| text.clone())
            .collect()
    }

    pub fn notices_to(&self, member: MemberId) -> Vec<String> {
        self.state()
            .notices
            .iter()
            .filter(|(m, _)| *m == member)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

impl Platform for MockPlatform {
    async fn members(&self, _space: SpaceId) -> Result<Vec<Member>, PlatformError> {
        Ok(self.state().members.clone())
    }

    async fn controller(&self, _space: SpaceId) -> Result<Option<Member>, PlatformError> {
        Ok(self.state().controller.clone())
    }

    async fn eliminate(
        &self,
        _space: SpaceId,
        member: MemberId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        *state.eliminate_calls.entry(member).or_default() += 1;
        if let Some(err) = state
            .eliminate_script
            .get_mut(&member)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }
        let before = state.members.len();
        state.members.retain(|m| m.id != member);
        if state.members.len() == before {
            return Err(PlatformError::NotFound);
        }
        state.banned.insert(member);
        Ok(())
    }

    async fn reverse(
        &self,
        _space: SpaceId,
        member: MemberId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        *state.reverse_calls.entry(member).or_default() += 1;
        if let Some(err) = state
            .reverse_script
            .get_mut(&member)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }
        if state.banned.remove(&member) {
            Ok(())
        } else {
            Err(PlatformError::NotFound)
        }
    }

    async fn find_role(&self, _space: SpaceId, name: &str) -> Result<Option<Role>, PlatformError> {
        Ok(self.state().roles.iter().find(|r| r.name == name).cloned())
    }

    async fn create_role(
        &self,
        _space: SpaceId,
        name: &str,
        _reason: &str,
    ) -> Result<Role, PlatformError> {
        let mut state = self.state();
        let role = Role {
            id: RoleId(state.next_id()),
            name: name.to_string(),
            rank: 0,
        };
        state.roles.push(role.clone());
        Ok(role)
    }

    async fn delete_role(
        &self,
        _space: SpaceId,
        role: RoleId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        let before = state.roles.len();
        state.roles.retain(|r| r.id != role);
        if state.roles.len() == before {
            return Err(PlatformError::NotFound);
        }
        for member in &mut state.members {
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
        let mut state = self.state();
        if state.fail_grants {
            return Err(PlatformError::PermissionDenied);
        }
        let role = state
            .roles
            .iter()
            .find(|r| r.id == role)
            .cloned()
            .ok_or(PlatformError::NotFound)?;
        let member = state
            .members
            .iter_mut()
            .find(|m| m.id == member)
            .ok_or(PlatformError::NotFound)?;
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
        let mut state = self.state();
        let member = state
            .members
            .iter_mut()
            .find(|m| m.id == member)
            .ok_or(PlatformError::NotFound)?;
        member.roles.retain(|r| r.id != role);
        Ok(())
    }

    async fn post(&self, channel: ChannelId, text: &str) -> Result<MessageId, PlatformError> {
        let mut state = self.state();
        if state.post_failures > 0 {
            state.post_failures -= 1;
            return Err(PlatformError::Other("post failed".to_string()));
        }
        let id = MessageId(state.next_id());
        state.posts.push((channel, id, text.to_string()));
        Ok(id)
    }

    async fn edit(
        &self,
        channel: ChannelId,
        message: MessageId,
        text: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        if state.fail_edits {
            return Err(PlatformError::Other("edit failed".to_string()));
        }
        state.edits.push((channel, message, text.to_string()));
        Ok(())
    }

    async fn notify(&self, member: MemberId, text: &str) -> Result<(), PlatformError> {
        self.state().notices.push((member, text.to_string()));
        Ok(())
    }
}

/// Replays queued samples, then repeats a fallback forever.
pub struct FixedEntropy {
    queued: VecDeque<f64>,
    fallback: f64,
}

impl FixedEntropy {
    pub fn always(sample: f64) -> Self {
        Self {
            queued: VecDeque::new(),
            fallback: sample,
        }
    }

    pub fn sequence(samples: impl IntoIterator<Item = f64>, fallback: f64) -> Self {
        Self {
            queued: samples.into_iter().collect(),
            fallback,
        }
    }
}

impl Entropy for FixedEntropy {
    fn sample(&mut self) -> f64 {
        self.queued.pop_front().unwrap_or(self.fallback)
    }
}

pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_unix(&self) -> u64 {
        self.0
    }
}
