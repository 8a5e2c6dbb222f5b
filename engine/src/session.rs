//! Game Session.
//!
//! Per-space state machine: `Disabled -> Enabling -> Enabled -> Disabled`.
//!
//! Every space owns three async locks, always taken in this order:
//!
//! - `lifecycle` serializes enable, disable, reset, mass reversal and end game.
//!   It is held across the whole enable countdown, so a disable received
//!   mid-countdown is applied after the flip to `Enabled`.
//! - `attempts` serializes elimination attempts, including the platform call
//!   with its retries and the configured delay after a successful one. Reset,
//!   mass reversal and end game take it too, so records never change under a
//!   running attempt.
//! - `state` guards the in-memory session state. It is only held for short
//!   reads and writes, never across a platform call or a sleep.

use banroyale_types::{
    ChannelId, EliminationRecord, GameSettings, Member, MemberId, SpaceDocument, SpaceId,
};
use rand::{rngs::StdRng, SeedableRng};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::backoff::progressive_backoff;
use crate::chance::{self, CheckpointReached};
use crate::countdown::Countdown;
use crate::error::{GameError, TargetError};
use crate::platform::{Clock, Entropy, Platform, PlatformError, RngEntropy, SystemClock};
use crate::reversal::{MassReversal, ReversalConfig, ReversalReport};
use crate::roster::Roster;
use crate::spectator;
use crate::store::RecordStore;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Disabled,
    /// Countdown running; attempts are rejected.
    Enabling,
    Enabled,
}

#[derive(Default)]
struct SpaceState {
    phase: Phase,
    session_counts: HashMap<MemberId, u32>,
    initial_participants: Option<HashSet<MemberId>>,
    spectators: HashSet<MemberId>,
}

#[derive(Default)]
struct SpaceSlot {
    lifecycle: AsyncMutex<()>,
    attempts: AsyncMutex<()>,
    state: AsyncMutex<SpaceState>,
}

/// How a game ended.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEnd {
    Victory { winner: Member, effective: usize },
    TotalElimination { effective: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub enum WinCheck {
    Continue { remaining: usize },
    Ended(GameEnd),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Elimination {
    pub target: Member,
    pub session_count: u32,
    pub chance: f64,
    pub checkpoints: Vec<CheckpointReached>,
    pub game_end: Option<GameEnd>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Attempt {
    Eliminated(Elimination),
    Missed { target: Member, chance: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Enabled {
    pub participants: usize,
}

/// Runtime settings changes. Chances are given in percent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SettingsChange {
    EliminationChance(f64),
    EliminationDelay(f64),
    ToggleDecay,
    DecayMin(f64),
    DecayMax(f64),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SettingsApplied {
    EliminationChance(f64),
    EliminationDelay(f64),
    DecayMode {
        enabled: bool,
        /// Effective participants, reported when decay is switched on.
        effective: Option<usize>,
    },
    DecayMin(f64),
    DecayMax(f64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusTier {
    WinnerDetermined,
    TotalElimination,
    FinalShowdown,
    GettingIntense,
    InProgress,
}

impl StatusTier {
    pub fn for_remaining(remaining: usize) -> Self {
        match remaining {
            0 => Self::TotalElimination,
            1 => Self::WinnerDetermined,
            2..=5 => Self::FinalShowdown,
            6..=10 => Self::GettingIntense,
            _ => Self::InProgress,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GameStatus {
    pub phase: Phase,
    pub effective: usize,
    pub eliminated: usize,
    pub remaining: usize,
    pub chance: f64,
    pub checkpoints: BTreeSet<u8>,
    pub settings: GameSettings,
}

impl GameStatus {
    pub fn tier(&self) -> StatusTier {
        StatusTier::for_remaining(self.remaining)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndGameSummary {
    pub effective: usize,
    pub eliminated: usize,
    pub remaining: usize,
    pub reversal: ReversalReport,
    pub was_enabled: bool,
    pub decay_reset: bool,
    pub spectators_cleared: usize,
}

/// Live membership joined with stored records.
struct Snapshot {
    roster: Roster,
    members: Vec<Member>,
    records: SpaceDocument,
}

impl Snapshot {
    /// Participants of the game, present or eliminated.
    fn effective(&self) -> usize {
        self.roster.game_size(&self.members, &self.records)
    }

    fn remaining(&self) -> usize {
        self.roster.remaining(&self.members, &self.records).len()
    }

    fn win_check(&self) -> WinCheck {
        let remaining = self.roster.remaining(&self.members, &self.records);
        let effective = self.effective();
        match remaining.as_slice() {
            [] => WinCheck::Ended(GameEnd::TotalElimination { effective }),
            [winner] => WinCheck::Ended(GameEnd::Victory {
                winner: (*winner).clone(),
                effective,
            }),
            rest => WinCheck::Continue {
                remaining: rest.len(),
            },
        }
    }
}

pub struct GameSession<P: Platform> {
    platform: Arc<P>,
    store: Arc<RecordStore>,
    settings: RwLock<GameSettings>,
    spaces: Mutex<HashMap<SpaceId, Arc<SpaceSlot>>>,
    entropy: Mutex<Box<dyn Entropy>>,
    clock: Box<dyn Clock>,
    countdown: Countdown,
    reversal: ReversalConfig,
}

impl<P: Platform> GameSession<P> {
    pub fn new(platform: Arc<P>, store: Arc<RecordStore>, settings: GameSettings) -> Self {
        Self {
            platform,
            store,
            settings: RwLock::new(settings),
            spaces: Mutex::new(HashMap::new()),
            entropy: Mutex::new(Box::new(RngEntropy(StdRng::from_entropy()))),
            clock: Box::new(SystemClock),
            countdown: Countdown::default(),
            reversal: ReversalConfig::default(),
        }
    }

    pub fn with_entropy(mut self, entropy: impl Entropy + 'static) -> Self {
        self.entropy = Mutex::new(Box::new(entropy));
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_countdown(mut self, countdown: Countdown) -> Self {
        self.countdown = countdown;
        self
    }

    /// Pacing for mass reversals. The backoff also paces elimination retries.
    pub fn with_reversal(mut self, reversal: ReversalConfig) -> Self {
        self.reversal = reversal;
        self
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> GameSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_controller(&self, member: &Member) -> bool {
        member.has_role(self.settings().controller_role())
    }

    fn require_controller(&self, actor: &Member) -> Result<(), GameError> {
        if self.is_controller(actor) {
            Ok(())
        } else {
            Err(GameError::PermissionDenied)
        }
    }

    fn slot(&self, space: SpaceId) -> Arc<SpaceSlot> {
        let mut spaces = self.spaces.lock().unwrap_or_else(PoisonError::into_inner);
        spaces.entry(space).or_default().clone()
    }

    fn draw(&self) -> f64 {
        self.entropy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sample()
    }

    async fn roster(&self, space: SpaceId, settings: &GameSettings) -> Result<Roster, GameError> {
        let controller = self.platform.controller(space).await?;
        Ok(Roster::for_controller(
            settings.controller_role(),
            controller.as_ref(),
        ))
    }

    async fn snapshot(&self, space: SpaceId, settings: &GameSettings) -> Result<Snapshot, GameError> {
        let roster = self.roster(space, settings).await?;
        let members = self.platform.members(space).await?;
        let records = self.store.load(space)?;
        Ok(Snapshot {
            roster,
            members,
            records,
        })
    }

    async fn announce(&self, channel: ChannelId, text: &str) {
        if let Err(e) = self.platform.post(channel, text).await {
            warn!(%channel, error = %e, "failed to post announcement");
        }
    }

    pub async fn phase(&self, space: SpaceId) -> Phase {
        self.slot(space).state.lock().await.phase
    }

    /// Run the countdown, then capture the roster and open the session.
    pub async fn enable(&self, space: SpaceId, actor: &Member) -> Result<Enabled, GameError> {
        self.require_controller(actor)?;
        let slot = self.slot(space);
        if slot.state.lock().await.phase != Phase::Disabled {
            return Err(GameError::AlreadyEnabled);
        }

        let _lifecycle = slot.lifecycle.lock().await;
        {
            let mut state = slot.state.lock().await;
            if state.phase != Phase::Disabled {
                return Err(GameError::AlreadyEnabled);
            }
            state.phase = Phase::Enabling;
        }
        info!(%space, actor = %actor.id, "enable countdown started");

        let settings = self.settings();
        self.countdown
            .run(self.platform.as_ref(), settings.elimination_channel())
            .await;

        let captured = match self.roster(space, &settings).await {
            Ok(roster) => self
                .platform
                .members(space)
                .await
                .map(|members| roster.effective_ids(&members))
                .map_err(GameError::from),
            Err(e) => Err(e),
        };

        let mut state = slot.state.lock().await;
        let initial: HashSet<MemberId> = match captured {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                state.phase = Phase::Disabled;
                warn!(%space, error = %e, "failed to capture participants, enable aborted");
                return Err(e);
            }
        };
        let participants = initial.len();
        state.phase = Phase::Enabled;
        state.session_counts.clear();
        state.spectators.clear();
        state.initial_participants = Some(initial);
        info!(%space, actor = %actor.id, participants, "game enabled");
        Ok(Enabled { participants })
    }

    pub async fn disable(&self, space: SpaceId, actor: &Member) -> Result<(), GameError> {
        self.require_controller(actor)?;
        let slot = self.slot(space);
        let _lifecycle = slot.lifecycle.lock().await;
        let mut state = slot.state.lock().await;
        if state.phase != Phase::Enabled {
            return Err(GameError::AlreadyDisabled);
        }
        state.phase = Phase::Disabled;
        info!(%space, actor = %actor.id, "game disabled");
        Ok(())
    }

    /// Try to eliminate `target` on behalf of `actor`.
    ///
    /// Attempts in one space are serialized. After a hit that does not end the
    /// game further attempts in the space wait out the configured elimination
    /// delay; queries and joins are not held up.
    pub async fn attempt_elimination(
        &self,
        space: SpaceId,
        actor: &Member,
        target: Option<&Member>,
    ) -> Result<Attempt, GameError> {
        let slot = self.slot(space);
        let _attempt = slot.attempts.lock().await;
        let settings = self.settings();
        let target = {
            let state = slot.state.lock().await;
            if state.phase != Phase::Enabled {
                return Err(GameError::GameDisabled);
            }
            let target = target.ok_or(TargetError::Missing)?;
            if target.id == actor.id {
                return Err(TargetError::SelfTarget.into());
            }
            // Actors without a ranked role may target anyone.
            let actor_rank = actor.top_rank();
            if actor_rank > 0 && actor_rank <= target.top_rank() {
                return Err(TargetError::Outranked.into());
            }
            if actor.has_role_named(settings.spectator_role())
                || state.spectators.contains(&actor.id)
            {
                return Err(GameError::SpectatorForbidden);
            }
            target
        };

        let mut snapshot = self.snapshot(space, &settings).await?;
        let effective = snapshot.effective();
        let chance = chance::current_chance(&settings, effective, snapshot.records.eliminated_count());
        let sample = self.draw();
        if sample >= chance {
            debug!(%space, actor = %actor.id, target = %target.id, chance, sample, "elimination missed");
            return Ok(Attempt::Missed {
                target: target.clone(),
                chance,
            });
        }

        let reason = format!("Ban Royale: eliminated by {}", actor.name);
        self.eliminate_with_retry(space, target.id, &reason).await?;
        let record = EliminationRecord {
            display_name: target.shown_name().to_string(),
            eliminated_by: actor.name.clone(),
            eliminated_at: self.clock.now_unix(),
            reason,
        };
        self.store.save(space, target.id, record.clone())?;
        snapshot.records.insert(target.id, record);

        let session_count = {
            let mut state = slot.state.lock().await;
            let count = state.session_counts.entry(actor.id).or_default();
            *count += 1;
            *count
        };
        info!(
            %space,
            actor = %actor.id,
            target = %target.id,
            chance,
            session_count,
            "participant eliminated"
        );
        let text = format!(
            "{} eliminated {}! ({session_count})",
            actor.shown_name(),
            target.shown_name()
        );
        self.announce(settings.elimination_channel(), &text).await;
        self.announce(settings.log_channel(), &text).await;

        let checkpoints = if settings.decay_mode() {
            self.log_checkpoints(space, &settings, &snapshot).await?
        } else {
            Vec::new()
        };

        let game_end = match snapshot.win_check() {
            WinCheck::Ended(end) => {
                self.finish(space, &slot, &settings, &end).await;
                Some(end)
            }
            WinCheck::Continue { .. } => {
                let delay = settings.elimination_delay();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                None
            }
        };

        Ok(Attempt::Eliminated(Elimination {
            target: target.clone(),
            session_count,
            chance,
            checkpoints,
            game_end,
        }))
    }

    async fn eliminate_with_retry(
        &self,
        space: SpaceId,
        target: MemberId,
        reason: &str,
    ) -> Result<(), GameError> {
        let max_attempts = self.reversal.max_attempts;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.platform.eliminate(space, target, reason).await {
                Ok(()) => return Ok(()),
                Err(PlatformError::RateLimited) if attempt < max_attempts => {
                    let wait = progressive_backoff(
                        attempt,
                        self.reversal.backoff_step,
                        self.reversal.backoff_cap,
                    );
                    warn!(%space, %target, attempt, ?wait, "rate limited, retrying elimination");
                    tokio::time::sleep(wait).await;
                }
                Err(PlatformError::RateLimited) => {
                    return Err(GameError::ExternalRateLimited { attempts: attempt })
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn log_checkpoints(
        &self,
        space: SpaceId,
        settings: &GameSettings,
        snapshot: &Snapshot,
    ) -> Result<Vec<CheckpointReached>, GameError> {
        let effective = snapshot.effective();
        let eliminated = snapshot.records.eliminated_count();
        let pending =
            chance::pending_checkpoints(effective, eliminated, snapshot.records.checkpoints());
        let mut reached = Vec::with_capacity(pending.len());
        for threshold in pending {
            if !self.store.add_checkpoint(space, threshold)? {
                continue;
            }
            let event = CheckpointReached {
                threshold,
                progress_pct: chance::progress_pct(effective, eliminated),
                eliminated,
                effective,
                chance: chance::current_chance(settings, effective, eliminated),
            };
            info!(%space, threshold, progress = event.progress_pct, chance = event.chance, "checkpoint reached");
            let text = format!(
                "📊 Decay checkpoint {threshold}% reached! Progress: {eliminated}/{effective} eliminated ({:.1}%). Current chance: {:.1}%",
                event.progress_pct,
                event.chance * 100.0
            );
            self.announce(settings.log_channel(), &text).await;
            reached.push(event);
        }
        Ok(reached)
    }

    /// Close the session after a win. Records and counts are kept until an
    /// explicit reset. Returns false if the session was already closed.
    async fn finish(
        &self,
        space: SpaceId,
        slot: &SpaceSlot,
        settings: &GameSettings,
        end: &GameEnd,
    ) -> bool {
        {
            let mut state = slot.state.lock().await;
            if state.phase != Phase::Enabled {
                return false;
            }
            state.phase = Phase::Disabled;
        }
        let text = match end {
            GameEnd::Victory { winner, effective } => {
                info!(%space, winner = %winner.id, effective, "game won");
                format!(
                    "🏆 Game over! {} is the champion, the last of {effective} participants standing. \
                     Ban Royale has been disabled. Use !endgame to reverse all eliminations and reset.",
                    winner.shown_name()
                )
            }
            GameEnd::TotalElimination { effective } => {
                info!(%space, effective, "game ended with total elimination");
                format!(
                    "🏁 Game over! All {effective} participants have been eliminated. \
                     Ban Royale has been disabled. Use !endgame to reverse all eliminations and reset."
                )
            }
        };
        self.announce(settings.elimination_channel(), &text).await;
        self.announce(settings.log_channel(), &text).await;
        true
    }

    /// Evaluate the win condition now, ending the game if at most one
    /// participant remains.
    pub async fn check_win_condition(&self, space: SpaceId) -> Result<WinCheck, GameError> {
        let slot = self.slot(space);
        if slot.state.lock().await.phase != Phase::Enabled {
            return Err(GameError::GameDisabled);
        }
        let settings = self.settings();
        let check = self.snapshot(space, &settings).await?.win_check();
        if let WinCheck::Ended(end) = &check {
            self.finish(space, &slot, &settings, end).await;
        }
        Ok(check)
    }

    fn reset_locked(&self, space: SpaceId, state: &mut SpaceState) -> Result<bool, GameError> {
        let had_session = !state.session_counts.is_empty()
            || state.initial_participants.is_some()
            || !state.spectators.is_empty();
        state.session_counts.clear();
        state.initial_participants = None;
        state.spectators.clear();
        let had_records = self.store.reset(space)?;
        Ok(had_session || had_records)
    }

    /// Clear session counts, tracked participants, records and checkpoints.
    /// Returns false if there was nothing to clear.
    pub async fn reset_game_state(&self, space: SpaceId) -> Result<bool, GameError> {
        let slot = self.slot(space);
        let _lifecycle = slot.lifecycle.lock().await;
        let _attempts = slot.attempts.lock().await;
        let mut state = slot.state.lock().await;
        let cleared = self.reset_locked(space, &mut state)?;
        info!(%space, cleared, "game state reset");
        Ok(cleared)
    }

    pub async fn configure(
        &self,
        space: SpaceId,
        actor: &Member,
        change: SettingsChange,
    ) -> Result<SettingsApplied, GameError> {
        self.require_controller(actor)?;
        let applied = {
            let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
            match change {
                SettingsChange::EliminationChance(pct) => {
                    settings.set_elimination_chance(pct / 100.0)?;
                    SettingsApplied::EliminationChance(settings.elimination_chance())
                }
                SettingsChange::EliminationDelay(secs) => {
                    settings.set_elimination_delay_secs(secs)?;
                    SettingsApplied::EliminationDelay(settings.elimination_delay_secs())
                }
                SettingsChange::ToggleDecay => SettingsApplied::DecayMode {
                    enabled: settings.toggle_decay_mode(),
                    effective: None,
                },
                SettingsChange::DecayMin(pct) => {
                    settings.set_min_decay_chance(pct / 100.0)?;
                    SettingsApplied::DecayMin(settings.min_decay_chance())
                }
                SettingsChange::DecayMax(pct) => {
                    settings.set_max_decay_chance(pct / 100.0)?;
                    SettingsApplied::DecayMax(settings.max_decay_chance())
                }
            }
        };
        info!(%space, actor = %actor.id, ?applied, "settings changed");

        if let SettingsApplied::DecayMode { enabled: true, .. } = applied {
            let effective = self.effective_count(space).await?;
            return Ok(SettingsApplied::DecayMode {
                enabled: true,
                effective: Some(effective),
            });
        }
        Ok(applied)
    }

    pub async fn current_chance(&self, space: SpaceId) -> Result<f64, GameError> {
        let settings = self.settings();
        if !settings.decay_mode() {
            return Ok(chance::static_chance(&settings));
        }
        let snapshot = self.snapshot(space, &settings).await?;
        Ok(chance::decay_chance(
            &settings,
            snapshot.effective(),
            snapshot.records.eliminated_count(),
        ))
    }

    pub async fn effective_count(&self, space: SpaceId) -> Result<usize, GameError> {
        let settings = self.settings();
        let roster = self.roster(space, &settings).await?;
        let members = self.platform.members(space).await?;
        Ok(roster.effective_count(&members))
    }

    pub async fn remaining(&self, space: SpaceId) -> Result<Vec<Member>, GameError> {
        let snapshot = self.snapshot(space, &self.settings()).await?;
        Ok(snapshot
            .roster
            .remaining(&snapshot.members, &snapshot.records)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn load_records(&self, space: SpaceId) -> Result<SpaceDocument, GameError> {
        Ok(self.store.load(space)?)
    }

    pub async fn status(&self, space: SpaceId) -> Result<GameStatus, GameError> {
        let phase = self.phase(space).await;
        let settings = self.settings();
        let snapshot = self.snapshot(space, &settings).await?;
        let effective = snapshot.effective();
        let eliminated = snapshot.records.eliminated_count();
        Ok(GameStatus {
            phase,
            effective,
            eliminated,
            remaining: snapshot.remaining(),
            chance: chance::current_chance(&settings, effective, eliminated),
            checkpoints: snapshot.records.checkpoints().clone(),
            settings,
        })
    }

    /// Reverse every recorded elimination of the space, reporting progress to
    /// `progress` and a summary to the log channel.
    pub async fn unban_all(
        &self,
        space: SpaceId,
        actor: &Member,
        progress: ChannelId,
    ) -> Result<ReversalReport, GameError> {
        self.require_controller(actor)?;
        let slot = self.slot(space);
        let _lifecycle = slot.lifecycle.lock().await;
        let _attempts = slot.attempts.lock().await;
        let records = self.store.load(space)?;
        if records.eliminated_count() == 0 {
            return Err(GameError::NoRecords);
        }
        let reason = format!("Ban Royale: mass reversal by {}", actor.name);
        let report = MassReversal::new(self.platform.as_ref(), &self.store, &self.reversal)
            .run(space, &records, progress, &reason)
            .await?;
        let text = format!(
            "{} reversed all eliminations. Reversed: {}, Failed: {}",
            actor.shown_name(),
            report.reversed,
            report.failed
        );
        self.announce(self.settings().log_channel(), &text).await;
        Ok(report)
    }

    /// Disable, reverse every elimination, switch decay off, reset and remove
    /// the spectator role.
    pub async fn end_game(
        &self,
        space: SpaceId,
        actor: &Member,
        progress: ChannelId,
    ) -> Result<EndGameSummary, GameError> {
        self.require_controller(actor)?;
        let slot = self.slot(space);
        let _lifecycle = slot.lifecycle.lock().await;
        let _attempts = slot.attempts.lock().await;
        let settings = self.settings();
        let snapshot = self.snapshot(space, &settings).await?;
        let records = snapshot.records.clone();
        if records.eliminated_count() == 0 {
            return Err(GameError::NoRecords);
        }
        let effective = snapshot.effective();
        let remaining = snapshot.remaining();

        let was_enabled = {
            let mut state = slot.state.lock().await;
            let was_enabled = state.phase == Phase::Enabled;
            state.phase = Phase::Disabled;
            was_enabled
        };

        let reason = format!("Ban Royale: game ended by {}", actor.name);
        let reversal = MassReversal::new(self.platform.as_ref(), &self.store, &self.reversal)
            .run(space, &records, progress, &reason)
            .await?;

        let decay_reset = {
            let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
            let was_on = settings.decay_mode();
            settings.set_decay_mode(false);
            was_on
        };

        {
            let mut state = slot.state.lock().await;
            self.reset_locked(space, &mut state)?;
        }

        let spectator_role = self.settings().spectator_role().to_string();
        let spectators_cleared =
            match spectator::clear(self.platform.as_ref(), space, &spectator_role).await {
                Ok(cleared) => cleared,
                Err(e) => {
                    warn!(%space, error = %e, "failed to clear spectator role");
                    0
                }
            };

        let eliminated = records.eliminated_count();
        let mut text = format!(
            "🏁 GAME ENDED by {}\nFinal stats: {eliminated}/{effective} eliminated, {remaining} remained\nReversed: {}, Failed: {}\nBan Royale disabled",
            actor.shown_name(),
            reversal.reversed,
            reversal.failed
        );
        if decay_reset {
            text.push_str(", Decay mode reset");
        }
        self.announce(settings.log_channel(), &text).await;

        info!(
            %space,
            actor = %actor.id,
            reversed = reversal.reversed,
            failed = reversal.failed,
            "game ended"
        );
        Ok(EndGameSummary {
            effective,
            eliminated,
            remaining,
            reversal,
            was_enabled,
            decay_reset,
            spectators_cleared,
        })
    }

    /// Handle a member joining the space. Returns true if the member was
    /// marked as a spectator.
    pub async fn member_joined(&self, space: SpaceId, joiner: &Member) -> bool {
        let slot = self.slot(space);
        {
            let mut state = slot.state.lock().await;
            if state.phase != Phase::Enabled
                || !spectator::should_mark(
                    joiner,
                    state.initial_participants.as_ref(),
                    &state.spectators,
                )
            {
                return false;
            }
            state.spectators.insert(joiner.id);
        }
        let role = self.settings().spectator_role().to_string();
        spectator::mark(self.platform.as_ref(), space, joiner, &role).await;
        true
    }
}
