//! Mass Reversal Workflow.
//!
//! Records are reversed strictly one after another with a fixed pause between
//! them. Rate limiting is retried with progressive backoff; any other failure
//! is counted and the workflow moves on. Only a record store failure aborts.

use banroyale_types::{ChannelId, MemberId, MessageId, SpaceDocument, SpaceId};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backoff::progressive_backoff;
use crate::platform::{Platform, PlatformError};
use crate::store::{RecordStore, StoreError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReversalConfig {
    /// Pause after every record, whatever its outcome.
    pub inter_op_delay: Duration,
    pub backoff_step: Duration,
    pub backoff_cap: Duration,
    pub max_attempts: u32,
}

impl Default for ReversalConfig {
    fn default() -> Self {
        Self {
            inter_op_delay: Duration::from_millis(1_500),
            backoff_step: Duration::from_secs(5),
            backoff_cap: Duration::from_secs(30),
            max_attempts: 3,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReversalReport {
    pub total: usize,
    pub reversed: usize,
    pub failed: usize,
}

/// How many records to process between progress updates.
pub fn progress_increment(total: usize) -> usize {
    match total {
        0..=10 => 1,
        11..=50 => 5,
        51..=100 => 10,
        101..=200 => 20,
        _ => (total / 10).max(25),
    }
}

fn should_notify(processed: usize, total: usize) -> bool {
    processed == total || processed % progress_increment(total) == 0
}

enum Outcome {
    Reversed,
    AlreadyReversed,
    Failed(PlatformError),
}

pub struct MassReversal<'a, P: Platform> {
    platform: &'a P,
    store: &'a RecordStore,
    config: &'a ReversalConfig,
}

impl<'a, P: Platform> MassReversal<'a, P> {
    pub fn new(platform: &'a P, store: &'a RecordStore, config: &'a ReversalConfig) -> Self {
        Self {
            platform,
            store,
            config,
        }
    }

    /// Reverse every record in `records`, reporting progress to `progress`.
    ///
    /// Reversed records (including ones the platform no longer knows about)
    /// are removed from the store; failed ones stay.
    pub async fn run(
        &self,
        space: SpaceId,
        records: &SpaceDocument,
        progress: ChannelId,
        reason: &str,
    ) -> Result<ReversalReport, StoreError> {
        let mut report = ReversalReport {
            total: records.eliminated_count(),
            ..Default::default()
        };
        info!(%space, total = report.total, "starting mass reversal");

        let opening = format!(
            "Reversing {total} eliminations... Progress: 0/{total} processed",
            total = report.total
        );
        let mut message = self.post_progress(space, progress, &opening).await;

        for (processed, (member, _)) in records.records().enumerate() {
            let processed = processed + 1;
            match self.reverse_one(space, *member, reason).await {
                Outcome::Reversed | Outcome::AlreadyReversed => {
                    self.store.remove(space, *member)?;
                    report.reversed += 1;
                }
                Outcome::Failed(e) => {
                    warn!(%space, %member, error = %e, "failed to reverse elimination");
                    report.failed += 1;
                }
            }

            tokio::time::sleep(self.config.inter_op_delay).await;

            if should_notify(processed, report.total) {
                debug!(%space, processed, total = report.total, "reversal progress");
                let text = format!(
                    "Progress: {processed}/{} processed... (Reversed: {}, Failed: {})",
                    report.total, report.reversed, report.failed
                );
                match message {
                    Some(id) => {
                        if let Err(e) = self.platform.edit(progress, id, &text).await {
                            warn!(%space, error = %e, "failed to update reversal progress");
                        }
                    }
                    // The opening post never landed; start over with this update.
                    None => message = self.post_progress(space, progress, &text).await,
                }
            }
        }

        info!(
            %space,
            reversed = report.reversed,
            failed = report.failed,
            "mass reversal complete"
        );
        Ok(report)
    }

    async fn post_progress(
        &self,
        space: SpaceId,
        progress: ChannelId,
        text: &str,
    ) -> Option<MessageId> {
        match self.platform.post(progress, text).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(%space, error = %e, "failed to post reversal progress");
                None
            }
        }
    }

    async fn reverse_one(&self, space: SpaceId, member: MemberId, reason: &str) -> Outcome {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.platform.reverse(space, member, reason).await {
                Ok(()) => return Outcome::Reversed,
                Err(PlatformError::NotFound) => {
                    debug!(%space, %member, "elimination already reversed");
                    return Outcome::AlreadyReversed;
                }
                Err(PlatformError::RateLimited) if attempt < self.config.max_attempts => {
                    let wait = progressive_backoff(
                        attempt,
                        self.config.backoff_step,
                        self.config.backoff_cap,
                    );
                    warn!(%space, %member, attempt, ?wait, "rate limited, retrying reversal");
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Outcome::Failed(e),
            }
        }
    }
}
