//! Enable countdown.
//!
//! One announcement is posted and then edited in place; every step waits its
//! full delay before the next one is shown.

use banroyale_types::ChannelId;
use std::time::Duration;
use tracing::warn;

use crate::platform::Platform;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountdownStep {
    pub text: String,
    /// Wait after showing this step, before the next one.
    pub hold: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Countdown {
    steps: Vec<CountdownStep>,
}

impl Default for Countdown {
    fn default() -> Self {
        let mut steps = vec![
            CountdownStep {
                text: "🚀 Ban Royale starting in 10 seconds! 🚀".to_string(),
                hold: Duration::from_secs(5),
            },
            CountdownStep {
                text: "⏰ Starting in 5 seconds! ⏰".to_string(),
                hold: Duration::from_secs(1),
            },
        ];
        for n in (1..=4).rev() {
            steps.push(CountdownStep {
                text: format!("⏰ {n} ⏰"),
                hold: Duration::from_secs(1),
            });
        }
        steps.push(CountdownStep {
            text: "🔥 GO! Ban Royale is live! 🔥".to_string(),
            hold: Duration::ZERO,
        });
        Self { steps }
    }
}

impl Countdown {
    pub fn new(steps: Vec<CountdownStep>) -> Self {
        Self { steps }
    }

    /// No announcements and no waiting.
    pub fn silent() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn steps(&self) -> &[CountdownStep] {
        &self.steps
    }

    /// Total time spent waiting.
    pub fn duration(&self) -> Duration {
        self.steps.iter().map(|step| step.hold).sum()
    }

    /// Show every step in order. Announcement failures are logged and the
    /// timing is kept regardless.
    pub async fn run<P: Platform>(&self, platform: &P, channel: ChannelId) {
        let mut message = None;
        for step in &self.steps {
            match message {
                None => match platform.post(channel, &step.text).await {
                    Ok(id) => message = Some(id),
                    Err(e) => warn!(%channel, error = %e, "failed to post countdown"),
                },
                Some(id) => {
                    if let Err(e) = platform.edit(channel, id, &step.text).await {
                        warn!(%channel, error = %e, "failed to update countdown");
                    }
                }
            }
            if !step.hold.is_zero() {
                tokio::time::sleep(step.hold).await;
            }
        }
    }
}
