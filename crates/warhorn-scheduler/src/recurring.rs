//! The recurring broadcast cycle.
//!
//! Computes the next configured local-time hour, sleeps until it, sends the
//! fixed message, and loops forever. Every failure is swallowed behind a
//! short fixed backoff so a transient send error can never kill the cycle.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::task::JoinHandle;

use warhorn_core::Messenger;
use warhorn_core::error::{Result, WarhornError};
use warhorn_core::types::{ChannelId, OutboundMessage};

use crate::timeparse::next_recurring;

/// Backoff after a failed fire, to avoid a tight failure loop.
const FAILURE_BACKOFF: Duration = Duration::from_secs(5);

/// Always-on daily broadcast at fixed local hours.
pub struct RecurringCycle {
    messenger: Arc<dyn Messenger>,
    channel: ChannelId,
    tz: Tz,
    hours: Vec<u32>,
    message: String,
}

impl RecurringCycle {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        channel: ChannelId,
        tz: Tz,
        hours: Vec<u32>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            messenger,
            channel,
            tz,
            hours,
            message: message.into(),
        }
    }

    /// Next occurrence strictly after `now`.
    pub fn next_occurrence(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        next_recurring(now, self.tz, &self.hours)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        tracing::info!(
            "recurring cycle started: hours {:?} ({}) -> channel {}",
            self.hours,
            self.tz,
            self.channel
        );
        loop {
            let now = Utc::now();
            let next = self.next_occurrence(now);
            let delay = (next - now)
                .to_std()
                .unwrap_or(Duration::from_secs(1))
                .max(Duration::from_secs(1));
            tokio::time::sleep(delay).await;

            if let Err(e) = self.fire().await {
                tracing::warn!("recurring broadcast failed: {e}");
                tokio::time::sleep(FAILURE_BACKOFF).await;
            }
        }
    }

    async fn fire(&self) -> Result<()> {
        let channel = self
            .messenger
            .resolve_channel(self.channel)
            .await
            .ok_or_else(|| WarhornError::ChannelNotFound(self.channel.to_string()))?;
        self.messenger
            .send(channel.id, OutboundMessage::text(self.message.as_str()))
            .await?;
        Ok(())
    }
}
