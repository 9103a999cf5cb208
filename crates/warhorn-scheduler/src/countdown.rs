//! Per-channel countdown timers (world-boss style).
//!
//! A countdown occupies its channel's slot in the [`TimerRegistry`]; starting
//! another one for the same channel soft-cancels the first. The loop ticks
//! once per second, updating a live countdown message, until expiry (fires
//! the configured alert) or cancellation (fires a stop notice).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use warhorn_core::Messenger;
use warhorn_core::types::{ChannelId, OutboundMessage, timestamp_markup};

use crate::registry::{CountdownEntry, TimerRegistry};

/// A countdown timer bound to one channel.
pub struct Countdown {
    registry: Arc<Mutex<TimerRegistry>>,
    messenger: Arc<dyn Messenger>,
    channel: ChannelId,
    alert: String,
}

impl Countdown {
    pub fn new(
        registry: Arc<Mutex<TimerRegistry>>,
        messenger: Arc<dyn Messenger>,
        channel: ChannelId,
        alert: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            messenger,
            channel,
            alert: alert.into(),
        }
    }

    /// Install the registry entry (superseding any live timer for this
    /// channel) and spawn the ticking loop.
    pub fn start(self, duration: Duration) -> JoinHandle<()> {
        let ends_at =
            Utc::now() + chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
        let entry = self
            .registry
            .lock()
            .expect("registry lock")
            .install(self.channel, ends_at);
        tokio::spawn(self.run(entry, duration))
    }

    async fn run(self, entry: CountdownEntry, duration: Duration) {
        let end = Instant::now() + duration;
        let ends_markup = timestamp_markup(entry.ends_at().timestamp());
        let mins = duration.as_secs().div_ceil(60);

        // Live countdown message; the timer still runs if this send fails.
        let display = self
            .messenger
            .send(
                self.channel,
                OutboundMessage::text(format!(
                    "⏱ Timer started. Starts in {mins} minutes. Ends at {ends_markup}"
                )),
            )
            .await
            .ok();

        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            if entry.cancelled() {
                tracing::info!("countdown for channel {} cancelled", self.channel);
                let notice = OutboundMessage::text("⏹ Timer stopped.");
                if let Err(e) = self.messenger.send(self.channel, notice).await {
                    tracing::warn!("countdown stop notice failed: {e}");
                }
                break;
            }

            let remaining = end.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::info!("countdown for channel {} expired", self.channel);
                let alert = OutboundMessage::text(self.alert.as_str());
                if let Err(e) = self.messenger.send(self.channel, alert).await {
                    tracing::warn!("countdown alert failed: {e}");
                }
                break;
            }

            if let Some(message_id) = display {
                let secs = remaining.as_secs();
                let text = format!(
                    "⏱ {}m {}s remaining. Ends at {ends_markup}",
                    secs / 60,
                    secs % 60
                );
                let _ = self
                    .messenger
                    .edit(self.channel, message_id, OutboundMessage::text(text))
                    .await;
            }
        }

        self.registry
            .lock()
            .expect("registry lock")
            .remove_if(self.channel, entry.epoch());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::RecordingMessenger;

    const ALERT: &str = "World Boss Started! Prepare your gear.";

    fn countdown(
        registry: &Arc<Mutex<TimerRegistry>>,
        messenger: &Arc<RecordingMessenger>,
        channel: ChannelId,
    ) -> Countdown {
        Countdown::new(registry.clone(), messenger.clone(), channel, ALERT)
    }

    #[tokio::test(start_paused = true)]
    async fn test_natural_expiry_fires_alert() {
        let registry = Arc::new(Mutex::new(TimerRegistry::new()));
        let messenger = Arc::new(RecordingMessenger::default());

        countdown(&registry, &messenger, 7)
            .start(Duration::from_secs(3))
            .await
            .expect("task");

        let contents = messenger.sent_contents();
        // Initial display message plus the expiry alert, no stop notice.
        assert_eq!(contents.len(), 2);
        assert!(contents[0].starts_with("⏱ Timer started"));
        assert_eq!(contents[1], ALERT);
        assert!(registry.lock().expect("lock").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_supersede_cancels_first_timer() {
        let registry = Arc::new(Mutex::new(TimerRegistry::new()));
        let messenger = Arc::new(RecordingMessenger::default());

        let first = countdown(&registry, &messenger, 7).start(Duration::from_secs(5));
        let second = countdown(&registry, &messenger, 7).start(Duration::from_secs(10));

        first.await.expect("first task");
        second.await.expect("second task");

        let contents = messenger.sent_contents();
        let stops = contents.iter().filter(|c| c.contains("stopped")).count();
        let alerts = contents.iter().filter(|c| *c == ALERT).count();
        // The superseded timer stops without alerting; only the replacement
        // fires the alert.
        assert_eq!(stops, 1);
        assert_eq!(alerts, 1);
        assert!(registry.lock().expect("lock").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_cancel_stops_timer() {
        let registry = Arc::new(Mutex::new(TimerRegistry::new()));
        let messenger = Arc::new(RecordingMessenger::default());

        let handle = countdown(&registry, &messenger, 7).start(Duration::from_secs(3600));
        assert!(registry.lock().expect("lock").cancel(7));
        handle.await.expect("task");

        let contents = messenger.sent_contents();
        assert!(contents.iter().any(|c| c.contains("stopped")));
        assert!(!contents.iter().any(|c| c == ALERT));
        assert!(registry.lock().expect("lock").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_update_display() {
        let registry = Arc::new(Mutex::new(TimerRegistry::new()));
        let messenger = Arc::new(RecordingMessenger::default());

        countdown(&registry, &messenger, 7)
            .start(Duration::from_secs(3))
            .await
            .expect("task");

        let edits = messenger.edits.lock().expect("lock");
        assert!(!edits.is_empty());
        assert!(edits[0].2.content.contains("remaining"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_runs_even_if_display_send_fails() {
        let registry = Arc::new(Mutex::new(TimerRegistry::new()));
        let messenger = Arc::new(RecordingMessenger::failing());

        countdown(&registry, &messenger, 7)
            .start(Duration::from_secs(2))
            .await
            .expect("task");

        // Every send failed, but the loop still ran to expiry and cleaned up.
        assert_eq!(messenger.send_count(), 0);
        assert!(registry.lock().expect("lock").is_empty());
    }
}
