//! One-shot line-up announcements.
//!
//! Registered when a line-up's body text yields a resolvable instant. Fires
//! exactly once: immediately when the instant is already past, otherwise
//! after a deferred sleep. Delivery is best-effort; a failed send is logged
//! and not retried.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use warhorn_core::Messenger;
use warhorn_core::types::{ChannelId, MessageId, OutboundMessage, UserId, mention};
use warhorn_lineup::LineupLedger;

/// Members mentioned per message, to respect platform payload limits.
pub const MENTION_CHUNK: usize = 50;

/// Schedule the "event started" announcement for a tracked line-up.
///
/// The joined set is read from the ledger at fire time, not at registration,
/// so members who react after scheduling are still pinged.
pub fn schedule_announcement(
    ledger: Arc<Mutex<LineupLedger>>,
    messenger: Arc<dyn Messenger>,
    channel: ChannelId,
    message_id: MessageId,
    fire_at: DateTime<Utc>,
    label: impl Into<String>,
) -> JoinHandle<()> {
    let label = label.into();
    tokio::spawn(async move {
        let now = Utc::now();
        if fire_at > now {
            let delay = (fire_at - now).to_std().unwrap_or_default();
            tracing::debug!("one-shot '{label}' armed, fires in {}s", delay.as_secs());
            tokio::time::sleep(delay).await;
        }
        fire(&ledger, messenger.as_ref(), channel, message_id, &label).await;
    })
}

async fn fire(
    ledger: &Mutex<LineupLedger>,
    messenger: &dyn Messenger,
    channel: ChannelId,
    message_id: MessageId,
    label: &str,
) {
    let joined = ledger.lock().expect("ledger lock").joined(message_id);

    if joined.is_empty() {
        let content = format!("{label} has started! Prepare your gear.");
        if let Err(e) = messenger.send(channel, OutboundMessage::text(content)).await {
            tracing::warn!("one-shot '{label}' send failed: {e}");
        }
        return;
    }

    for batch in mention_batches(&joined) {
        let content = format!("{batch} prepare your gear, {label} has started!");
        if let Err(e) = messenger.send(channel, OutboundMessage::pinging(content)).await {
            tracing::warn!("one-shot '{label}' mention batch failed: {e}");
        }
    }
}

/// Join mention markup into batches of [`MENTION_CHUNK`] members.
pub fn mention_batches(ids: &[UserId]) -> Vec<String> {
    ids.chunks(MENTION_CHUNK)
        .map(|chunk| {
            chunk
                .iter()
                .map(|id| mention(*id))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::RecordingMessenger;

    use chrono::Duration;
    use warhorn_core::types::MentionPolicy;
    use warhorn_lineup::ACCEPT_EMOJI;

    fn tracked_ledger(message_id: MessageId, joined: u64) -> Arc<Mutex<LineupLedger>> {
        let mut ledger = LineupLedger::new();
        ledger.create(message_id, "Guild Siege", "").expect("create");
        for uid in 1..=joined {
            ledger.apply_reaction(message_id, uid, ACCEPT_EMOJI, true);
        }
        Arc::new(Mutex::new(ledger))
    }

    #[tokio::test(start_paused = true)]
    async fn test_past_fire_time_fires_immediately_once() {
        let ledger = tracked_ledger(1, 0);
        let messenger = Arc::new(RecordingMessenger::default());

        let handle = schedule_announcement(
            ledger,
            messenger.clone(),
            7,
            1,
            Utc::now() - Duration::hours(1),
            "Guild Siege",
        );
        handle.await.expect("task");

        let contents = messenger.sent_contents();
        assert_eq!(contents, vec!["Guild Siege has started! Prepare your gear.".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_fire_waits_for_instant() {
        let ledger = tracked_ledger(1, 1);
        let messenger = Arc::new(RecordingMessenger::default());

        let handle = schedule_announcement(
            ledger,
            messenger.clone(),
            7,
            1,
            Utc::now() + Duration::seconds(30),
            "Guild Siege",
        );

        // Nothing goes out before the deferred sleep elapses.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(messenger.send_count(), 0);

        handle.await.expect("task");
        assert_eq!(messenger.send_count(), 1);
        let sends = messenger.sends.lock().expect("lock");
        assert_eq!(sends[0].1.mentions, MentionPolicy::UsersOnly);
        assert!(sends[0].1.content.contains("<@1>"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mentions_batch_at_fifty() {
        let ledger = tracked_ledger(1, 120);
        let messenger = Arc::new(RecordingMessenger::default());

        schedule_announcement(
            ledger,
            messenger.clone(),
            7,
            1,
            Utc::now() - Duration::seconds(1),
            "Guild Siege",
        )
        .await
        .expect("task");

        let contents = messenger.sent_contents();
        assert_eq!(contents.len(), 3);
        let counts: Vec<usize> = contents.iter().map(|c| c.matches("<@").count()).collect();
        assert_eq!(counts, vec![50, 50, 20]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_untracked_lineup_falls_back_to_generic() {
        // The process restarted and forgot the line-up: joined() is empty.
        let ledger = Arc::new(Mutex::new(LineupLedger::new()));
        let messenger = Arc::new(RecordingMessenger::default());

        schedule_announcement(
            ledger,
            messenger.clone(),
            7,
            42,
            Utc::now() - Duration::seconds(1),
            "Secret Room",
        )
        .await
        .expect("task");

        assert_eq!(
            messenger.sent_contents(),
            vec!["Secret Room has started! Prepare your gear.".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_is_swallowed() {
        let ledger = tracked_ledger(1, 3);
        let messenger = Arc::new(RecordingMessenger::failing());

        let handle = schedule_announcement(
            ledger,
            messenger.clone(),
            7,
            1,
            Utc::now() - Duration::seconds(1),
            "Guild Siege",
        );
        // Best-effort: the task completes cleanly even when every send fails.
        handle.await.expect("task");
        assert_eq!(messenger.send_count(), 0);
    }

    #[test]
    fn test_mention_batches_shapes() {
        assert!(mention_batches(&[]).is_empty());

        let ids: Vec<UserId> = (1..=50).collect();
        assert_eq!(mention_batches(&ids).len(), 1);

        let ids: Vec<UserId> = (1..=51).collect();
        let batches = mention_batches(&ids);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1], "<@51>");
    }
}
