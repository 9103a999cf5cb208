//! Reaction reconciler: applies gateway reaction events to the ledger and
//! pushes re-rendered embeds back through the `Messenger`.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use warhorn_core::Messenger;
use warhorn_core::types::{OutboundMessage, ReactionEvent};

use crate::ledger::LineupLedger;

/// One inbound reaction signal, tagged with direction.
#[derive(Debug, Clone)]
pub enum ReconcileSignal {
    Added(ReactionEvent),
    Removed(ReactionEvent),
}

/// Consumes reaction signals in delivery order and keeps tracked line-up
/// messages in sync with the ledger.
///
/// A single consumer task preserves per-message ordering; nothing is
/// reordered internally. Edit failures are logged and swallowed, the next
/// reaction will re-render anyway.
pub struct ReactionReconciler {
    ledger: Arc<Mutex<LineupLedger>>,
    messenger: Arc<dyn Messenger>,
}

impl ReactionReconciler {
    pub fn new(ledger: Arc<Mutex<LineupLedger>>, messenger: Arc<dyn Messenger>) -> Self {
        Self { ledger, messenger }
    }

    /// Spawn the consumer task. It runs until the sender side is dropped.
    pub fn spawn(self, rx: mpsc::UnboundedReceiver<ReconcileSignal>) -> JoinHandle<()> {
        tokio::spawn(self.run(rx))
    }

    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<ReconcileSignal>) {
        let self_user = self.messenger.self_user();
        while let Some(signal) = rx.recv().await {
            let (event, added) = match &signal {
                ReconcileSignal::Added(e) => (e, true),
                ReconcileSignal::Removed(e) => (e, false),
            };
            if event.user_id == self_user {
                // The bot seeds ✅/❌ on every line-up; don't count itself.
                continue;
            }

            let view = {
                let mut ledger = self.ledger.lock().expect("ledger lock");
                if !ledger.apply_reaction(event.message_id, event.user_id, &event.emoji, added) {
                    continue;
                }
                ledger.render(event.message_id)
            };

            let Some(view) = view else { continue };
            if let Err(e) = self
                .messenger
                .edit(
                    event.channel_id,
                    event.message_id,
                    OutboundMessage::embed(view.to_embed()),
                )
                .await
            {
                tracing::warn!("lineup {} re-render failed: {e}", event.message_id);
            }
        }
        tracing::debug!("reaction reconciler stopped (event stream closed)");
    }
}
