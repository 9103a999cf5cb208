//! The participation ledger: message id → join/decline sets.

use std::collections::{BTreeSet, HashMap};

use warhorn_core::error::{Result, WarhornError};
use warhorn_core::types::{Embed, EmbedField, MessageId, UserId, mention};

/// Reaction marking "will join".
pub const ACCEPT_EMOJI: &str = "✅";
/// Reaction marking "not joining".
pub const DECLINE_EMOJI: &str = "❌";

/// Members listed per side before the rest are elided, to stay inside
/// platform embed-size limits.
const LISTED_CAP: usize = 30;

const LINEUP_COLOR: u32 = 0x2ecc71;

#[derive(Debug, Default)]
struct Participation {
    title: String,
    body: String,
    joined: BTreeSet<UserId>,
    declined: BTreeSet<UserId>,
}

/// In-memory mapping from announcement message id to participation state.
///
/// Entries are created when a line-up is posted and live until process exit;
/// there is no way to observe platform-side deletion, so stale entries are
/// accepted and simply never receive further events.
#[derive(Debug, Default)]
pub struct LineupLedger {
    entries: HashMap<MessageId, Participation>,
}

impl LineupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a freshly posted line-up message.
    pub fn create(
        &mut self,
        message_id: MessageId,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<()> {
        if self.entries.contains_key(&message_id) {
            return Err(WarhornError::DuplicateLineup(message_id));
        }
        self.entries.insert(
            message_id,
            Participation {
                title: title.into(),
                body: body.into(),
                ..Default::default()
            },
        );
        Ok(())
    }

    /// Apply one reaction signal. Returns `true` when ledger state changed.
    ///
    /// Unknown message ids and unrecognized emojis are no-ops. Adding an
    /// accept/decline moves the member between the two sets; retracting a
    /// reaction only removes the member from its own set, it never implies
    /// the opposite answer.
    pub fn apply_reaction(
        &mut self,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
        added: bool,
    ) -> bool {
        let Some(state) = self.entries.get_mut(&message_id) else {
            return false;
        };
        match (emoji, added) {
            (ACCEPT_EMOJI, true) => {
                let left = state.declined.remove(&user_id);
                state.joined.insert(user_id) || left
            }
            (DECLINE_EMOJI, true) => {
                let left = state.joined.remove(&user_id);
                state.declined.insert(user_id) || left
            }
            (ACCEPT_EMOJI, false) => state.joined.remove(&user_id),
            (DECLINE_EMOJI, false) => state.declined.remove(&user_id),
            _ => false,
        }
    }

    /// Render the current state of a tracked line-up, or `None` if unknown.
    pub fn render(&self, message_id: MessageId) -> Option<LineupView> {
        let state = self.entries.get(&message_id)?;
        Some(LineupView {
            title: state.title.clone(),
            body: state.body.clone(),
            joined_total: state.joined.len(),
            declined_total: state.declined.len(),
            joined: state.joined.iter().copied().take(LISTED_CAP).collect(),
            declined: state.declined.iter().copied().take(LISTED_CAP).collect(),
        })
    }

    /// The joined set for a line-up, used by the one-shot announcement at
    /// fire time. Empty when the id is unknown.
    pub fn joined(&self, message_id: MessageId) -> Vec<UserId> {
        self.entries
            .get(&message_id)
            .map(|s| s.joined.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, message_id: MessageId) -> bool {
        self.entries.contains_key(&message_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Snapshot of a line-up for display, capped at [`LISTED_CAP`] per side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineupView {
    pub title: String,
    pub body: String,
    pub joined: Vec<UserId>,
    pub joined_total: usize,
    pub declined: Vec<UserId>,
    pub declined_total: usize,
}

impl LineupView {
    /// Build the embed body the platform displays.
    pub fn to_embed(&self) -> Embed {
        Embed {
            title: format!("⚔ {} ⚔", self.title),
            description: (!self.body.is_empty()).then(|| self.body.clone()),
            fields: vec![
                EmbedField {
                    name: format!("✅ Will Join ({})", self.joined_total),
                    value: Self::names(&self.joined),
                    inline: true,
                },
                EmbedField {
                    name: format!("❌ Not Joining ({})", self.declined_total),
                    value: Self::names(&self.declined),
                    inline: true,
                },
            ],
            footer: Some("React to update your participation".into()),
            color: LINEUP_COLOR,
        }
    }

    fn names(ids: &[UserId]) -> String {
        if ids.is_empty() {
            return "No one yet".into();
        }
        ids.iter()
            .map(|id| format!("• {}", mention(*id)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
