//! Event and message types shared between the channel, lineup, and
//! scheduler crates.

use serde::{Deserialize, Serialize};

/// Platform-assigned message snowflake.
pub type MessageId = u64;
/// Platform-assigned channel snowflake.
pub type ChannelId = u64;
/// Platform-assigned user snowflake.
pub type UserId = u64;
/// Platform-assigned role snowflake.
pub type RoleId = u64;

/// A reaction add/remove signal from the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    /// Unicode emoji as delivered by the platform.
    pub emoji: String,
}

/// A chat message delivered by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub guild_id: Option<u64>,
    pub author_id: UserId,
    pub author_name: String,
    pub content: String,
    /// Role ids the authoring member holds (guild messages only).
    pub author_roles: Vec<RoleId>,
}

/// Typed events emitted by the gateway stream.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    /// Session established; carries the bot's own user id.
    Ready { user_id: UserId, username: String },
    Message(ChannelMessage),
    ReactionAdded(ReactionEvent),
    ReactionRemoved(ReactionEvent),
}

/// Mention-suppression policy for an outbound message.
///
/// Maps onto the platform's `allowed_mentions` payload: the scheduler sends
/// broadcasts with everything suppressed, one-shot announcements allow user
/// pings only, and operator reposts may carry @everyone through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MentionPolicy {
    /// No pings at all.
    #[default]
    Suppressed,
    /// User mentions ping; everyone/role mentions are stripped.
    UsersOnly,
    /// Users, roles, and @everyone all ping.
    Everyone,
}

/// A single field in an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Renderable embed body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    pub color: u32,
}

/// An outbound message: plain content and/or an embed, plus mention policy.
#[derive(Debug, Clone, Default)]
pub struct OutboundMessage {
    pub content: String,
    pub embed: Option<Embed>,
    pub mentions: MentionPolicy,
}

impl OutboundMessage {
    /// Plain text with all mentions suppressed.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            embed: None,
            mentions: MentionPolicy::Suppressed,
        }
    }

    /// Text that is allowed to ping the users it names.
    pub fn pinging(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            embed: None,
            mentions: MentionPolicy::UsersOnly,
        }
    }

    /// Embed-only message.
    pub fn embed(embed: Embed) -> Self {
        Self {
            content: String::new(),
            embed: Some(embed),
            mentions: MentionPolicy::Suppressed,
        }
    }

    pub fn with_mentions(mut self, policy: MentionPolicy) -> Self {
        self.mentions = policy;
        self
    }
}

/// The subset of channel permissions the bot cares about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub send_messages: bool,
    pub manage_messages: bool,
    pub read_history: bool,
    pub mention_everyone: bool,
}

impl Capabilities {
    const ADMINISTRATOR: u64 = 1 << 3;
    const SEND_MESSAGES: u64 = 1 << 11;
    const MANAGE_MESSAGES: u64 = 1 << 13;
    const READ_MESSAGE_HISTORY: u64 = 1 << 16;
    const MENTION_EVERYONE: u64 = 1 << 17;

    /// Decode a platform permission bitfield. Administrator implies all.
    pub fn from_bits(bits: u64) -> Self {
        if bits & Self::ADMINISTRATOR != 0 {
            return Self::all();
        }
        Self {
            send_messages: bits & Self::SEND_MESSAGES != 0,
            manage_messages: bits & Self::MANAGE_MESSAGES != 0,
            read_history: bits & Self::READ_MESSAGE_HISTORY != 0,
            mention_everyone: bits & Self::MENTION_EVERYONE != 0,
        }
    }

    pub fn all() -> Self {
        Self {
            send_messages: true,
            manage_messages: true,
            read_history: true,
            mention_everyone: true,
        }
    }

    /// Required before a bulk-delete is attempted.
    pub fn can_purge(&self) -> bool {
        self.manage_messages && self.read_history
    }
}

/// Resolved channel handle returned by `Messenger::resolve_channel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: Option<String>,
}

/// Mention markup for a user id.
pub fn mention(user: UserId) -> String {
    format!("<@{user}>")
}

/// Platform timestamp markup: full date plus relative countdown.
pub fn timestamp_markup(unix: i64) -> String {
    format!("<t:{unix}:F> (<t:{unix}:R>)")
}
