//! The `Messenger` collaborator trait.
//!
//! Everything the lineup and scheduler engines need from the chat platform
//! goes through this interface, so tests can substitute a recording mock and
//! the engines never touch REST details.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    Capabilities, ChannelId, ChannelInfo, MessageId, OutboundMessage, RoleId, UserId,
};

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Post a message, returning the platform-assigned message id.
    async fn send(&self, channel: ChannelId, message: OutboundMessage) -> Result<MessageId>;

    /// Replace the body of a previously sent message.
    async fn edit(
        &self,
        channel: ChannelId,
        message: MessageId,
        new: OutboundMessage,
    ) -> Result<()>;

    /// Attach a reaction affordance to a message.
    async fn add_reaction(&self, channel: ChannelId, message: MessageId, emoji: &str)
    -> Result<()>;

    /// Delete a single message (used for self-deleting notices).
    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()>;

    /// Look up a destination channel, cache-then-network. `None` when the
    /// channel does not exist or is not visible to the bot.
    async fn resolve_channel(&self, channel: ChannelId) -> Option<ChannelInfo>;

    /// The bot's own effective permissions in a channel, used to pre-check
    /// bulk operations before attempting them.
    async fn capabilities(&self, channel: ChannelId) -> Result<Capabilities>;

    /// Delete up to `count` recent non-pinned messages. Returns how many
    /// were actually removed.
    async fn purge(&self, channel: ChannelId, count: usize) -> Result<usize>;

    /// Resolve a role by name (case-insensitive) within a guild.
    async fn resolve_role(&self, guild: u64, name: &str) -> Result<Option<RoleId>>;

    /// The bot's own user id, used to filter self-reactions.
    fn self_user(&self) -> UserId;
}
