//! Recording `Messenger` mock shared by the scheduler tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use warhorn_core::Messenger;
use warhorn_core::error::{Result, WarhornError};
use warhorn_core::types::{
    Capabilities, ChannelId, ChannelInfo, MessageId, OutboundMessage, RoleId, UserId,
};

#[derive(Default)]
pub struct RecordingMessenger {
    pub sends: Mutex<Vec<(ChannelId, OutboundMessage)>>,
    pub edits: Mutex<Vec<(ChannelId, MessageId, OutboundMessage)>>,
    pub fail_sends: AtomicBool,
    next_id: AtomicU64,
}

impl RecordingMessenger {
    pub fn failing() -> Self {
        let mock = Self::default();
        mock.fail_sends.store(true, Ordering::Relaxed);
        mock
    }

    pub fn send_count(&self) -> usize {
        self.sends.lock().expect("sends lock").len()
    }

    pub fn sent_contents(&self) -> Vec<String> {
        self.sends
            .lock()
            .expect("sends lock")
            .iter()
            .map(|(_, m)| m.content.clone())
            .collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, channel: ChannelId, message: OutboundMessage) -> Result<MessageId> {
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(WarhornError::channel("send failed (mock)"));
        }
        self.sends.lock().expect("sends lock").push((channel, message));
        Ok(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    async fn edit(
        &self,
        channel: ChannelId,
        message: MessageId,
        new: OutboundMessage,
    ) -> Result<()> {
        self.edits.lock().expect("edits lock").push((channel, message, new));
        Ok(())
    }

    async fn add_reaction(
        &self,
        _channel: ChannelId,
        _message: MessageId,
        _emoji: &str,
    ) -> Result<()> {
        Ok(())
    }

    async fn delete_message(&self, _channel: ChannelId, _message: MessageId) -> Result<()> {
        Ok(())
    }

    async fn resolve_channel(&self, channel: ChannelId) -> Option<ChannelInfo> {
        Some(ChannelInfo { id: channel, name: None })
    }

    async fn capabilities(&self, _channel: ChannelId) -> Result<Capabilities> {
        Ok(Capabilities::all())
    }

    async fn purge(&self, _channel: ChannelId, count: usize) -> Result<usize> {
        Ok(count)
    }

    async fn resolve_role(&self, _guild: u64, _name: &str) -> Result<Option<RoleId>> {
        Ok(None)
    }

    fn self_user(&self) -> UserId {
        0
    }
}
