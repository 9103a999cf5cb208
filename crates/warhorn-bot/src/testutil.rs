//! Engine harness and recording `Messenger` mock for command tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use warhorn_core::error::Result;
use warhorn_core::types::{
    Capabilities, ChannelId, ChannelInfo, ChannelMessage, GatewayEvent, MessageId,
    OutboundMessage, RoleId, UserId,
};
use warhorn_core::{Messenger, WarhornConfig};
use warhorn_lineup::ReconcileSignal;

use crate::Engine;

pub const CREATOR_ROLE_ID: RoleId = 100;
pub const TEST_CHANNEL: ChannelId = 7;
pub const TEST_GUILD: u64 = 30;

#[derive(Default)]
pub struct RecordingMessenger {
    pub sends: Mutex<Vec<(ChannelId, OutboundMessage)>>,
    pub reactions: Mutex<Vec<(ChannelId, MessageId, String)>>,
    pub purged: Mutex<usize>,
    pub role: Option<RoleId>,
    pub caps: Mutex<Capabilities>,
    next_id: AtomicU64,
}

impl RecordingMessenger {
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
        self.sends.lock().expect("sends lock").push((channel, message));
        Ok(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    async fn edit(
        &self,
        _channel: ChannelId,
        _message: MessageId,
        _new: OutboundMessage,
    ) -> Result<()> {
        Ok(())
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<()> {
        self.reactions
            .lock()
            .expect("reactions lock")
            .push((channel, message, emoji.to_string()));
        Ok(())
    }

    async fn delete_message(&self, _channel: ChannelId, _message: MessageId) -> Result<()> {
        Ok(())
    }

    async fn resolve_channel(&self, channel: ChannelId) -> Option<ChannelInfo> {
        Some(ChannelInfo { id: channel, name: None })
    }

    async fn capabilities(&self, _channel: ChannelId) -> Result<Capabilities> {
        Ok(*self.caps.lock().expect("caps lock"))
    }

    async fn purge(&self, _channel: ChannelId, count: usize) -> Result<usize> {
        *self.purged.lock().expect("purged lock") = count;
        Ok(count)
    }

    async fn resolve_role(&self, _guild: u64, _name: &str) -> Result<Option<RoleId>> {
        Ok(self.role)
    }

    fn self_user(&self) -> UserId {
        0
    }
}

pub struct EngineHarness {
    pub engine: Engine,
    pub messenger: Arc<RecordingMessenger>,
    next_message: AtomicU64,
    // Keep the reconciler queue open so reaction forwarding doesn't error.
    _reconcile_rx: mpsc::UnboundedReceiver<ReconcileSignal>,
}

impl EngineHarness {
    fn build(role: Option<RoleId>) -> Self {
        let messenger = Arc::new(RecordingMessenger {
            role,
            caps: Mutex::new(Capabilities::all()),
            ..Default::default()
        });
        let (engine, reconcile_rx) =
            Engine::new(WarhornConfig::default(), messenger.clone()).expect("engine");
        Self {
            engine,
            messenger,
            next_message: AtomicU64::new(1000),
            _reconcile_rx: reconcile_rx,
        }
    }

    /// The invoking member holds the creator role.
    pub fn with_creator() -> Self {
        Self::build(Some(CREATOR_ROLE_ID))
    }

    /// The creator role doesn't resolve, so the gate denies.
    pub fn without_creator() -> Self {
        Self::build(None)
    }

    pub fn without_purge_caps(self) -> Self {
        *self.messenger.caps.lock().expect("caps lock") = Capabilities {
            send_messages: true,
            ..Default::default()
        };
        self
    }

    pub fn guild_message(&self, content: &str) -> ChannelMessage {
        ChannelMessage {
            id: self.next_message.fetch_add(1, Ordering::Relaxed),
            channel_id: TEST_CHANNEL,
            guild_id: Some(TEST_GUILD),
            author_id: 5,
            author_name: "officer".into(),
            content: content.into(),
            author_roles: vec![CREATOR_ROLE_ID],
        }
    }

    pub async fn dispatch(&self, msg: &ChannelMessage) {
        self.engine
            .handle_event(GatewayEvent::Message(msg.clone()))
            .await;
    }

    /// Let fire-and-forget notice tasks get as far as their send.
    pub async fn drain_notices(&self) {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }
}
