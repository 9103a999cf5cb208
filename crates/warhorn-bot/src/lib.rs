//! # Warhorn Bot
//! The orchestration engine: consumes gateway events, dispatches prefix
//! commands, feeds the reaction reconciler, and owns the shared ledger and
//! timer registry (dependency-passed, no globals — tests instantiate their
//! own engine per scenario).

pub mod commands;
pub mod keepalive;

#[cfg(test)]
mod testutil;

use std::sync::{Arc, Mutex};

use chrono_tz::Tz;
use futures::StreamExt;
use tokio::sync::mpsc;

use warhorn_channels::DiscordChannel;
use warhorn_core::error::Result;
use warhorn_core::types::GatewayEvent;
use warhorn_core::{Messenger, WarhornConfig};
use warhorn_lineup::{LineupLedger, ReactionReconciler, ReconcileSignal};
use warhorn_scheduler::{RecurringCycle, TimerRegistry};

/// Shared state behind every command handler and scheduled task.
pub struct Engine {
    pub(crate) config: WarhornConfig,
    pub(crate) tz: Tz,
    pub(crate) messenger: Arc<dyn Messenger>,
    pub(crate) ledger: Arc<Mutex<LineupLedger>>,
    pub(crate) registry: Arc<Mutex<TimerRegistry>>,
    reconcile_tx: mpsc::UnboundedSender<ReconcileSignal>,
    pub(crate) started_at: std::time::Instant,
}

impl Engine {
    /// Build an engine plus the receiver side of the reconciler queue.
    pub fn new(
        config: WarhornConfig,
        messenger: Arc<dyn Messenger>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ReconcileSignal>)> {
        let tz = config.tz()?;
        let (reconcile_tx, reconcile_rx) = mpsc::unbounded_channel();
        Ok((
            Self {
                config,
                tz,
                messenger,
                ledger: Arc::new(Mutex::new(LineupLedger::new())),
                registry: Arc::new(Mutex::new(TimerRegistry::new())),
                reconcile_tx,
                started_at: std::time::Instant::now(),
            },
            reconcile_rx,
        ))
    }

    pub fn ledger(&self) -> Arc<Mutex<LineupLedger>> {
        self.ledger.clone()
    }

    pub fn registry(&self) -> Arc<Mutex<TimerRegistry>> {
        self.registry.clone()
    }

    /// Route one gateway event.
    pub async fn handle_event(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::Ready { username, user_id } => {
                tracing::info!("gateway ready as {username} ({user_id})");
            }
            GatewayEvent::ReactionAdded(reaction) => {
                let _ = self.reconcile_tx.send(ReconcileSignal::Added(reaction));
            }
            GatewayEvent::ReactionRemoved(reaction) => {
                let _ = self.reconcile_tx.send(ReconcileSignal::Removed(reaction));
            }
            GatewayEvent::Message(msg) => {
                let Some(cmd) = commands::parse(&self.config.commands.prefix, &msg.content) else {
                    return;
                };
                commands::handle(self, &msg, cmd).await;
            }
        }
    }

    /// Does the invoking member hold the configured creator role?
    /// Fails closed: lookup errors and non-guild contexts deny.
    pub(crate) async fn is_creator(&self, msg: &warhorn_core::types::ChannelMessage) -> bool {
        let Some(guild) = msg.guild_id else {
            return false;
        };
        match self
            .messenger
            .resolve_role(guild, &self.config.commands.creator_role)
            .await
        {
            Ok(Some(role)) => msg.author_roles.contains(&role),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("creator role lookup failed: {e}");
                false
            }
        }
    }
}

/// The runnable bot: connects the Discord channel, spawns the background
/// tasks, and pumps gateway events into the engine until the stream ends.
pub struct Bot {
    config: WarhornConfig,
}

impl Bot {
    pub fn new(config: WarhornConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        let discord = Arc::new(DiscordChannel::new(self.config.discord.clone())?);
        discord.connect().await?;

        if self.config.keepalive.enabled {
            let port = self.config.keepalive.port;
            tokio::spawn(async move {
                if let Err(e) = keepalive::serve(port).await {
                    tracing::warn!("keepalive listener failed: {e}");
                }
            });
        }

        let messenger: Arc<dyn Messenger> = discord.clone();
        let (engine, reconcile_rx) = Engine::new(self.config, messenger.clone())?;

        ReactionReconciler::new(engine.ledger(), messenger.clone()).spawn(reconcile_rx);

        if engine.config.announce.channel_id != 0 {
            RecurringCycle::new(
                messenger.clone(),
                engine.config.announce.channel_id,
                engine.tz,
                engine.config.announce.hours.clone(),
                engine.config.announce.message.clone(),
            )
            .spawn();
        } else {
            tracing::warn!("announce.channel_id not set; recurring cycle disabled");
        }

        let mut gateway = discord.clone().start_gateway();
        while let Some(event) = gateway.next().await {
            engine.handle_event(event).await;
        }
        Ok(())
    }
}

/// Human-readable uptime: `2d 3h 4m 5s`, dropping leading zero units.
pub fn format_uptime(elapsed: std::time::Duration) -> String {
    let total = elapsed.as_secs();
    let (days, rest) = (total / 86_400, total % 86_400);
    let (hours, rest) = (rest / 3_600, rest % 3_600);
    let (mins, secs) = (rest / 60, rest % 60);

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if mins > 0 {
        parts.push(format!("{mins}m"));
    }
    parts.push(format!("{secs}s"));
    parts.join(" ")
}
