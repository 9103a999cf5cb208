//! Prefix-command parsing and handling.
//!
//! Mutating commands are gated on the configured creator role; rejections
//! and argument errors are terse notices that delete themselves shortly
//! after. Commands never bubble errors up: one bad invocation must not
//! disturb the event loop.

use std::time::Duration;

use chrono::Utc;

use warhorn_core::Messenger;
use warhorn_core::types::{
    ChannelId, ChannelMessage, Embed, EmbedField, MentionPolicy, OutboundMessage, timestamp_markup,
};
use warhorn_lineup::{ACCEPT_EMOJI, DECLINE_EMOJI, LineupView};
use warhorn_scheduler::{Countdown, schedule_announcement, timeparse};

use crate::{Engine, format_uptime};

/// How long transient notices stay before self-deleting.
const NOTICE_TTL: Duration = Duration::from_secs(5);

const STATUS_COLOR: u32 = 0x3498db;

/// A parsed prefix command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Lineup {
        title: String,
        label: String,
        text: String,
    },
    PostMessage {
        text: String,
    },
    DeleteMessage {
        count: Option<u64>,
    },
    WorldBoss {
        minutes: Option<u64>,
    },
    StopBoss,
    NextFfa,
    Status,
    Ping,
}

impl Command {
    /// Mutating commands require the creator role; read-only ones are open.
    pub fn requires_creator(&self) -> bool {
        !matches!(self, Self::NextFfa | Self::Status | Self::Ping)
    }
}

/// Parse message content into a command. `None` for non-commands and
/// unknown command names.
pub fn parse(prefix: &str, content: &str) -> Option<Command> {
    let rest = content.strip_prefix(prefix)?;
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest.trim_end(), ""),
    };

    match name.to_ascii_lowercase().as_str() {
        "lineup" | "siegelineup" => Some(Command::Lineup {
            title: "Siege Line-Up".into(),
            label: "Guild Siege".into(),
            text: args.into(),
        }),
        "roomlineup" | "secretroomlineup" => Some(Command::Lineup {
            title: "Secret Room Line-Up".into(),
            label: "Secret Room".into(),
            text: args.into(),
        }),
        "postmessage" => Some(Command::PostMessage { text: args.into() }),
        "deletemessage" | "delete" => Some(Command::DeleteMessage {
            count: args.parse().ok().filter(|c| *c > 0),
        }),
        "worldboss" | "wb" => Some(Command::WorldBoss {
            minutes: args.parse().ok().filter(|m| *m > 0),
        }),
        "stopboss" => Some(Command::StopBoss),
        "nextffa" => Some(Command::NextFfa),
        "status" => Some(Command::Status),
        "ping" => Some(Command::Ping),
        _ => None,
    }
}

/// Execute one command against the engine state.
pub async fn handle(engine: &Engine, msg: &ChannelMessage, cmd: Command) {
    if cmd.requires_creator() && !engine.is_creator(msg).await {
        notice(engine, msg.channel_id, "❌ You don't have permission to use this command.");
        return;
    }

    match cmd {
        Command::Lineup { title, label, text } => {
            create_lineup(engine, msg.channel_id, title, label, text).await;
        }

        Command::PostMessage { text } => {
            if text.trim().is_empty() {
                notice(engine, msg.channel_id, "❌ Provide text after the command.");
                return;
            }
            let policy = if text.contains("@everyone") {
                MentionPolicy::Everyone
            } else {
                MentionPolicy::UsersOnly
            };
            let outbound = OutboundMessage::text(text).with_mentions(policy);
            if let Err(e) = engine.messenger.send(msg.channel_id, outbound).await {
                tracing::warn!("postmessage failed: {e}");
                notice(engine, msg.channel_id, "❌ Failed to post message.");
            }
        }

        Command::DeleteMessage { count } => {
            let Some(count) = count else {
                notice(engine, msg.channel_id, "❌ Provide a positive number (e.g., !deletemessage 100).");
                return;
            };
            purge(engine, msg.channel_id, count.min(100) as usize).await;
        }

        Command::WorldBoss { minutes } => {
            let minutes = minutes.unwrap_or(engine.config.boss.duration_mins);
            Countdown::new(
                engine.registry(),
                engine.messenger.clone(),
                msg.channel_id,
                engine.config.boss.message.as_str(),
            )
            .start(Duration::from_secs(minutes * 60));
        }

        Command::StopBoss => {
            let stopped = engine.registry.lock().expect("registry lock").cancel(msg.channel_id);
            if !stopped {
                notice(engine, msg.channel_id, "No active timer in this channel.");
            }
        }

        Command::NextFfa => {
            let next = timeparse::next_recurring(
                Utc::now(),
                engine.tz,
                &engine.config.announce.hours,
            );
            let reply = format!(
                "Next FFA: {} {}",
                timestamp_markup(next.timestamp()),
                engine.tz
            );
            send_plain(engine, msg.channel_id, reply).await;
        }

        Command::Status => {
            let embed = Embed {
                title: "Bot Status".into(),
                description: None,
                fields: vec![
                    EmbedField {
                        name: "Uptime".into(),
                        value: format_uptime(engine.started_at.elapsed()),
                        inline: true,
                    },
                    EmbedField {
                        name: "Timezone".into(),
                        value: engine.tz.to_string(),
                        inline: true,
                    },
                    EmbedField {
                        name: "Tracked line-ups".into(),
                        value: engine.ledger.lock().expect("ledger lock").len().to_string(),
                        inline: true,
                    },
                    EmbedField {
                        name: "Active timers".into(),
                        value: engine.registry.lock().expect("registry lock").len().to_string(),
                        inline: true,
                    },
                ],
                footer: None,
                color: STATUS_COLOR,
            };
            if let Err(e) = engine
                .messenger
                .send(msg.channel_id, OutboundMessage::embed(embed))
                .await
            {
                tracing::warn!("status reply failed: {e}");
            }
        }

        Command::Ping => {
            send_plain(engine, msg.channel_id, "Pong").await;
        }
    }
}

/// Post a line-up embed, seed the reaction affordances, register the ledger
/// entry, and arm a one-shot announcement when the text yields a time.
async fn create_lineup(
    engine: &Engine,
    channel: ChannelId,
    title: String,
    label: String,
    text: String,
) {
    let view = LineupView {
        title: title.clone(),
        body: text.clone(),
        joined: vec![],
        joined_total: 0,
        declined: vec![],
        declined_total: 0,
    };
    let mut outbound = OutboundMessage::embed(view.to_embed());
    if text.contains("@everyone") {
        outbound.content = "@everyone".into();
        outbound.mentions = MentionPolicy::Everyone;
    }

    let message_id = match engine.messenger.send(channel, outbound).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("lineup post failed: {e}");
            notice(engine, channel, "❌ Failed to create lineup.");
            return;
        }
    };

    for emoji in [ACCEPT_EMOJI, DECLINE_EMOJI] {
        if let Err(e) = engine.messenger.add_reaction(channel, message_id, emoji).await {
            tracing::warn!("seeding {emoji} on lineup {message_id} failed: {e}");
        }
    }

    if let Err(e) = engine
        .ledger
        .lock()
        .expect("ledger lock")
        .create(message_id, title.as_str(), text.as_str())
    {
        tracing::warn!("ledger create failed: {e}");
        return;
    }

    if let Some(fire_at) = timeparse::resolve_event_time(&text, engine.tz, Utc::now()) {
        tracing::info!("lineup {message_id}: '{label}' announcement armed for {fire_at}");
        schedule_announcement(
            engine.ledger(),
            engine.messenger.clone(),
            channel,
            message_id,
            fire_at,
            label,
        );
    }
}

/// Pre-check capabilities, then bulk-delete. No partial state: a permission
/// shortfall rejects before anything is removed.
async fn purge(engine: &Engine, channel: ChannelId, count: usize) {
    match engine.messenger.capabilities(channel).await {
        Ok(caps) if caps.can_purge() => {}
        Ok(_) => {
            notice(
                engine,
                channel,
                "❌ I need 'Manage Messages' and 'Read Message History' here.",
            );
            return;
        }
        Err(e) => {
            tracing::warn!("capability check failed: {e}");
            notice(engine, channel, "❌ Could not verify channel permissions.");
            return;
        }
    }

    match engine.messenger.purge(channel, count).await {
        Ok(deleted) => {
            notice(engine, channel, format!("🧹 Deleted {deleted} messages in this channel."));
        }
        Err(e) => {
            tracing::warn!("purge failed: {e}");
            notice(engine, channel, "❌ Failed to delete messages.");
        }
    }
}

async fn send_plain(engine: &Engine, channel: ChannelId, text: impl Into<String>) {
    if let Err(e) = engine.messenger.send(channel, OutboundMessage::text(text)).await {
        tracing::warn!("reply failed: {e}");
    }
}

/// Fire-and-forget transient notice that deletes itself after [`NOTICE_TTL`].
fn notice(engine: &Engine, channel: ChannelId, text: impl Into<String>) {
    let messenger = engine.messenger.clone();
    let text = text.into();
    tokio::spawn(async move {
        match messenger.send(channel, OutboundMessage::text(text)).await {
            Ok(id) => {
                tokio::time::sleep(NOTICE_TTL).await;
                let _ = messenger.delete_message(channel, id).await;
            }
            Err(e) => tracing::warn!("notice send failed: {e}"),
        }
    });
}
