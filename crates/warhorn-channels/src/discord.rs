//! Discord channel — REST API + Gateway WebSocket.
//!
//! Connects to the Discord Gateway for real-time events (messages, reactions)
//! and uses the REST API for sending, editing, and reacting.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::Stream;
use serde::Deserialize;
use std::sync::Arc;

use warhorn_core::config::DiscordSection;
use warhorn_core::error::{Result, WarhornError};
use warhorn_core::traits::Messenger;
use warhorn_core::types::{
    Capabilities, ChannelId, ChannelInfo, ChannelMessage, Embed, GatewayEvent, MentionPolicy,
    MessageId, OutboundMessage, ReactionEvent, RoleId, UserId,
};

const API_BASE: &str = "https://discord.com/api/v10";

/// Discord channel: REST client plus gateway connector.
pub struct DiscordChannel {
    config: DiscordSection,
    client: reqwest::Client,
    self_user: AtomicU64,
    channel_cache: Mutex<HashMap<ChannelId, ChannelInfo>>,
    role_cache: Mutex<HashMap<u64, HashMap<String, RoleId>>>,
}

impl DiscordChannel {
    pub fn new(config: DiscordSection) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Authorization",
            format!("Bot {}", config.token)
                .parse()
                .map_err(|_| WarhornError::AuthFailed("token is not header-safe".into()))?,
        );
        headers.insert(
            "User-Agent",
            "Warhorn/0.3".parse().map_err(|_| WarhornError::channel("bad user agent"))?,
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| WarhornError::channel(format!("client build failed: {e}")))?;

        Ok(Self {
            config,
            client,
            self_user: AtomicU64::new(0),
            channel_cache: Mutex::new(HashMap::new()),
            role_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Verify the token and learn the bot's own user id.
    pub async fn connect(&self) -> Result<()> {
        let me: DiscordUser = self
            .get_json(&format!("{API_BASE}/users/@me"))
            .await
            .map_err(|e| WarhornError::AuthFailed(format!("getMe failed: {e}")))?;
        let id: UserId = me
            .id
            .parse()
            .map_err(|_| WarhornError::channel("non-numeric user id"))?;
        self.self_user.store(id, Ordering::Relaxed);
        tracing::info!("Discord bot: {} ({id})", me.username);
        Ok(())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WarhornError::channel(format!("GET failed: {e}")))?;
        Self::check_status(&response)?;
        response
            .json()
            .await
            .map_err(|e| WarhornError::channel(format!("invalid response: {e}")))
    }

    fn check_status(response: &reqwest::Response) -> Result<()> {
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(WarhornError::RateLimited(status.to_string()));
        }
        if !status.is_success() {
            return Err(WarhornError::channel(format!("Discord {status}")));
        }
        Ok(())
    }

    /// Get Gateway WebSocket URL.
    async fn get_gateway_url(&self) -> Result<String> {
        let body: serde_json::Value = self.get_json(&format!("{API_BASE}/gateway/bot")).await?;
        body["url"]
            .as_str()
            .map(|s| format!("{s}/?v=10&encoding=json"))
            .ok_or_else(|| WarhornError::gateway("no gateway URL"))
    }

    /// Start the Gateway connection — returns a stream of [`GatewayEvent`]s.
    /// Auto-reconnects on disconnect with exponential backoff; stops entirely
    /// when the stream receiver is dropped.
    pub fn start_gateway(self: Arc<Self>) -> GatewayStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let channel = self;

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 5;

            loop {
                tracing::info!("Discord Gateway connecting...");

                let gateway_url = match channel.get_gateway_url().await {
                    Ok(url) => url,
                    Err(e) => {
                        tracing::error!("failed to get gateway URL: {e}, retrying in {backoff_secs}s");
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let (mut ws, _) = match tokio_tungstenite::connect_async(&gateway_url).await {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::error!("gateway WebSocket failed: {e}, retrying in {backoff_secs}s");
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                // Reset backoff on successful connect
                backoff_secs = 5;
                tracing::info!("Discord Gateway connected");

                use futures::{SinkExt, StreamExt};
                use tokio_tungstenite::tungstenite::Message as WsMsg;

                let mut heartbeat_interval_ms: u64 = 41250;
                let mut seq: Option<u64> = None;
                let mut identified = false;

                loop {
                    tokio::select! {
                        msg = ws.next() => {
                            match msg {
                                Some(Ok(WsMsg::Text(text))) => {
                                    let payload: serde_json::Value = match serde_json::from_str(&text) {
                                        Ok(v) => v,
                                        Err(_) => continue,
                                    };

                                    let op = payload["op"].as_u64().unwrap_or(0);
                                    if let Some(s) = payload["s"].as_u64() {
                                        seq = Some(s);
                                    }

                                    match op {
                                        10 => {
                                            heartbeat_interval_ms = payload["d"]["heartbeat_interval"]
                                                .as_u64().unwrap_or(41250);
                                            tracing::debug!("Gateway Hello: heartbeat={}ms", heartbeat_interval_ms);

                                            if !identified {
                                                let identify = serde_json::json!({
                                                    "op": 2,
                                                    "d": {
                                                        "token": channel.config.token,
                                                        "intents": channel.config.intents,
                                                        "properties": {
                                                            "os": std::env::consts::OS,
                                                            "browser": "warhorn",
                                                            "device": "warhorn"
                                                        }
                                                    }
                                                });
                                                let _ = ws.send(WsMsg::Text(identify.to_string())).await;
                                                identified = true;
                                            }
                                        }
                                        11 => { tracing::trace!("Heartbeat ACK"); }
                                        0 => {
                                            let Some(event) = parse_dispatch(&payload) else { continue };
                                            if let GatewayEvent::Ready { user_id, ref username } = event {
                                                channel.self_user.store(user_id, Ordering::Relaxed);
                                                tracing::info!("Discord Gateway READY as {username}");
                                            }
                                            if tx.send(event).is_err() {
                                                tracing::info!("Discord stream closed (receiver dropped)");
                                                return; // Stop completely
                                            }
                                        }
                                        7 => {
                                            tracing::warn!("Gateway requesting reconnect");
                                            break; // → outer reconnect loop
                                        }
                                        9 => {
                                            tracing::warn!("Invalid session, re-identifying");
                                            identified = false;
                                        }
                                        _ => {}
                                    }
                                }
                                Some(Ok(WsMsg::Close(_))) => {
                                    tracing::warn!("Discord Gateway closed by server");
                                    break; // → reconnect
                                }
                                Some(Err(e)) => {
                                    tracing::error!("Gateway error: {e}");
                                    break; // → reconnect
                                }
                                None => break,
                                _ => {}
                            }
                        }
                        _ = tokio::time::sleep(std::time::Duration::from_millis(heartbeat_interval_ms)) => {
                            let heartbeat = serde_json::json!({ "op": 1, "d": seq });
                            if ws.send(WsMsg::Text(heartbeat.to_string())).await.is_err() {
                                tracing::error!("Heartbeat send failed");
                                break; // → reconnect
                            }
                            tracing::trace!("Heartbeat sent (seq={seq:?})");
                        }
                    }
                }

                // Disconnected — reconnect after backoff
                tracing::info!("Discord Gateway disconnected, reconnecting in {backoff_secs}s");
                tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                backoff_secs = (backoff_secs * 2).min(60);
            }
        });

        GatewayStream { rx }
    }
}

/// Decode one dispatch (op 0) payload into a typed event.
fn parse_dispatch(payload: &serde_json::Value) -> Option<GatewayEvent> {
    let d = &payload["d"];
    match payload["t"].as_str().unwrap_or("") {
        "READY" => Some(GatewayEvent::Ready {
            user_id: snowflake(&d["user"]["id"])?,
            username: d["user"]["username"].as_str().unwrap_or("unknown").into(),
        }),
        "MESSAGE_CREATE" => {
            if d["author"]["bot"].as_bool().unwrap_or(false) {
                return None;
            }
            Some(GatewayEvent::Message(ChannelMessage {
                id: snowflake(&d["id"])?,
                channel_id: snowflake(&d["channel_id"])?,
                guild_id: snowflake(&d["guild_id"]),
                author_id: snowflake(&d["author"]["id"])?,
                author_name: d["author"]["username"].as_str().unwrap_or("").into(),
                content: d["content"].as_str().unwrap_or("").into(),
                author_roles: d["member"]["roles"]
                    .as_array()
                    .map(|roles| roles.iter().filter_map(snowflake).collect())
                    .unwrap_or_default(),
            }))
        }
        "MESSAGE_REACTION_ADD" => parse_reaction(d).map(GatewayEvent::ReactionAdded),
        "MESSAGE_REACTION_REMOVE" => parse_reaction(d).map(GatewayEvent::ReactionRemoved),
        other => {
            tracing::trace!("ignoring event: {other}");
            None
        }
    }
}

fn parse_reaction(d: &serde_json::Value) -> Option<ReactionEvent> {
    Some(ReactionEvent {
        message_id: snowflake(&d["message_id"])?,
        channel_id: snowflake(&d["channel_id"])?,
        user_id: snowflake(&d["user_id"])?,
        emoji: d["emoji"]["name"].as_str()?.into(),
    })
}

/// Discord sends snowflakes as decimal strings.
fn snowflake(v: &serde_json::Value) -> Option<u64> {
    v.as_str().and_then(|s| s.parse().ok())
}

fn allowed_mentions(policy: MentionPolicy) -> serde_json::Value {
    match policy {
        MentionPolicy::Suppressed => serde_json::json!({ "parse": [] }),
        MentionPolicy::UsersOnly => serde_json::json!({ "parse": ["users"] }),
        MentionPolicy::Everyone => serde_json::json!({ "parse": ["users", "roles", "everyone"] }),
    }
}

fn embed_json(embed: &Embed) -> serde_json::Value {
    let mut body = serde_json::json!({
        "title": embed.title,
        "color": embed.color,
        "fields": embed.fields.iter().map(|f| serde_json::json!({
            "name": f.name,
            "value": f.value,
            "inline": f.inline,
        })).collect::<Vec<_>>(),
    });
    if let Some(description) = &embed.description {
        body["description"] = serde_json::json!(description);
    }
    if let Some(footer) = &embed.footer {
        body["footer"] = serde_json::json!({ "text": footer });
    }
    body
}

fn message_json(message: &OutboundMessage) -> serde_json::Value {
    let mut body = serde_json::json!({
        "content": message.content,
        "allowed_mentions": allowed_mentions(message.mentions),
    });
    if let Some(embed) = &message.embed {
        body["embeds"] = serde_json::json!([embed_json(embed)]);
    }
    body
}

#[async_trait]
impl Messenger for DiscordChannel {
    async fn send(&self, channel: ChannelId, message: OutboundMessage) -> Result<MessageId> {
        let url = format!("{API_BASE}/channels/{channel}/messages");
        let response = self
            .client
            .post(&url)
            .json(&message_json(&message))
            .send()
            .await
            .map_err(|e| WarhornError::channel(format!("send failed: {e}")))?;
        Self::check_status(&response)?;
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| WarhornError::channel(format!("invalid send response: {e}")))?;
        snowflake(&body["id"]).ok_or_else(|| WarhornError::channel("send response missing id"))
    }

    async fn edit(
        &self,
        channel: ChannelId,
        message: MessageId,
        new: OutboundMessage,
    ) -> Result<()> {
        let url = format!("{API_BASE}/channels/{channel}/messages/{message}");
        let response = self
            .client
            .patch(&url)
            .json(&message_json(&new))
            .send()
            .await
            .map_err(|e| WarhornError::channel(format!("edit failed: {e}")))?;
        Self::check_status(&response)
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<()> {
        let url = format!(
            "{API_BASE}/channels/{channel}/messages/{message}/reactions/{}/@me",
            urlencoding::encode(emoji)
        );
        let response = self
            .client
            .put(&url)
            .send()
            .await
            .map_err(|e| WarhornError::channel(format!("add_reaction failed: {e}")))?;
        Self::check_status(&response)
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()> {
        let url = format!("{API_BASE}/channels/{channel}/messages/{message}");
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| WarhornError::channel(format!("delete failed: {e}")))?;
        Self::check_status(&response)
    }

    async fn resolve_channel(&self, channel: ChannelId) -> Option<ChannelInfo> {
        if let Some(info) = self.channel_cache.lock().expect("channel cache").get(&channel) {
            return Some(info.clone());
        }
        let body: serde_json::Value = self
            .get_json(&format!("{API_BASE}/channels/{channel}"))
            .await
            .ok()?;
        let info = ChannelInfo {
            id: snowflake(&body["id"])?,
            name: body["name"].as_str().map(String::from),
        };
        self.channel_cache
            .lock()
            .expect("channel cache")
            .insert(channel, info.clone());
        Some(info)
    }

    async fn capabilities(&self, _channel: ChannelId) -> Result<Capabilities> {
        // Guild-level permissions only; channel overwrites are not applied.
        let guild = self.config.guild_id;
        let me = self.self_user.load(Ordering::Relaxed);
        let member: serde_json::Value = self
            .get_json(&format!("{API_BASE}/guilds/{guild}/members/{me}"))
            .await?;
        let roles: Vec<serde_json::Value> =
            self.get_json(&format!("{API_BASE}/guilds/{guild}/roles")).await?;

        let mut held: Vec<u64> = member["roles"]
            .as_array()
            .map(|r| r.iter().filter_map(snowflake).collect())
            .unwrap_or_default();
        held.push(guild); // the @everyone role shares the guild's id

        let mut bits = 0u64;
        for role in &roles {
            let Some(id) = snowflake(&role["id"]) else { continue };
            if held.contains(&id) {
                bits |= role["permissions"]
                    .as_str()
                    .and_then(|p| p.parse::<u64>().ok())
                    .unwrap_or(0);
            }
        }
        Ok(Capabilities::from_bits(bits))
    }

    async fn purge(&self, channel: ChannelId, count: usize) -> Result<usize> {
        let count = count.min(100);
        let messages: Vec<serde_json::Value> = self
            .get_json(&format!("{API_BASE}/channels/{channel}/messages?limit={count}"))
            .await?;
        let ids: Vec<String> = messages
            .iter()
            .filter(|m| !m["pinned"].as_bool().unwrap_or(false))
            .filter_map(|m| m["id"].as_str().map(String::from))
            .collect();

        match ids.len() {
            0 => Ok(0),
            1 => {
                let id: MessageId = ids[0]
                    .parse()
                    .map_err(|_| WarhornError::channel("non-numeric message id"))?;
                self.delete_message(channel, id).await?;
                Ok(1)
            }
            n => {
                let url = format!("{API_BASE}/channels/{channel}/messages/bulk-delete");
                let response = self
                    .client
                    .post(&url)
                    .json(&serde_json::json!({ "messages": ids }))
                    .send()
                    .await
                    .map_err(|e| WarhornError::channel(format!("bulk delete failed: {e}")))?;
                Self::check_status(&response)?;
                Ok(n)
            }
        }
    }

    async fn resolve_role(&self, guild: u64, name: &str) -> Result<Option<RoleId>> {
        let wanted = name.trim().to_lowercase();
        if let Some(roles) = self.role_cache.lock().expect("role cache").get(&guild) {
            return Ok(roles.get(&wanted).copied());
        }
        let roles: Vec<serde_json::Value> =
            self.get_json(&format!("{API_BASE}/guilds/{guild}/roles")).await?;
        let by_name: HashMap<String, RoleId> = roles
            .iter()
            .filter_map(|r| {
                Some((r["name"].as_str()?.trim().to_lowercase(), snowflake(&r["id"])?))
            })
            .collect();
        let found = by_name.get(&wanted).copied();
        self.role_cache.lock().expect("role cache").insert(guild, by_name);
        Ok(found)
    }

    fn self_user(&self) -> UserId {
        self.self_user.load(Ordering::Relaxed)
    }
}

/// Stream of typed gateway events.
pub struct GatewayStream {
    rx: tokio::sync::mpsc::UnboundedReceiver<GatewayEvent>,
}

impl Stream for GatewayStream {
    type Item = GatewayEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Unpin for GatewayStream {}

// --- Discord API Types ---

#[derive(Debug, Clone, Deserialize)]
struct DiscordUser {
    id: String,
    username: String,
}
