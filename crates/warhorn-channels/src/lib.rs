//! # Warhorn Channels
//! Chat-platform plumbing. Currently Discord only: a REST client implementing
//! the core `Messenger` trait and a gateway WebSocket task producing the
//! typed event stream the bot engine consumes.

pub mod discord;

pub use discord::{DiscordChannel, GatewayStream};
