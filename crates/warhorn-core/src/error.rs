//! Unified error types for Warhorn.

use thiserror::Error;

/// Result type alias using WarhornError.
pub type Result<T> = std::result::Result<T, WarhornError>;

#[derive(Error, Debug)]
pub enum WarhornError {
    // Channel errors
    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    // Lineup errors
    #[error("Lineup error: {0}")]
    Lineup(String),

    #[error("Lineup already tracked: {0}")]
    DuplicateLineup(u64),

    // Permission errors
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("{0}")]
    Other(String),
}

impl WarhornError {
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    pub fn lineup(msg: impl Into<String>) -> Self {
        Self::Lineup(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }
}
