//! # Warhorn Core
//! Shared error types, configuration, event types, and the `Messenger`
//! collaborator trait consumed by the scheduler and lineup engines.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::WarhornConfig;
pub use error::{Result, WarhornError};
pub use traits::Messenger;
