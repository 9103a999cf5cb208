//! # Warhorn Scheduler
//!
//! Best-effort in-process announcement scheduling. No durable store, no
//! delivery guarantees beyond at-most-once; everything is lost on restart.
//!
//! Three independent mechanisms, each running as its own tokio task:
//! - [`recurring`] — the always-on cycle broadcasting a fixed message at
//!   fixed daily local-time hours.
//! - [`oneshot`] — a single future notification tied to a line-up whose body
//!   text yielded a resolvable time.
//! - [`countdown`] — cancellable per-channel duration timers with a live
//!   countdown display.
//!
//! [`timeparse`] resolves user text to instants; [`registry`] enforces one
//! live countdown per channel.

pub mod countdown;
pub mod oneshot;
pub mod recurring;
pub mod registry;
pub mod timeparse;

pub use countdown::Countdown;
pub use oneshot::{MENTION_CHUNK, schedule_announcement};
pub use recurring::RecurringCycle;
pub use registry::{CountdownEntry, TimerRegistry};

#[cfg(test)]
mod testutil;
