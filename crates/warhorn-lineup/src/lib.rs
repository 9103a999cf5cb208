//! # Warhorn Lineup
//! In-memory participation tracking for line-up announcements.
//!
//! A line-up is a posted message members answer with ✅/❌ reactions. The
//! [`LineupLedger`] holds one record per tracked message; the
//! [`ReactionReconciler`] consumes gateway reaction events, mutates the
//! ledger, and pushes a re-rendered embed back to the platform.
//!
//! State is memory-resident only. A restart forgets every tracked line-up,
//! and reactions referencing unknown messages are silently ignored.

pub mod ledger;
pub mod reconciler;

pub use ledger::{ACCEPT_EMOJI, DECLINE_EMOJI, LineupLedger, LineupView};
pub use reconciler::{ReactionReconciler, ReconcileSignal};
