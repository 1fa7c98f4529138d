//! Cross-instance arbitration: decides whether *this* process is the
//! designated responder for single-responder triggers.

pub mod arbiter;
pub mod tracker;

pub use {
    arbiter::{Liveness, PriorityArbiter, Visibility, designated},
    tracker::BotTracker,
};
