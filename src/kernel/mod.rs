//! Event-driven decision core.
//!
//! Cooldown and classification are pure and never fail; only calls into
//! [`crate::services`] can.

pub mod assistant;
pub mod bus;
pub mod cooldown;
pub mod coordinator;
pub mod event;
pub mod router;
pub mod time;
