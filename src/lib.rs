//! Notification fan-out and aggregation engine.
//!
//! Turns domain events (follows, comments, reactions, moderation flags)
//! into recipient-facing notification rows under at-least-once delivery:
//! bursty events aggregate into a single denormalized row, creation and
//! removal are idempotent against a natural key, and moderator assignment
//! stays fair via cooldowns and randomized sampling.

pub mod config;
pub mod engine;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod snapshot;
pub mod store;
