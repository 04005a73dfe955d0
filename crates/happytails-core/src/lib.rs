//! Shared plumbing for HappyTails services: env config, tracing, HTTP layers.

pub mod blocking;
pub mod config;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
