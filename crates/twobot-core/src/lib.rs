//! # twobot-core
//!
//! Core types, traits, configuration, and error handling for twobot.

pub mod config;
pub mod error;
pub mod memory;
pub mod message;
pub mod server;
pub mod snowflake;
pub mod traits;

pub use config::shellexpand;
