//! # twobot-store
//!
//! Per-guild settings persisted as a JSON document.

mod store;

pub use store::ServerStore;
