//! Message purge engine.
//!
//! Given a channel, a count and an optional filter, pages backwards through
//! history and removes matching messages in bulk-delete chunks. Filters are
//! either a compiled [`predicate`] expression or a single author.

pub mod clock;
pub mod deleter;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod predicate;
pub mod request;
pub mod state;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::PurgeEngine;
pub use error::PurgeError;
pub use predicate::{compile, CompileError, EvalError, Predicate};
pub use request::{PurgeMode, PurgeRequest, PurgeResult, StopReason};
pub use tokio_util::sync::CancellationToken;
