//! Consumer runtime
//!
//! Pulls deliveries from the input and retry topics, runs each through the
//! [`ExportOrchestrator`](crate::core::export::ExportOrchestrator) and routes
//! the outcome: acknowledge, republish to the retry topic with a `not_before`
//! time, or publish to the dead-letter topic. A delivery is acknowledged only
//! after its follow-up message (if any) has been published.

pub mod runtime;
pub mod stats;

pub use runtime::{ConsumerRuntime, ConsumerSettings, Route};
pub use stats::ConsumerStats;
