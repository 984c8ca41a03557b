pub mod advisory;
pub mod arbiter;
pub mod config;
pub mod detect;
pub mod executor;
pub mod intent;
pub mod pipeline;
pub mod store;
pub mod telemetry;

// Re-export the turn surface for convenient access
pub use pipeline::{Pipeline, TurnOutcome};
