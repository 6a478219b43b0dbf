//! State module for tracking per-entity progress
//!
//! # Components
//!
//! - `EntityOutcome`: Final state of an entity (done, partially done, skipped, interrupted)
//! - `EntityReport`: Outcome plus emitted record count and failure cause
//!
//! Per-unit retry counters live with the resilience engine
//! ([`crate::resilience::RetryState`]); the graph pipeline's per-entity phase
//! machine lives with the graph crawler.

mod entity_state;

pub use entity_state::{EntityOutcome, EntityReport};
