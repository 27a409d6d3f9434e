//! Orchestration logic
//!
//! This module contains the engine proper. It performs no I/O of its own;
//! external work happens inside step recipes and run controls.
//!
//! # Submodules
//!
//! - [`counters`] - Reference-counted "is building" occupancy maps
//! - [`queue`] - Request ordering and expansion into queued items
//! - [`stop`] - Stop-before-build policy evaluation
//! - [`parse_gate`] - Parse-precondition gate
//! - [`scheduler`] - Execution tree construction and interpretation
//! - [`manager`] - The facade and its queue state machine

pub mod counters;
pub mod manager;
pub mod parse_gate;
pub mod queue;
pub mod scheduler;
pub mod stop;
