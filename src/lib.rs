//! Buildflow - Build orchestration engine for multi-project IDE builds
//!
//! This library turns a user request ("build", "clean", "deploy", "rebuild")
//! affecting one or more interdependent projects into an ordered, cancellable
//! execution of external build steps, while tracking progress, occupancy
//! state, and failures.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`model`] - Domain data model and collaborator traits (projects,
//!   targets, configurations, steps, kits, run controls)
//! - [`core`] - Orchestration logic (queue expansion, stop policy, parse
//!   gate, scheduler, facade)
//! - [`events`] - Typed event channel published to the host
//! - [`settings`] - Orchestration settings (TOML-backed)
//! - [`error`] - Error types and handling
//!
//! The host application constructs one [`core::manager::BuildManager`] at
//! startup, hands it the collaborator implementations, and consumes the
//! event stream it returns.

pub mod core;
pub mod error;
pub mod events;
pub mod model;
pub mod settings;

#[cfg(test)]
pub mod test_utils;
