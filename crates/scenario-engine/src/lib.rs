//! Scenario simulation engine for financial-literacy learning.
//!
//! The [`simulation`] module holds the engine itself; [`config`], [`telemetry`], and [`error`]
//! carry the ambient pieces shared with the service binary.

pub mod config;
pub mod error;
pub mod simulation;
pub mod telemetry;
