//! Crate-level tests for whole encounters.
//!
//! - **Determinism tests**: the same seed replays the same fight
//! - **Integration tests**: scripted scenarios through the full turn pipeline
//! - **Helper functions**: creature and arena factories shared by unit tests
//!
//! # Test Structure
//!
//! - `determinism.rs`: seeded replays and property checks
//! - `integration.rs`: end-to-end scenarios with scripted dice
//! - `helpers.rs`: test setup utilities and factory functions

mod determinism;
pub mod helpers;
mod integration;
