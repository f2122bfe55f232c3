//! Crate-level scenario tests.
//!
//! # Test Structure
//!
//! - `integration.rs`: end-to-end encounters through the public session API
//! - `determinism.rs`: same seed and inputs produce identical encounters
//! - `properties.rs`: proptest invariants for pools, ordering and challenges
//! - `helpers.rs`: roster builders and session drivers

mod determinism;
mod helpers;
