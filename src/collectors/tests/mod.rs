//! Test module organization for measurement collection
//!
//! Shared fakes live in `support`; each component has its own test module.

pub mod scheduler_tests;
pub mod support;
