//! The six concrete mode engines.
//!
//! Each engine owns a fixed, purpose-built synthesis graph plus its
//! control schedules. They share a diagnostics/fallback core
//! ([`common::EngineShared`]) and differ in their graph and macro policy.

pub mod common;
pub mod drone;
pub mod environ;
pub mod generative;
pub mod khs;
pub mod memory;
pub mod oracle;
