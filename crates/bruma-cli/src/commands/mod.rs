//! CLI command implementations.

pub mod common;
pub mod devices;
pub mod modes;
pub mod play;
pub mod render;
