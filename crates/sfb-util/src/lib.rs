//! Shared utilities for sfbd
//!
//! This crate provides:
//! - ID types (PolicyRef, ResourceName, PassId)
//! - Clock capability and age arithmetic
//! - Default paths for config and data directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
