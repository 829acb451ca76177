//! Platform collaborator interfaces for sfbd
//!
//! This crate defines the interface between the reconciliation engine and
//! the platform that owns policies and resources. It contains no platform
//! code itself, apart from an in-memory mock for tests.

mod mock;
mod resource;
mod traits;

pub use mock::*;
pub use resource::*;
pub use traits::*;
