//! kubectl platform adapter for sfbd
//!
//! Provides:
//! - Namespace inventory via `kubectl get namespaces -o json`
//! - Non-blocking namespace deletion
//! - Context selection and per-command timeouts

mod adapter;
mod command;
mod namespaces;

pub use adapter::*;
pub use command::*;
pub use namespaces::*;
