//! Core decision logic for sfbd
//!
//! This crate contains:
//! - The staleness predicate (which resources a policy manages, and which are stale)
//! - The reconciliation engine (one stateless pass per policy instance)
//! - A configuration-backed policy store for the daemon

mod policy_store;
mod reconciler;
mod staleness;

pub use policy_store::*;
pub use reconciler::*;
pub use staleness::*;
