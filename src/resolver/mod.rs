//! Recitation source resolution.
//!
//! This module provides:
//! * [`ReciterId`] / [`ReciterCatalog`]: mirror templates per reciter, with a
//!   default used for unknown ids.
//! * [`SourceResolver`]: tries candidate locations in order with a
//!   per-attempt timeout.
//! * [`ResolveError`]: the single exhaustion failure surfaced to the engine.

pub mod catalog;
pub mod source;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use catalog::{CatalogError, Reciter, ReciterCatalog, ReciterId};
pub use source::{ResolveError, SourceResolver};
