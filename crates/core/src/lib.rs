//! Fleet health domain logic.
//!
//! Pure types and functions shared by the aggregation store and the HTTP
//! layer: per-device aggregate stats, the derived availability metrics,
//! the error taxonomy, and device identifier validation.

pub mod device;
pub mod duration;
pub mod error;
pub mod validation;
