//! Shared types for the store backend
//!
//! Common types used across the server crates: the unified error system,
//! order/payment status enums with their transition rules, and small
//! ID/time utilities.

pub mod error;
pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
