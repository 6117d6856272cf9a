//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod policy;
pub mod status;
pub mod truth;

pub use email::{Email, EmailError};
pub use id::*;
pub use policy::CategoryNamePolicy;
pub use status::*;
pub use truth::{TruthValueError, parse_truth_value};
