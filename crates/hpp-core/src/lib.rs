//! # hpp-core
//!
//! Shared vocabulary types and the common error type for the hppskim
//! workspace.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Flavor, IdTier, Mode, Shift, Variant, Z_MASS};
