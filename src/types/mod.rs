//! Shared types

pub mod error;

pub use error::{OobError, Result};
