/// Core Module for DBAL
///
/// This module contains the driver abstraction, the result normalization
/// pipeline and the error taxonomy shared by every engine.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{DbalError, Result};
