//! mkvshrink-core: shared error type, stream model, and configuration.
//!
//! This crate is the foundational dependency for the other mkvshrink crates,
//! providing the unified error type, the per-file stream table produced by
//! probing, the four-slot stream selection consumed by the encoder, and the
//! application configuration.

pub mod config;
pub mod error;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use media::*;
