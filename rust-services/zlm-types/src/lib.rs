//! ZHA Lock Manager Types
//!
//! Shared type definitions for bus events, ZHA notification decoding,
//! lock selection descriptors and command payloads used across the
//! lock manager crates.

pub mod events;
pub mod schemas;
pub mod zha;
pub mod error;

pub use events::*;
pub use schemas::*;
pub use zha::*;
pub use error::*;
