//! Message Bus Client Library
//!
//! Transport seams of the lock manager: the stream of lock notifications,
//! the lock command layer and the alarm panel, with a NATS implementation
//! of all three.

pub mod nats;
pub mod error;
pub mod traits;

pub use error::*;
pub use traits::*;
pub use nats::*;
