//! Shared types for SoftShelf services
//!
//! Carries the pieces every SoftShelf module needs: the common error type,
//! root folder / configuration resolution, and the event bus used to signal
//! catalog changes to downstream consumers.

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
