//! PeerLink - Core constants, configuration, and error types.
//!
//! Everything in here is free of I/O. The other layers build on these
//! definitions.

mod config;
mod constants;
mod error;

pub use config::*;
pub use constants::*;
pub use error::*;
