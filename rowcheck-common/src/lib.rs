//! # rowcheck common library
//!
//! Shared code for the rowcheck service crates:
//! - Error types
//! - Bootstrap configuration loading (TOML + compiled defaults)
//! - Clock abstraction used for age calculations

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
pub use time::{Clock, FixedClock, SystemClock};
