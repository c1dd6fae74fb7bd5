//! # fivewhy Common Library
//!
//! Shared code for the fivewhy root-cause-analysis crates:
//! - Equipment failure record model and categorical defaults
//! - SQLite record store
//! - Configuration loading and root folder resolution
//! - Common error type

pub mod config;
pub mod db;
pub mod error;
pub mod record;

pub use error::{Error, Result};
pub use record::{CategoricalField, Record, RecordUpdate};
