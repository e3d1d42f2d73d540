pub mod blob;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod evidence;
pub mod model;
pub mod report;
pub mod risk;
pub mod stats;
pub mod storage;

pub use errors::{AttestError, ConfigError, Result};
