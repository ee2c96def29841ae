pub mod build_name;
pub mod config;
pub mod driver;
pub mod error;
pub mod http;
pub mod hub;
pub mod logging;
pub mod notify;
pub mod paths;
pub mod releases;
pub mod remote;
pub mod ssh;
pub mod stages;
pub mod wait;

#[cfg(test)]
pub(crate) mod fakes;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
