pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod heat;
pub mod import;
pub mod logging;
pub mod model;
pub mod repos;
pub mod store;
pub mod util;

pub use error::{GitError, PulseError, Result};
