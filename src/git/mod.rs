pub mod exec;
pub mod locator;
pub mod log;
pub mod parse;

pub use exec::{GitRunner, DEFAULT_TIMEOUT};
pub use locator::{is_git_repository, RepositoryLocator};
pub use log::LogExtractor;
pub use parse::{parse_log, COMMIT_SENTINEL};
