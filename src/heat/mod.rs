pub mod aggregate;
pub mod exec;
pub mod output;

pub use aggregate::{Aggregator, HeatQuery};
pub use exec::{exec_day, exec_heat, exec_today};
pub use output::{output_calendar, output_commits, output_json, output_ndjson};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag telling background reads to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
