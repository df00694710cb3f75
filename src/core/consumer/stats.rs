//! Consumer counters

use crate::core::consumer::runtime::Route;
use serde::Serialize;

/// Counters of one consumer runtime
///
/// Shared by all workers behind a single lock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsumerStats {
    pub received: u64,
    pub completed: u64,
    pub discarded: u64,
    pub retried: u64,
    pub dead_lettered: u64,
    /// Deliveries left unacknowledged because routing failed
    pub routing_failures: u64,
}

impl ConsumerStats {
    pub fn record(&mut self, route: &Route) {
        match route {
            Route::Completed => self.completed += 1,
            Route::Discarded => self.discarded += 1,
            Route::Retried { .. } => self.retried += 1,
            Route::DeadLettered => self.dead_lettered += 1,
        }
    }

    /// Deliveries whose outcome is settled
    pub fn handled(&self) -> u64 {
        self.completed + self.discarded + self.retried + self.dead_lettered
    }
}
