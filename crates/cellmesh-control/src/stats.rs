//! Counters for controller activity.

use serde::Serialize;

/// What the controller has done since it started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ControllerStats {
    /// Allocation ticks evaluated, including skipped ones
    pub ticks: u64,
    /// Ticks skipped (coordinator, no neighbor, or unknown timer)
    pub skipped: u64,
    /// Successful add requests
    pub adds: u64,
    /// Failed add requests
    pub add_failures: u64,
    /// Successful remove requests
    pub removes: u64,
    /// Failed remove requests
    pub remove_failures: u64,
    /// Flushes issued against a replaced neighbor
    pub flushes: u64,
    /// Reconcile requests, both fallback and periodic
    pub reconciles: u64,
}

impl ControllerStats {
    /// Total negotiation requests issued.
    pub fn requests(&self) -> u64 {
        self.adds
            + self.add_failures
            + self.removes
            + self.remove_failures
            + self.flushes
            + self.reconciles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_sum_every_call() {
        let stats = ControllerStats {
            ticks: 10,
            skipped: 3,
            adds: 2,
            add_failures: 1,
            removes: 1,
            remove_failures: 1,
            flushes: 1,
            reconciles: 2,
        };
        assert_eq!(stats.requests(), 8);
    }

    #[test]
    fn serializes_as_flat_object() {
        let json = serde_json::to_value(ControllerStats::default()).unwrap();
        assert_eq!(json["ticks"], 0);
        assert_eq!(json["reconciles"], 0);
    }
}
