use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::log::Severity;

/// Per-day severity counters, keyed by ISO date.
///
/// Created lazily on the first write of a day and mutated only through the
/// aggregator's atomic increment; never deleted by this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCounter {
    /// Calendar day the counters cover (ISO `YYYY-MM-DD` on the wire).
    pub date: NaiveDate,
    pub critical_count: u64,
    pub warning_count: u64,
    pub info_count: u64,
}

impl SummaryCounter {
    /// Builds the first counter document for a day, with the triggering
    /// severity at 1 and the others at 0.
    #[must_use]
    pub fn first(date: NaiveDate, severity: Severity) -> Self {
        let mut counter = Self {
            date,
            critical_count: 0,
            warning_count: 0,
            info_count: 0,
        };
        counter.bump(severity);
        counter
    }

    /// Increments the counter for `severity` by one.
    pub fn bump(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical_count += 1,
            Severity::Warning => self.warning_count += 1,
            Severity::Info => self.info_count += 1,
        }
    }

    /// Returns the count recorded for `severity`.
    #[must_use]
    pub fn count_for(&self, severity: Severity) -> u64 {
        match severity {
            Severity::Critical => self.critical_count,
            Severity::Warning => self.warning_count,
            Severity::Info => self.info_count,
        }
    }
}
