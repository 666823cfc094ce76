use std::collections::BTreeMap;
use std::fmt;

use crate::StagingRow;

/// Counts reported after finalization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub total: usize,
    /// Rows whose email is empty.
    pub failures: usize,
    /// Non-empty addresses that appear on more than one row, sorted.
    pub duplicate_emails: Vec<String>,
}

impl RunSummary {
    pub fn from_rows(rows: &[StagingRow]) -> Self {
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
        let mut failures = 0;
        for row in rows {
            let email = row.email.trim();
            if email.is_empty() {
                failures += 1;
            } else {
                *seen.entry(email).or_default() += 1;
            }
        }
        let duplicate_emails = seen
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(email, _)| email.to_string())
            .collect();

        Self {
            total: rows.len(),
            failures,
            duplicate_emails,
        }
    }

    /// Failure rate in percent; 0 for an empty run.
    pub fn failure_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.failures as f64 * 100.0 / self.total as f64
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total records: {}, failures: {}, failure rate: {:.2}%",
            self.total,
            self.failures,
            self.failure_rate()
        )
    }
}
