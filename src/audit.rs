//! Aggregation audit log for post-hoc analysis.
//!
//! Every committed aggregation appends one [`AggregationSummary`], so a run
//! can be replayed or compared round by round.

use serde::{Deserialize, Serialize};

use crate::aggregators::AggregationSummary;

/// Append-only log of committed aggregations.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuditLog {
    entries: Vec<AggregationSummary>,
}

impl AuditLog {
    /// Create a new, empty audit log.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry to the log.
    pub fn push(&mut self, entry: AggregationSummary) {
        self.entries.push(entry);
    }

    /// Get all entries.
    pub fn entries(&self) -> &[AggregationSummary] {
        &self.entries
    }

    /// Most recent entry.
    pub fn last(&self) -> Option<&AggregationSummary> {
        self.entries.last()
    }

    /// Number of recorded aggregations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of aggregations that actually changed the global model.
    pub fn applied_count(&self) -> usize {
        self.entries.iter().filter(|e| e.applied).count()
    }

    /// Serialize the audit log to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
