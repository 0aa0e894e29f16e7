//! Aggregation of client updates into a new global model.
//!
//! - [`fedavg`] - sample-weighted federated averaging over a [`ModelState`]
//!
//! [`UpdateRecord`] is the unit collected during training dispatch;
//! [`AggregationSummary`] describes one committed aggregation.

pub mod fedavg;

pub use fedavg::fedavg;

use serde::{Deserialize, Serialize};

use crate::model::ModelState;

/// One client's contribution to a round.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateRecord {
    /// Number of samples the client trained on (the FedAvg weight)
    pub sample_count: u64,
    /// The client's local model after training, owned by the update log
    pub state: ModelState,
}

impl UpdateRecord {
    /// Create a record.
    pub fn new(sample_count: u64, state: ModelState) -> Self {
        Self {
            sample_count,
            state,
        }
    }
}

/// Outcome of one aggregate-and-commit step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregationSummary {
    /// Round index of the latest selection, if any selection happened
    pub round: Option<u64>,
    /// Number of updates consumed
    pub n_updates: usize,
    /// Sum of the updates' sample counts, saturating at `u64::MAX`
    pub total_weight: u64,
    /// Whether the global model changed (false when the total weight was zero)
    pub applied: bool,
}
