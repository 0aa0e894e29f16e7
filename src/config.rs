//! Coordinator configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::client::TrainParams;
use crate::error::CoordinatorError;

/// How a training dispatch runs its clients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// One client at a time, in list order
    #[default]
    Sequential,
    /// Independent clients concurrently on the rayon pool
    Parallel,
}

/// Settings for a [`Coordinator`](crate::Coordinator).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Clients selected per round when no explicit count is given
    pub clients_per_round: usize,
    /// Local training parameters for [`train_round_default`](crate::Coordinator::train_round_default)
    pub train: TrainParams,
    /// Batch size for evaluation
    pub eval_batch_size: usize,
    /// Training dispatch mode
    pub dispatch: DispatchMode,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            clients_per_round: 20,
            train: TrainParams::default(),
            eval_batch_size: 10,
            dispatch: DispatchMode::Sequential,
        }
    }
}

impl CoordinatorConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, CoordinatorError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CoordinatorError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), CoordinatorError> {
        if self.train.num_epochs == 0 {
            return Err(CoordinatorError::Config("num_epochs must be >= 1".into()));
        }
        if self.train.batch_size == 0 || self.eval_batch_size == 0 {
            return Err(CoordinatorError::Config("batch sizes must be >= 1".into()));
        }
        if let Some(f) = self.train.minibatch_fraction {
            if !(f > 0.0 && f <= 1.0) {
                return Err(CoordinatorError::Config(format!(
                    "minibatch_fraction {} outside (0, 1]",
                    f
                )));
            }
        }
        Ok(())
    }
}
