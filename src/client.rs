//! Capability contract the coordinator requires from a federated client.
//!
//! Clients are external collaborators: they own their data and their local
//! model, and they run local training. The coordinator only ever holds
//! shared handles (`Arc<C>`) to them.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::model::ModelState;

/// Local training hyper-parameters forwarded to each client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainParams {
    /// Local epochs per round
    pub num_epochs: u32,
    /// Local batch size
    pub batch_size: usize,
    /// Fraction of local data for minibatch SGD; `None` selects FedAvg-style
    /// full passes. The coordinator only forwards this value.
    pub minibatch_fraction: Option<f32>,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            num_epochs: 1,
            batch_size: 10,
            minibatch_fraction: None,
        }
    }
}

/// Which local dataset split a client evaluates on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    /// Local training data
    Train,
    /// Local held-out data
    Test,
}

impl Split {
    /// Lowercase name (`"train"` / `"test"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

/// Shape of a client's local model for bandwidth accounting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFootprint {
    /// One model instance of `bytes` serialized size
    Single {
        /// Serialized model size
        bytes: u64,
    },
    /// A data-parallel wrapper around `replicas` copies of one model
    Replicated {
        /// Serialized size of the wrapped model
        bytes: u64,
        /// Number of device replicas
        replicas: u32,
    },
}

impl ModelFootprint {
    /// Bytes moved per transfer: the wrapped model is sent once, regardless
    /// of how many replicas the client runs.
    pub fn transfer_bytes(self) -> u64 {
        match self {
            ModelFootprint::Single { bytes } | ModelFootprint::Replicated { bytes, .. } => bytes,
        }
    }
}

/// A participant in federated training.
///
/// Methods take `&self`; implementors keep their local model behind interior
/// mutability. The coordinator calls `load_state` immediately before each
/// `train`/`test` call on the same client and never interleaves two clients'
/// sequences on one handle.
pub trait Client: Send + Sync {
    /// Opaque evaluation result returned by [`test`](Self::test).
    type Metrics: Send;

    /// Unique client identifier.
    fn id(&self) -> &str;

    /// Group label (may be empty).
    fn group(&self) -> &str {
        ""
    }

    /// Number of local training samples.
    fn num_train_samples(&self) -> u64;

    /// Number of local test samples.
    fn num_test_samples(&self) -> u64;

    /// Overwrite the local model with `state`.
    fn load_state(&self, state: &ModelState) -> Result<(), ClientError>;

    /// Train locally and return `(samples_seen, local_state)`.
    fn train(&self, params: &TrainParams) -> Result<(u64, ModelState), ClientError>;

    /// Evaluate the local model on `split`.
    fn test(&self, batch_size: usize, split: Split) -> Result<Self::Metrics, ClientError>;

    /// Local model layout.
    fn footprint(&self) -> ModelFootprint;

    /// Bytes transferred per model download or upload.
    fn model_size_bytes(&self) -> u64 {
        self.footprint().transfer_bytes()
    }
}
