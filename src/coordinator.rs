//! The round coordinator.
//!
//! [`Coordinator`] owns the authoritative global model and drives one
//! federated round at a time:
//!
//! 1. [`select_clients`](Coordinator::select_clients) - reproducible sampling
//! 2. [`train_round`](Coordinator::train_round) - push the global model, collect updates
//! 3. [`aggregate_and_commit`](Coordinator::aggregate_and_commit) - FedAvg and swap in the result
//! 4. [`evaluate`](Coordinator::evaluate) - push the global model, collect metrics
//!
//! Training only appends to the update log; the global model changes only in
//! step 3, and only by replacing the whole state at once.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregators::{fedavg, AggregationSummary, UpdateRecord};
use crate::audit::AuditLog;
use crate::client::{Client, Split, TrainParams};
use crate::config::{CoordinatorConfig, DispatchMode};
use crate::error::CoordinatorError;
use crate::model::ModelState;
use crate::selection::sample_indices;

/// Bytes moved for one client during a training dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStats {
    /// Bytes uploaded by the client (its update)
    pub bytes_written: u64,
    /// Bytes downloaded by the client (the global model)
    pub bytes_read: u64,
}

/// Per-client transfer accounting of one training dispatch, keyed by client id.
///
/// Both directions are charged the client's model size. Real uploads may be
/// smaller or larger than the download, so this is an approximation.
pub type SysMetrics = HashMap<String, TransferStats>;

/// Identity metadata for a list of clients.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientInfo {
    /// Client ids in list order
    pub ids: Vec<String>,
    /// Group label per client id
    pub groups: HashMap<String, String>,
    /// Training sample count per client id (test samples are not included)
    pub num_samples: HashMap<String, u64>,
}

/// Federated round coordinator over clients of type `C`.
///
/// `C` may be a concrete type or a trait object such as
/// `dyn Client<Metrics = M>`.
pub struct Coordinator<C: Client + ?Sized> {
    config: CoordinatorConfig,
    global: ModelState,
    selected: Vec<Arc<C>>,
    current_round: Option<u64>,
    updates: Vec<UpdateRecord>,
    audit: AuditLog,
}

impl<C: Client + ?Sized> Coordinator<C> {
    /// Create a coordinator around an initial global model.
    pub fn new(initial: ModelState, config: CoordinatorConfig) -> Result<Self, CoordinatorError> {
        config.validate()?;
        info!(
            params = initial.len(),
            scalars = initial.num_parameters(),
            "coordinator initialised"
        );
        Ok(Self {
            config,
            global: initial,
            selected: Vec::new(),
            current_round: None,
            updates: Vec::new(),
            audit: AuditLog::new(),
        })
    }

    /// Create a coordinator whose global model is read from a checkpoint.
    pub fn from_checkpoint(
        path: impl AsRef<Path>,
        config: CoordinatorConfig,
    ) -> Result<Self, CoordinatorError> {
        Self::new(ModelState::load(path)?, config)
    }

    /// Current global model.
    pub fn global_model(&self) -> &ModelState {
        &self.global
    }

    /// Active configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Clients chosen by the latest selection.
    pub fn selected_clients(&self) -> &[Arc<C>] {
        &self.selected
    }

    /// Round index of the latest selection.
    pub fn current_round(&self) -> Option<u64> {
        self.current_round
    }

    /// Updates collected since the last aggregation.
    pub fn pending_updates(&self) -> &[UpdateRecord] {
        &self.updates
    }

    /// Drop all collected updates without aggregating them.
    pub fn clear_updates(&mut self) {
        self.updates.clear();
    }

    /// Record of every committed aggregation.
    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Total number of scalar parameters in the global model.
    pub fn num_parameters(&self) -> usize {
        self.global.num_parameters()
    }

    /// Select up to `target_count` distinct clients from `pool` for `round`.
    ///
    /// The same `round` and `pool` always yield the same subset. Replaces the
    /// current selection and returns `(num_train_samples, num_test_samples)`
    /// for each chosen client in selection order. An empty pool or a zero
    /// count selects nobody.
    pub fn select_clients(
        &mut self,
        round: u64,
        pool: &[Arc<C>],
        target_count: usize,
    ) -> Vec<(u64, u64)> {
        self.selected = sample_indices(round, pool.len(), target_count)
            .into_iter()
            .map(|i| Arc::clone(&pool[i]))
            .collect();
        self.current_round = Some(round);

        info!(
            round,
            pool = pool.len(),
            selected = self.selected.len(),
            "clients selected"
        );

        self.selected
            .iter()
            .map(|c| (c.num_train_samples(), c.num_test_samples()))
            .collect()
    }

    /// [`select_clients`](Self::select_clients) with the configured
    /// `clients_per_round`.
    pub fn select_clients_default(&mut self, round: u64, pool: &[Arc<C>]) -> Vec<(u64, u64)> {
        let target = self.config.clients_per_round;
        self.select_clients(round, pool, target)
    }

    /// Train the global model on `clients` (or the current selection).
    ///
    /// Every client first loads the current global model, then trains with
    /// `params`; its `(sample_count, state)` is appended to the update log.
    /// The global model itself is not touched.
    ///
    /// # Errors
    ///
    /// The first client failure aborts the dispatch and is returned as
    /// [`CoordinatorError::Client`]. Updates from clients that finished
    /// before it stay in the log.
    pub fn train_round(
        &mut self,
        params: &TrainParams,
        clients: Option<&[Arc<C>]>,
    ) -> Result<SysMetrics, CoordinatorError> {
        let dispatch: Vec<Arc<C>> = match clients {
            Some(list) => list.to_vec(),
            None => self.selected.clone(),
        };

        let mut metrics: SysMetrics = dispatch
            .iter()
            .map(|c| (c.id().to_string(), TransferStats::default()))
            .collect();

        if dispatch.is_empty() {
            debug!("training dispatch with no clients");
            return Ok(metrics);
        }

        match self.config.dispatch {
            DispatchMode::Sequential => {
                for client in &dispatch {
                    let (samples, state) = run_training(&self.global, &**client, params)?;
                    self.record_update(&**client, samples, state, &mut metrics);
                }
            }
            DispatchMode::Parallel => {
                let mut seen = HashSet::new();
                for client in &dispatch {
                    if !seen.insert(client.id()) {
                        return Err(CoordinatorError::DuplicateClient(client.id().to_string()));
                    }
                }

                let global = &self.global;
                let results: Vec<Result<(u64, ModelState), CoordinatorError>> = dispatch
                    .par_iter()
                    .map(|client| run_training(global, &**client, params))
                    .collect();

                for (client, result) in dispatch.iter().zip(results) {
                    let (samples, state) = result?;
                    self.record_update(&**client, samples, state, &mut metrics);
                }
            }
        }

        info!(
            round = ?self.current_round,
            clients = dispatch.len(),
            pending = self.updates.len(),
            "training dispatch complete"
        );
        Ok(metrics)
    }

    /// [`train_round`](Self::train_round) with the configured training parameters.
    pub fn train_round_default(
        &mut self,
        clients: Option<&[Arc<C>]>,
    ) -> Result<SysMetrics, CoordinatorError> {
        let params = self.config.train.clone();
        self.train_round(&params, clients)
    }

    fn record_update(&mut self, client: &C, samples: u64, state: ModelState, metrics: &mut SysMetrics) {
        let size = client.model_size_bytes();
        let stats = metrics.entry(client.id().to_string()).or_default();
        stats.bytes_read += size;
        stats.bytes_written += size;
        self.updates.push(UpdateRecord::new(samples, state));
    }

    /// Replace the global model with the sample-weighted average of the
    /// collected updates and empty the update log.
    ///
    /// With no updates, or a total sample count of zero, the global model is
    /// left as it was.
    ///
    /// # Errors
    ///
    /// [`CoordinatorError::SchemaMismatch`] / [`CoordinatorError::ShapeMismatch`]
    /// if an update does not match the global schema. The global model and
    /// the update log are then left untouched.
    pub fn aggregate_and_commit(&mut self) -> Result<AggregationSummary, CoordinatorError> {
        let n_updates = self.updates.len();
        let total_weight = self
            .updates
            .iter()
            .fold(0u64, |acc, u| acc.saturating_add(u.sample_count));
        let applied = total_weight > 0;

        let next = fedavg(&self.global, &self.updates).map_err(|e| {
            warn!(round = ?self.current_round, error = %e, "aggregation rejected");
            e
        })?;
        if applied {
            self.global = next;
        } else if n_updates > 0 {
            warn!(
                round = ?self.current_round,
                n_updates,
                "total sample weight is zero; global model unchanged"
            );
        }

        self.updates.clear();

        let summary = AggregationSummary {
            round: self.current_round,
            n_updates,
            total_weight,
            applied,
        };
        info!(
            round = ?summary.round,
            n_updates,
            total_weight,
            applied,
            "aggregation committed"
        );
        self.audit.push(summary.clone());
        Ok(summary)
    }

    /// Evaluate the global model on `clients` (or the current selection).
    ///
    /// Each client loads the current global model and runs its local test on
    /// `split`. Metrics are returned per client id, uninterpreted.
    pub fn evaluate(
        &self,
        clients: Option<&[Arc<C>]>,
        batch_size: usize,
        split: Split,
    ) -> Result<HashMap<String, C::Metrics>, CoordinatorError> {
        let list = clients.unwrap_or(self.selected.as_slice());
        let mut metrics = HashMap::with_capacity(list.len());

        for client in list {
            let id = client.id();
            client
                .load_state(&self.global)
                .map_err(|source| client_failure(id, "load", source))?;
            let m = client
                .test(batch_size, split)
                .map_err(|source| client_failure(id, "test", source))?;
            debug!(client = id, split = split.as_str(), "client evaluated");
            metrics.insert(id.to_string(), m);
        }

        Ok(metrics)
    }

    /// [`evaluate`](Self::evaluate) with the configured `eval_batch_size`.
    pub fn evaluate_default(
        &self,
        clients: Option<&[Arc<C>]>,
        split: Split,
    ) -> Result<HashMap<String, C::Metrics>, CoordinatorError> {
        self.evaluate(clients, self.config.eval_batch_size, split)
    }

    /// Ids, group labels and training sample counts of `clients` (or the
    /// current selection).
    pub fn client_info(&self, clients: Option<&[Arc<C>]>) -> ClientInfo {
        let list = clients.unwrap_or(self.selected.as_slice());
        ClientInfo {
            ids: list.iter().map(|c| c.id().to_string()).collect(),
            groups: list
                .iter()
                .map(|c| (c.id().to_string(), c.group().to_string()))
                .collect(),
            num_samples: list
                .iter()
                .map(|c| (c.id().to_string(), c.num_train_samples()))
                .collect(),
        }
    }

    /// Write the global model to a checkpoint at `path`.
    pub fn save_model(&self, path: impl AsRef<Path>) -> Result<PathBuf, CoordinatorError> {
        self.global.save(path)
    }
}

fn run_training<C: Client + ?Sized>(
    global: &ModelState,
    client: &C,
    params: &TrainParams,
) -> Result<(u64, ModelState), CoordinatorError> {
    let id = client.id();
    client
        .load_state(global)
        .map_err(|source| client_failure(id, "load", source))?;
    let (samples, state) = client
        .train(params)
        .map_err(|source| client_failure(id, "train", source))?;
    debug!(client = id, samples, "client trained");
    Ok((samples, state))
}

fn client_failure(id: &str, stage: &'static str, source: crate::error::ClientError) -> CoordinatorError {
    CoordinatorError::Client {
        client_id: id.to_string(),
        stage,
        source,
    }
}
