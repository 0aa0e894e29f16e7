//! # fedround: federated round coordination
//!
//! A central coordinator for federated learning. Each round it samples a
//! reproducible subset of clients, pushes the global model to them, collects
//! their locally trained models and replaces the global model with the
//! sample-weighted average (FedAvg).
//!
//! ## Pieces
//!
//! - [`Coordinator`] - owns the global model and drives the round
//! - [`Client`] - capability contract a participant implements
//! - [`ModelState`] / [`Tensor`] - named parameter tensors
//! - [`fedavg()`] - the weighted average itself
//! - [`CoordinatorConfig`] - round defaults, loadable from JSON
//!
//! ## Round
//!
//! ```text
//! select_clients -> train_round -> aggregate_and_commit -> evaluate
//! ```
//!
//! Training never changes the global model. Only
//! [`Coordinator::aggregate_and_commit`] does, by swapping in a fully
//! computed state.

#![deny(missing_docs)]

pub mod aggregators;
pub mod audit;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod selection;

// Re-exports
pub use aggregators::fedavg;
pub use aggregators::{AggregationSummary, UpdateRecord};
pub use audit::AuditLog;
pub use client::{Client, ModelFootprint, Split, TrainParams};
pub use config::{CoordinatorConfig, DispatchMode};
pub use coordinator::{ClientInfo, Coordinator, SysMetrics, TransferStats};
pub use error::{ClientError, CoordinatorError};
pub use model::{DType, ModelState, Tensor};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
