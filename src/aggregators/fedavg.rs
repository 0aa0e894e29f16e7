//! Sample-weighted federated averaging (McMahan et al., 2017).
//!
//! Each parameter of the new global model is
//! `sum(n_i * v_i) / sum(n_i)` over the round's updates, where `n_i` is the
//! number of samples client `i` trained on.

use ndarray::{ArrayD, IxDyn};
use rayon::prelude::*;

use super::UpdateRecord;
use crate::error::CoordinatorError;
use crate::model::{ModelState, Tensor};

/// Weighted FedAvg of `updates` over the schema of `prior`.
///
/// Accumulation runs in `f64`; every averaged parameter is cast back to the
/// storage type it has in `prior`. When the total sample weight is zero
/// (including an empty `updates`), `prior` is returned unchanged.
///
/// # Errors
///
/// [`CoordinatorError::SchemaMismatch`] if an update's key set differs from
/// `prior`'s, [`CoordinatorError::ShapeMismatch`] if a tensor shape differs.
pub fn fedavg(prior: &ModelState, updates: &[UpdateRecord]) -> Result<ModelState, CoordinatorError> {
    for (i, update) in updates.iter().enumerate() {
        if let Some(detail) = prior.schema_diff(&update.state) {
            return Err(CoordinatorError::SchemaMismatch { update: i, detail });
        }
    }

    let total_weight: f64 = updates.iter().map(|u| u.sample_count as f64).sum();
    if total_weight == 0.0 {
        return Ok(prior.clone());
    }

    let params: Vec<(&str, &Tensor)> = prior.iter().collect();
    let averaged: Vec<(String, Tensor)> = params
        .par_iter()
        .map(|&(key, base)| {
            let mut acc = ArrayD::<f64>::zeros(IxDyn(base.shape()));
            for (i, update) in updates.iter().enumerate() {
                let value = update.state.get(key).ok_or_else(|| CoordinatorError::SchemaMismatch {
                    update: i,
                    detail: format!("missing [{}]", key),
                })?;
                if value.shape() != base.shape() {
                    return Err(CoordinatorError::ShapeMismatch {
                        key: key.to_string(),
                        expected: base.shape().to_vec(),
                        actual: value.shape().to_vec(),
                    });
                }
                acc.scaled_add(update.sample_count as f64, &value.to_f64());
            }
            acc.mapv_inplace(|x| x / total_weight);
            Ok((key.to_string(), Tensor::from_f64(acc, base.dtype())))
        })
        .collect::<Result<_, CoordinatorError>>()?;

    Ok(averaged.into_iter().collect())
}
