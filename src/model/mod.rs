//! Model parameter state shared between the coordinator and its clients.
//!
//! - [`ModelState`] - named parameter tensors (the global model)
//! - [`Tensor`] - one parameter with its storage type
//! - [`checkpoint`] - binary save/load of a [`ModelState`]

pub mod checkpoint;
pub mod tensor;

pub use tensor::{DType, Tensor};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Named parameter tensors, ordered by parameter name.
///
/// The key set is the model schema: every client update aggregated into a
/// state must carry exactly the same keys with the same shapes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelState {
    params: BTreeMap<String, Tensor>,
}

impl ModelState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self {
            params: BTreeMap::new(),
        }
    }

    /// Insert or replace a parameter, returning the previous tensor.
    pub fn insert(&mut self, name: impl Into<String>, tensor: impl Into<Tensor>) -> Option<Tensor> {
        self.params.insert(name.into(), tensor.into())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, tensor: impl Into<Tensor>) -> Self {
        self.insert(name, tensor);
        self
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.params.get(name)
    }

    /// Whether a parameter exists.
    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Number of named parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the state has no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameter names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// Iterate over `(name, tensor)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Total number of scalar parameters across all tensors.
    pub fn num_parameters(&self) -> usize {
        self.params.values().map(Tensor::len).sum()
    }

    /// Raw payload size in bytes (sum of all tensor buffers).
    pub fn nbytes(&self) -> usize {
        self.params.values().map(Tensor::nbytes).sum()
    }

    /// Describe how `other`'s key set differs from this one, or `None` if
    /// both carry the same keys.
    pub fn schema_diff(&self, other: &ModelState) -> Option<String> {
        let missing: Vec<&str> = self.keys().filter(|k| !other.contains(k)).collect();
        let extra: Vec<&str> = other.keys().filter(|k| !self.contains(k)).collect();
        if missing.is_empty() && extra.is_empty() {
            return None;
        }
        let mut parts = Vec::new();
        if !missing.is_empty() {
            parts.push(format!("missing [{}]", missing.join(", ")));
        }
        if !extra.is_empty() {
            parts.push(format!("unexpected [{}]", extra.join(", ")));
        }
        Some(parts.join("; "))
    }
}

impl FromIterator<(String, Tensor)> for ModelState {
    fn from_iter<I: IntoIterator<Item = (String, Tensor)>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ModelState {
    type Item = (String, Tensor);
    type IntoIter = std::collections::btree_map::IntoIter<String, Tensor>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.into_iter()
    }
}
