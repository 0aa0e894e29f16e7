//! Binary checkpoints of a [`ModelState`].
//!
//! Layout: 4-byte magic `FLCK`, little-endian `u32` format version, then the
//! bincode encoding of the state.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::ModelState;
use crate::error::CoordinatorError;

/// File magic for fedround checkpoints.
pub const MAGIC: &[u8; 4] = b"FLCK";

/// Current checkpoint format version.
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = MAGIC.len() + 4;

impl ModelState {
    /// Encode the state as checkpoint bytes.
    pub fn to_checkpoint_bytes(&self) -> Result<Vec<u8>, CoordinatorError> {
        let body = bincode::serialize(self)?;
        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode checkpoint bytes produced by [`to_checkpoint_bytes`](Self::to_checkpoint_bytes).
    pub fn from_checkpoint_bytes(bytes: &[u8]) -> Result<Self, CoordinatorError> {
        if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
            return Err(CoordinatorError::Checkpoint("missing FLCK header".into()));
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[MAGIC.len()..HEADER_LEN]);
        let version = u32::from_le_bytes(version);
        if version != FORMAT_VERSION {
            return Err(CoordinatorError::Checkpoint(format!(
                "unsupported format version {}",
                version
            )));
        }
        Ok(bincode::deserialize(&bytes[HEADER_LEN..])?)
    }

    /// Write the state to `path` and return the path written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<PathBuf, CoordinatorError> {
        let path = path.as_ref();
        let bytes = self.to_checkpoint_bytes()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "checkpoint saved");
        Ok(path.to_path_buf())
    }

    /// Read a state previously written with [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoordinatorError> {
        let bytes = fs::read(path.as_ref())?;
        Self::from_checkpoint_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tensor;
    use ndarray::{ArrayD, IxDyn};

    fn mixed_state() -> ModelState {
        ModelState::new()
            .with("conv.weight", Tensor::from_shape_vec(&[2, 2], vec![0.1, 0.2, 0.3, 0.4]).unwrap())
            .with("bn.running_var", ArrayD::<f64>::from_elem(IxDyn(&[2]), 1.0))
            .with("bn.num_batches_tracked", ArrayD::<i64>::from_elem(IxDyn(&[]), 7))
    }

    #[test]
    fn test_bytes_round_trip_keeps_dtypes() {
        let state = mixed_state();
        let bytes = state.to_checkpoint_bytes().unwrap();
        assert_eq!(&bytes[..4], MAGIC);
        let restored = ModelState::from_checkpoint_bytes(&bytes).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_rejects_foreign_file() {
        let err = ModelState::from_checkpoint_bytes(b"PK\x03\x04garbage").unwrap_err();
        assert!(matches!(err, CoordinatorError::Checkpoint(_)));
    }

    #[test]
    fn test_rejects_future_version() {
        let mut bytes = mixed_state().to_checkpoint_bytes().unwrap();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        let err = ModelState::from_checkpoint_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("version 99"));
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt").join("round_3.flck");
        let written = mixed_state().save(&path).unwrap();
        assert_eq!(written, path);
        assert_eq!(ModelState::load(&path).unwrap(), mixed_state());
    }
}
