//! Dense parameter tensors with a tagged storage representation.
//!
//! Clients may hand back parameters in whatever precision their local model
//! stores them. Aggregation always works on an `f64` view of the data
//! ([`Tensor::to_f64`]) and casts the result back to the storage type of the
//! global model ([`Tensor::from_f64`]).

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

/// Element type of a [`Tensor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DType {
    /// 32-bit float (the usual parameter storage)
    F32,
    /// 64-bit float
    F64,
    /// 64-bit signed integer (step counters, e.g. batch-norm `num_batches_tracked`)
    I64,
}

impl DType {
    /// Size of one element in bytes.
    pub fn size_of(self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F64 | DType::I64 => 8,
        }
    }
}

/// A dense n-dimensional parameter array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Tensor {
    /// `f32` storage
    F32(ArrayD<f32>),
    /// `f64` storage
    F64(ArrayD<f64>),
    /// `i64` storage
    I64(ArrayD<i64>),
}

impl Tensor {
    /// Zero-dimensional `f32` tensor holding `value`.
    pub fn scalar(value: f32) -> Self {
        Tensor::F32(ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// `f32` tensor of the given shape filled with `value`.
    pub fn filled(shape: &[usize], value: f32) -> Self {
        Tensor::F32(ArrayD::from_elem(IxDyn(shape), value))
    }

    /// `f32` tensor of the given shape from row-major data.
    pub fn from_shape_vec(shape: &[usize], data: Vec<f32>) -> Result<Self, ndarray::ShapeError> {
        Ok(Tensor::F32(ArrayD::from_shape_vec(IxDyn(shape), data)?))
    }

    /// Storage element type.
    pub fn dtype(&self) -> DType {
        match self {
            Tensor::F32(_) => DType::F32,
            Tensor::F64(_) => DType::F64,
            Tensor::I64(_) => DType::I64,
        }
    }

    /// Shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        match self {
            Tensor::F32(a) => a.shape(),
            Tensor::F64(a) => a.shape(),
            Tensor::I64(a) => a.shape(),
        }
    }

    /// Number of scalar elements.
    pub fn len(&self) -> usize {
        match self {
            Tensor::F32(a) => a.len(),
            Tensor::F64(a) => a.len(),
            Tensor::I64(a) => a.len(),
        }
    }

    /// Whether the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw payload size in bytes.
    pub fn nbytes(&self) -> usize {
        self.len() * self.dtype().size_of()
    }

    /// Upcast a copy of the data to `f64`.
    pub fn to_f64(&self) -> ArrayD<f64> {
        match self {
            Tensor::F32(a) => a.mapv(f64::from),
            Tensor::F64(a) => a.clone(),
            Tensor::I64(a) => a.mapv(|x| x as f64),
        }
    }

    /// Cast `values` into the given storage type.
    ///
    /// Integer targets round to the nearest value rather than truncating
    /// toward zero.
    pub fn from_f64(values: ArrayD<f64>, dtype: DType) -> Self {
        match dtype {
            DType::F32 => Tensor::F32(values.mapv(|x| x as f32)),
            DType::F64 => Tensor::F64(values),
            DType::I64 => Tensor::I64(values.mapv(|x| x.round() as i64)),
        }
    }
}

impl From<ArrayD<f32>> for Tensor {
    fn from(a: ArrayD<f32>) -> Self {
        Tensor::F32(a)
    }
}

impl From<ArrayD<f64>> for Tensor {
    fn from(a: ArrayD<f64>) -> Self {
        Tensor::F64(a)
    }
}

impl From<ArrayD<i64>> for Tensor {
    fn from(a: ArrayD<i64>) -> Self {
        Tensor::I64(a)
    }
}
