//! Conversions between flat host buffers and burn tensors.

use burn::tensor::ElementConversion;
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

/// Build a `[rows, width]` float tensor from a row-major buffer.
pub fn rows_to_tensor<B: Backend>(data: &[f32], width: usize, device: &B::Device) -> Tensor<B, 2> {
    let rows = if width == 0 { 0 } else { data.len() / width };
    Tensor::from_data(TensorData::new(data.to_vec(), [rows, width]), device)
}

/// Build a `[len]` float tensor.
pub fn to_tensor1<B: Backend>(data: &[f32], device: &B::Device) -> Tensor<B, 1> {
    Tensor::from_data(TensorData::new(data.to_vec(), [data.len()]), device)
}

/// Copy a tensor back to the host, row-major.
pub fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor.into_data().iter::<f32>().collect()
}

/// Read a single-element tensor.
pub fn to_scalar<B: Backend>(tensor: Tensor<B, 1>) -> f32 {
    tensor.into_scalar().elem::<f32>()
}
