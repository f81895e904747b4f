use crate::device::Device;
use crate::error::{HelperError, Result};
use ndarray::{ArrayD, IxDyn};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;

/// A dense f32 array tagged with the device it lives on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
	pub data: ArrayD<f32>,
	pub device: Device,
}

impl Tensor {
	pub fn new(data: ArrayD<f32>) -> Self {
		Tensor {
			data,
			device: Device::Cpu,
		}
	}

	pub fn zeros(shape: &[usize]) -> Self {
		Tensor::new(ArrayD::zeros(IxDyn(shape)))
	}

	pub fn from_shape_vec(shape: &[usize], values: Vec<f32>) -> Result<Self> {
		let data = ArrayD::from_shape_vec(IxDyn(shape), values)
			.map_err(|e| HelperError::InvalidParameter(format!("Tensor shape {:?}: {}", shape, e)))?;
		Ok(Tensor::new(data))
	}

	/// Uniform initialisation in `[-bound, bound)` drawn from `rng`.
	pub fn uniform<R: Rng + ?Sized>(shape: &[usize], bound: f32, rng: &mut R) -> Self {
		Tensor::new(ArrayD::random_using(IxDyn(shape), Uniform::new(-bound, bound), rng))
	}

	pub fn shape(&self) -> &[usize] {
		self.data.shape()
	}

	pub fn numel(&self) -> usize {
		self.data.len()
	}

	/// Returns a copy placed on `device`.
	pub fn to(&self, device: Device) -> Tensor {
		Tensor {
			data: self.data.clone(),
			device,
		}
	}

	pub fn to_device(&mut self, device: Device) {
		self.device = device;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::rngs::StdRng;
	use rand::SeedableRng;

	#[test]
	fn test_to_relocates_copy_only() {
		let original = Tensor::zeros(&[2, 3]);
		let moved = original.to(Device::Cuda(1));
		assert_eq!(original.device, Device::Cpu);
		assert_eq!(moved.device, Device::Cuda(1));
		assert_eq!(moved.shape(), &[2, 3]);
	}

	#[test]
	fn test_from_shape_vec_rejects_bad_length() {
		assert!(Tensor::from_shape_vec(&[2, 2], vec![1.0; 3]).is_err());
		let t = Tensor::from_shape_vec(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
		assert_eq!(t.numel(), 4);
	}

	#[test]
	fn test_uniform_is_bounded_and_seeded() {
		let a = Tensor::uniform(&[4, 4], 0.5, &mut StdRng::seed_from_u64(7));
		let b = Tensor::uniform(&[4, 4], 0.5, &mut StdRng::seed_from_u64(7));
		assert_eq!(a, b);
		assert!(a.data.iter().all(|v| *v >= -0.5 && *v < 0.5));
	}
}
