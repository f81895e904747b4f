//! Small reference models implementing [`Module`].

use crate::error::{HelperError, Result};
use crate::module::Module;
use crate::state::StateDict;
use crate::tensor::Tensor;
use ndarray::{Array1, Array2, ArrayD, Axis, Ix1, Ix2};
use rand::Rng;

/// Fully connected layer computing `x · Wᵀ + b`.
#[derive(Debug, Clone)]
pub struct Linear {
	pub weight: Tensor,
	pub bias: Tensor,
}

impl Linear {
	pub fn new<R: Rng + ?Sized>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
		let bound = 1.0 / (in_features.max(1) as f32).sqrt();
		Linear {
			weight: Tensor::uniform(&[out_features, in_features], bound, rng),
			bias: Tensor::uniform(&[out_features], bound, rng),
		}
	}

	pub fn in_features(&self) -> usize {
		self.weight.shape()[1]
	}

	pub fn out_features(&self) -> usize {
		self.weight.shape()[0]
	}

	/// `input` has shape `[batch, in_features]`.
	pub fn forward(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>> {
		let x = as_matrix(input)?;
		if x.ncols() != self.in_features() {
			return Err(HelperError::InvalidParameter(format!(
				"Linear expects {} input features, got {}",
				self.in_features(),
				x.ncols()
			)));
		}
		let w = as_matrix(&self.weight.data)?;
		let b: Array1<f32> = self
			.bias
			.data
			.clone()
			.into_dimensionality::<Ix1>()
			.map_err(|e| HelperError::InvalidParameter(format!("bias: {}", e)))?;
		let out = x.dot(&w.t()) + &b.insert_axis(Axis(0));
		Ok(out.into_dyn())
	}

	fn state_with_prefix(&self, prefix: &str, dict: &mut StateDict) {
		dict.insert(format!("{}weight", prefix), self.weight.clone());
		dict.insert(format!("{}bias", prefix), self.bias.clone());
	}

	fn copy_from(&mut self, prefix: &str, state: &StateDict) -> Result<()> {
		for (name, param) in [("weight", &mut self.weight), ("bias", &mut self.bias)].iter_mut() {
			let key = format!("{}{}", prefix, name);
			let incoming = state.get(&key).ok_or_else(|| HelperError::MissingKey(key.clone()))?;
			param.data.assign(&incoming.data);
		}
		Ok(())
	}
}

impl Module for Linear {
	fn state_dict(&self) -> StateDict {
		let mut dict = StateDict::new();
		self.state_with_prefix("", &mut dict);
		dict
	}

	fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
		self.state_dict().check_compatible(state)?;
		self.copy_from("", state)
	}

	fn parameters(&self) -> Vec<&Tensor> {
		vec![&self.weight, &self.bias]
	}

	fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
		vec![&mut self.weight, &mut self.bias]
	}
}

/// Stack of [`Linear`] layers with ReLU between consecutive layers.
#[derive(Debug, Clone)]
pub struct Sequential {
	layers: Vec<Linear>,
}

impl Sequential {
	pub fn new(layers: Vec<Linear>) -> Self {
		Sequential { layers }
	}

	/// Builds an MLP from layer widths, e.g. `[4, 8, 2]`.
	pub fn mlp<R: Rng + ?Sized>(widths: &[usize], rng: &mut R) -> Self {
		let layers = widths.windows(2).map(|w| Linear::new(w[0], w[1], rng)).collect();
		Sequential { layers }
	}

	pub fn layers(&self) -> &[Linear] {
		&self.layers
	}

	pub fn forward(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>> {
		let mut x = input.clone();
		for (i, layer) in self.layers.iter().enumerate() {
			x = layer.forward(&x)?;
			if i + 1 < self.layers.len() {
				x.mapv_inplace(|v| v.max(0.0));
			}
		}
		Ok(x)
	}
}

impl Module for Sequential {
	fn state_dict(&self) -> StateDict {
		let mut dict = StateDict::new();
		for (i, layer) in self.layers.iter().enumerate() {
			layer.state_with_prefix(&format!("{}.", i), &mut dict);
		}
		dict
	}

	fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
		self.state_dict().check_compatible(state)?;
		for (i, layer) in self.layers.iter_mut().enumerate() {
			layer.copy_from(&format!("{}.", i), state)?;
		}
		Ok(())
	}

	fn parameters(&self) -> Vec<&Tensor> {
		self.layers.iter().flat_map(|l| vec![&l.weight, &l.bias]).collect()
	}

	fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
		self.layers
			.iter_mut()
			.flat_map(|l| vec![&mut l.weight, &mut l.bias])
			.collect()
	}
}

fn as_matrix(data: &ArrayD<f32>) -> Result<Array2<f32>> {
	data.clone()
		.into_dimensionality::<Ix2>()
		.map_err(|e| HelperError::InvalidParameter(format!("expected a 2-d array: {}", e)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::rngs::StdRng;
	use rand::SeedableRng;

	#[test]
	fn test_linear_forward_shape() {
		let layer = Linear::new(3, 2, &mut StdRng::seed_from_u64(0));
		let input = ArrayD::from_elem(ndarray::IxDyn(&[5, 3]), 1.0f32);
		let out = layer.forward(&input).unwrap();
		assert_eq!(out.shape(), &[5, 2]);
	}

	#[test]
	fn test_linear_forward_rejects_wrong_width() {
		let layer = Linear::new(3, 2, &mut StdRng::seed_from_u64(0));
		let input = ArrayD::from_elem(ndarray::IxDyn(&[5, 4]), 1.0f32);
		assert!(layer.forward(&input).is_err());
	}

	#[test]
	fn test_sequential_state_dict_names() {
		let model = Sequential::mlp(&[4, 8, 2], &mut StdRng::seed_from_u64(0));
		let keys: Vec<String> = model.state_dict().keys().cloned().collect();
		assert_eq!(keys, vec!["0.weight", "0.bias", "1.weight", "1.bias"]);
		assert_eq!(model.parameters().len(), 4);
	}

	#[test]
	fn test_load_state_dict_copies_values_and_keeps_device() {
		let source = Sequential::mlp(&[2, 3], &mut StdRng::seed_from_u64(1));
		let mut target = Sequential::mlp(&[2, 3], &mut StdRng::seed_from_u64(2));
		target.to_device(crate::device::Device::Cuda(0));

		target.load_state_dict(&source.state_dict()).unwrap();
		for (a, b) in source.parameters().iter().zip(target.parameters()) {
			assert_eq!(a.data, b.data);
			assert_eq!(b.device, crate::device::Device::Cuda(0));
		}
	}

	#[test]
	fn test_failed_load_leaves_model_untouched() {
		let mut model = Sequential::mlp(&[2, 3], &mut StdRng::seed_from_u64(1));
		let before = model.state_dict();
		let other = Sequential::mlp(&[2, 4], &mut StdRng::seed_from_u64(2));
		assert!(model.load_state_dict(&other.state_dict()).is_err());
		assert_eq!(model.state_dict(), before);
	}
}
