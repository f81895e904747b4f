//! The seams checkpoint helpers act on. Models and optimizers are owned by
//! the caller; the helpers only read and restore their state.

use crate::device::Device;
use crate::error::Result;
use crate::state::{OptimizerState, ParamGroup, ParamState, StateDict};
use crate::tensor::Tensor;
use std::collections::BTreeMap;

pub trait Module {
	fn state_dict(&self) -> StateDict;

	/// Replaces the module's parameters with `state`.
	///
	/// Implementations must be strict: missing keys, unexpected keys and shape
	/// mismatches are errors, and a failed load leaves the module untouched.
	fn load_state_dict(&mut self, state: &StateDict) -> Result<()>;

	fn parameters(&self) -> Vec<&Tensor>;

	fn parameters_mut(&mut self) -> Vec<&mut Tensor>;

	fn to_device(&mut self, device: Device) {
		for param in self.parameters_mut() {
			param.to_device(device);
		}
	}

	fn param_shapes(&self) -> Vec<Vec<usize>> {
		self.parameters().iter().map(|p| p.shape().to_vec()).collect()
	}
}

pub trait Optimizer {
	fn name(&self) -> &str;

	fn state_dict(&self) -> OptimizerState;

	/// Restores hyperparameters and per-parameter state. Fails without
	/// modifying the optimizer when `state` was recorded against a different
	/// parameter layout.
	fn load_state_dict(&mut self, state: OptimizerState) -> Result<()>;

	/// Live per-parameter state, keyed by parameter index.
	fn state_mut(&mut self) -> &mut BTreeMap<usize, ParamState>;

	fn param_groups(&self) -> &[ParamGroup];

	/// Applies one update to `params` from `grads`, both in optimizer order.
	fn step(&mut self, params: &mut [&mut Tensor], grads: &[Tensor]) -> Result<()>;
}
