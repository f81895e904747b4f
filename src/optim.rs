//! Reference optimizers implementing [`Optimizer`].

use crate::device::Device;
use crate::error::{HelperError, Result};
use crate::module::Optimizer;
use crate::state::{OptimizerState, ParamGroup, ParamState, StateValue};
use crate::tensor::Tensor;
use ndarray::Zip;
use std::collections::BTreeMap;

/// Bookkeeping shared by every optimizer: groups, per-parameter state and the
/// shapes of the parameters the optimizer was built against.
#[derive(Debug, Clone)]
struct ParamRegistry {
	param_groups: Vec<ParamGroup>,
	state: BTreeMap<usize, ParamState>,
	param_shapes: Vec<Vec<usize>>,
	param_devices: Vec<Device>,
}

impl ParamRegistry {
	fn new() -> Self {
		ParamRegistry {
			param_groups: Vec::new(),
			state: BTreeMap::new(),
			param_shapes: Vec::new(),
			param_devices: Vec::new(),
		}
	}

	fn add_group(&mut self, params: &[&Tensor], group: ParamGroup) {
		let start = self.param_shapes.len();
		for param in params {
			self.param_shapes.push(param.shape().to_vec());
			self.param_devices.push(param.device);
		}
		let mut group = group;
		group.params = (start..start + params.len()).collect();
		self.param_groups.push(group);
	}

	fn state_dict(&self) -> OptimizerState {
		OptimizerState {
			state: self.state.clone(),
			param_groups: self.param_groups.clone(),
		}
	}

	/// Maps saved parameter ids onto live ones by position, keeping the live
	/// id lists and taking hyperparameters from `incoming`.
	fn load(&mut self, incoming: OptimizerState) -> Result<()> {
		self.state_dict().check_compatible(&incoming, &self.param_shapes)?;

		let saved_ids: Vec<usize> = incoming.param_groups.iter().flat_map(|g| g.params.iter().copied()).collect();
		let live_ids: Vec<usize> = self.param_groups.iter().flat_map(|g| g.params.iter().copied()).collect();

		let mut state = BTreeMap::new();
		for (saved_id, entries) in incoming.state {
			if let Some(position) = saved_ids.iter().position(|id| *id == saved_id) {
				state.insert(live_ids[position], entries);
			}
		}

		for (live, saved) in self.param_groups.iter_mut().zip(incoming.param_groups) {
			live.lr = saved.lr;
			live.options = saved.options;
		}
		self.state = state;
		Ok(())
	}

	fn check_step_inputs(&self, params: &[&mut Tensor], grads: &[Tensor]) -> Result<()> {
		if params.len() != self.param_shapes.len() || grads.len() != self.param_shapes.len() {
			return Err(HelperError::StructureMismatch(format!(
				"optimizer tracks {} parameters, step got {} parameters and {} gradients",
				self.param_shapes.len(),
				params.len(),
				grads.len()
			)));
		}
		for (i, ((param, grad), shape)) in params.iter().zip(grads).zip(&self.param_shapes).enumerate() {
			if param.shape() != shape.as_slice() || grad.shape() != shape.as_slice() {
				return Err(HelperError::ShapeMismatch {
					key: format!("param.{}", i),
					expected: shape.clone(),
					found: grad.shape().to_vec(),
				});
			}
		}
		Ok(())
	}

	fn state_tensor(&mut self, index: usize, name: &str) -> &mut Tensor {
		let shape = self.param_shapes[index].clone();
		let device = self.param_devices[index];
		let entry = self
			.state
			.entry(index)
			.or_insert_with(ParamState::new)
			.entry(name.to_string())
			.or_insert_with(|| StateValue::Tensor(Tensor::zeros(&shape).to(device)));
		if entry.as_tensor().is_none() {
			*entry = StateValue::Tensor(Tensor::zeros(&shape).to(device));
		}
		match entry {
			StateValue::Tensor(t) => t,
			_ => unreachable!("state entry was just set to a tensor"),
		}
	}
}

/// Stochastic gradient descent with optional momentum and weight decay.
#[derive(Debug, Clone)]
pub struct Sgd {
	registry: ParamRegistry,
}

impl Sgd {
	pub fn new(params: &[&Tensor], lr: f64, momentum: f64) -> Self {
		let mut registry = ParamRegistry::new();
		registry.add_group(params, Self::group(lr, momentum));
		Sgd { registry }
	}

	fn group(lr: f64, momentum: f64) -> ParamGroup {
		ParamGroup::new(lr, Vec::new())
			.with_option("momentum", momentum)
			.with_option("weight_decay", 0.0)
	}

	pub fn add_param_group(&mut self, params: &[&Tensor], lr: f64, momentum: f64) {
		self.registry.add_group(params, Self::group(lr, momentum));
	}
}

impl Optimizer for Sgd {
	fn name(&self) -> &str {
		"SGD"
	}

	fn state_dict(&self) -> OptimizerState {
		self.registry.state_dict()
	}

	fn load_state_dict(&mut self, state: OptimizerState) -> Result<()> {
		self.registry.load(state)
	}

	fn state_mut(&mut self) -> &mut BTreeMap<usize, ParamState> {
		&mut self.registry.state
	}

	fn param_groups(&self) -> &[ParamGroup] {
		&self.registry.param_groups
	}

	fn step(&mut self, params: &mut [&mut Tensor], grads: &[Tensor]) -> Result<()> {
		self.registry.check_step_inputs(params, grads)?;

		for group in self.registry.param_groups.clone() {
			let lr = group.lr as f32;
			let momentum = group.option("momentum").unwrap_or(0.0) as f32;
			let weight_decay = group.option("weight_decay").unwrap_or(0.0) as f32;

			for &index in &group.params {
				let mut grad = grads[index].data.clone();
				if weight_decay != 0.0 {
					grad.scaled_add(weight_decay, &params[index].data);
				}
				if momentum != 0.0 {
					let fresh = !self.registry.state.contains_key(&index);
					let buf = self.registry.state_tensor(index, "momentum_buffer");
					if fresh {
						buf.data.assign(&grad);
					} else {
						buf.data *= momentum;
						buf.data += &grad;
					}
					grad = buf.data.clone();
				}
				params[index].data.scaled_add(-lr, &grad);
			}
		}
		Ok(())
	}
}

/// Adam with bias correction.
#[derive(Debug, Clone)]
pub struct Adam {
	registry: ParamRegistry,
}

impl Adam {
	pub fn new(params: &[&Tensor], lr: f64) -> Self {
		Self::with_betas(params, lr, 0.9, 0.999, 1e-8)
	}

	pub fn with_betas(params: &[&Tensor], lr: f64, beta1: f64, beta2: f64, eps: f64) -> Self {
		let mut registry = ParamRegistry::new();
		let group = ParamGroup::new(lr, Vec::new())
			.with_option("beta1", beta1)
			.with_option("beta2", beta2)
			.with_option("eps", eps);
		registry.add_group(params, group);
		Adam { registry }
	}
}

impl Optimizer for Adam {
	fn name(&self) -> &str {
		"Adam"
	}

	fn state_dict(&self) -> OptimizerState {
		self.registry.state_dict()
	}

	fn load_state_dict(&mut self, state: OptimizerState) -> Result<()> {
		self.registry.load(state)
	}

	fn state_mut(&mut self) -> &mut BTreeMap<usize, ParamState> {
		&mut self.registry.state
	}

	fn param_groups(&self) -> &[ParamGroup] {
		&self.registry.param_groups
	}

	fn step(&mut self, params: &mut [&mut Tensor], grads: &[Tensor]) -> Result<()> {
		self.registry.check_step_inputs(params, grads)?;

		for group in self.registry.param_groups.clone() {
			let lr = group.lr as f32;
			let b1 = group.option("beta1").unwrap_or(0.9) as f32;
			let b2 = group.option("beta2").unwrap_or(0.999) as f32;
			let eps = group.option("eps").unwrap_or(1e-8) as f32;

			for &index in &group.params {
				let grad = &grads[index].data;

				let entries = self.registry.state.entry(index).or_insert_with(ParamState::new);
				let step = entries.get("step").and_then(StateValue::as_int).unwrap_or(0) + 1;
				entries.insert("step".to_string(), StateValue::Int(step));

				let mut m = self.registry.state_tensor(index, "exp_avg").data.clone();
				m *= b1;
				m.scaled_add(1.0 - b1, grad);

				let mut v = self.registry.state_tensor(index, "exp_avg_sq").data.clone();
				v *= b2;
				v.scaled_add(1.0 - b2, &(grad * grad));

				let bc1 = 1.0 - b1.powi(step as i32);
				let bc2_sqrt = (1.0 - b2.powi(step as i32)).sqrt();
				let step_size = lr / bc1;

				Zip::from(&mut params[index].data)
					.and(&m)
					.and(&v)
					.for_each(|p, &m, &v| *p -= step_size * m / (v.sqrt() / bc2_sqrt + eps));

				self.registry.state_tensor(index, "exp_avg").data = m;
				self.registry.state_tensor(index, "exp_avg_sq").data = v;
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn param(values: &[f32]) -> Tensor {
		Tensor::from_shape_vec(&[values.len()], values.to_vec()).unwrap()
	}

	#[test]
	fn test_sgd_without_momentum_is_plain_descent() {
		let mut w = param(&[1.0, 2.0]);
		let mut opt = Sgd::new(&[&w], 0.5, 0.0);
		opt.step(&mut [&mut w], &[param(&[2.0, 2.0])]).unwrap();
		assert_eq!(w.data.as_slice().unwrap(), &[0.0, 1.0]);
		assert!(opt.state_dict().state.is_empty());
	}

	#[test]
	fn test_sgd_momentum_accumulates() {
		let mut w = param(&[0.0]);
		let mut opt = Sgd::new(&[&w], 1.0, 0.5);
		opt.step(&mut [&mut w], &[param(&[1.0])]).unwrap();
		opt.step(&mut [&mut w], &[param(&[1.0])]).unwrap();
		// buffers: 1.0 then 1.5
		assert_eq!(w.data[[0]], -2.5);
		let buf = opt.state_dict().state[&0]["momentum_buffer"].clone();
		assert_eq!(buf.as_tensor().unwrap().data[[0]], 1.5);
	}

	#[test]
	fn test_adam_first_step_moves_by_lr() {
		let mut w = param(&[1.0, -1.0]);
		let mut opt = Adam::new(&[&w], 0.1);
		opt.step(&mut [&mut w], &[param(&[3.0, -3.0])]).unwrap();
		assert!((w.data[[0]] - 0.9).abs() < 1e-5);
		assert!((w.data[[1]] + 0.9).abs() < 1e-5);
		assert_eq!(opt.state_dict().state[&0]["step"], StateValue::Int(1));
	}

	#[test]
	fn test_step_rejects_mismatched_gradients() {
		let mut w = param(&[1.0, 2.0]);
		let mut opt = Sgd::new(&[&w], 0.1, 0.0);
		assert!(opt.step(&mut [&mut w], &[param(&[1.0])]).is_err());
		assert!(opt.step(&mut [&mut w], &[]).is_err());
	}

	#[test]
	fn test_load_state_dict_restores_hyperparameters() {
		let w = param(&[1.0]);
		let source = Sgd::new(&[&w], 0.25, 0.9);
		let mut target = Sgd::new(&[&w], 0.01, 0.0);
		target.load_state_dict(source.state_dict()).unwrap();
		assert_eq!(target.param_groups()[0].lr, 0.25);
		assert_eq!(target.param_groups()[0].option("momentum"), Some(0.9));
	}

	#[test]
	fn test_load_state_dict_rejects_other_layout() {
		let a = param(&[1.0]);
		let b = param(&[1.0, 2.0]);
		let source = Sgd::new(&[&a, &b], 0.1, 0.0);
		let mut target = Sgd::new(&[&a], 0.1, 0.0);
		assert!(matches!(
			target.load_state_dict(source.state_dict()),
			Err(HelperError::StructureMismatch(_))
		));
	}

	#[test]
	fn test_param_groups_get_sequential_ids() {
		let a = param(&[1.0]);
		let b = param(&[1.0]);
		let mut opt = Sgd::new(&[&a], 0.1, 0.0);
		opt.add_param_group(&[&b], 0.01, 0.0);
		assert_eq!(opt.param_groups()[0].params, vec![0]);
		assert_eq!(opt.param_groups()[1].params, vec![1]);
	}
}
