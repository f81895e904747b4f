//! Serializable state records: model state dicts, optimizer state and the
//! checkpoint that bundles both.

use crate::device::Device;
use crate::error::{HelperError, Result};
use crate::tensor::Tensor;
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// Mapping from parameter name to tensor, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDict(IndexMap<String, Tensor>);

impl StateDict {
	pub fn new() -> Self {
		StateDict(IndexMap::new())
	}

	pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) -> Option<Tensor> {
		self.0.insert(name.into(), tensor)
	}

	pub fn get(&self, name: &str) -> Option<&Tensor> {
		self.0.get(name)
	}

	pub fn contains_key(&self, name: &str) -> bool {
		self.0.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn keys(&self) -> impl Iterator<Item = &String> {
		self.0.keys()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&String, &Tensor)> {
		self.0.iter()
	}

	pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Tensor)> {
		self.0.iter_mut()
	}

	pub fn tensors_mut(&mut self) -> impl Iterator<Item = &mut Tensor> {
		self.0.values_mut()
	}

	/// Strict structural check of `incoming` against `self` (the live layout).
	///
	/// Every live key must be present with the same shape and no extra keys are
	/// allowed.
	pub fn check_compatible(&self, incoming: &StateDict) -> Result<()> {
		for (name, tensor) in self.iter() {
			let other = incoming
				.get(name)
				.ok_or_else(|| HelperError::MissingKey(name.clone()))?;
			if other.shape() != tensor.shape() {
				return Err(HelperError::ShapeMismatch {
					key: name.clone(),
					expected: tensor.shape().to_vec(),
					found: other.shape().to_vec(),
				});
			}
		}
		if let Some(extra) = incoming.keys().find(|name| !self.contains_key(name)) {
			return Err(HelperError::UnexpectedKey(extra.clone()));
		}
		Ok(())
	}

	pub fn numel(&self) -> usize {
		self.0.values().map(Tensor::numel).sum()
	}
}

impl std::iter::FromIterator<(String, Tensor)> for StateDict {
	fn from_iter<I: IntoIterator<Item = (String, Tensor)>>(iter: I) -> Self {
		StateDict(iter.into_iter().collect())
	}
}

/// One entry of a per-parameter optimizer state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateValue {
	Tensor(Tensor),
	Float(f64),
	Int(i64),
}

impl StateValue {
	pub fn as_tensor(&self) -> Option<&Tensor> {
		match self {
			StateValue::Tensor(t) => Some(t),
			_ => None,
		}
	}

	pub fn as_tensor_mut(&mut self) -> Option<&mut Tensor> {
		match self {
			StateValue::Tensor(t) => Some(t),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			StateValue::Int(v) => Some(*v),
			_ => None,
		}
	}
}

pub type ParamState = IndexMap<String, StateValue>;

/// Parameters sharing a set of hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGroup {
	pub lr: f64,
	/// Indices of the parameters in this group, in optimizer order.
	pub params: Vec<usize>,
	#[serde(default)]
	pub options: BTreeMap<String, f64>,
}

impl ParamGroup {
	pub fn new(lr: f64, params: Vec<usize>) -> Self {
		ParamGroup {
			lr,
			params,
			options: BTreeMap::new(),
		}
	}

	pub fn with_option(mut self, name: impl Into<String>, value: f64) -> Self {
		self.options.insert(name.into(), value);
		self
	}

	pub fn option(&self, name: &str) -> Option<f64> {
		self.options.get(name).copied()
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizerState {
	/// Per-parameter state keyed by parameter index.
	pub state: BTreeMap<usize, ParamState>,
	pub param_groups: Vec<ParamGroup>,
}

impl OptimizerState {
	/// Checks that `incoming` was recorded against the same parameter layout as
	/// `self`: same number of groups, same group sizes, state only for known
	/// parameters, and tensor entries shaped like their parameter.
	pub fn check_compatible(&self, incoming: &OptimizerState, param_shapes: &[Vec<usize>]) -> Result<()> {
		if self.param_groups.len() != incoming.param_groups.len() {
			return Err(HelperError::StructureMismatch(format!(
				"loaded state has {} parameter groups, optimizer has {}",
				incoming.param_groups.len(),
				self.param_groups.len()
			)));
		}
		for (i, (live, saved)) in self.param_groups.iter().zip(&incoming.param_groups).enumerate() {
			if live.params.len() != saved.params.len() {
				return Err(HelperError::StructureMismatch(format!(
					"parameter group {} has {} parameters in the loaded state, {} in the optimizer",
					i,
					saved.params.len(),
					live.params.len()
				)));
			}
		}

		let known: Vec<usize> = incoming.param_groups.iter().flat_map(|g| g.params.iter().copied()).collect();
		for (index, entries) in &incoming.state {
			let position = known.iter().position(|p| p == index).ok_or_else(|| {
				HelperError::StructureMismatch(format!("state recorded for unknown parameter {}", index))
			})?;
			let expected = param_shapes.get(position).ok_or_else(|| {
				HelperError::StructureMismatch(format!("no live parameter at position {}", position))
			})?;
			for (name, value) in entries {
				if let Some(tensor) = value.as_tensor() {
					if tensor.shape() != expected.as_slice() {
						return Err(HelperError::ShapeMismatch {
							key: format!("state.{}.{}", index, name),
							expected: expected.clone(),
							found: tensor.shape().to_vec(),
						});
					}
				}
			}
		}
		Ok(())
	}

	/// Moves every tensor-valued state entry to `device`.
	pub fn to_device(&mut self, device: Device) {
		relocate_param_state(&mut self.state, device);
	}

	pub fn tensors(&self) -> impl Iterator<Item = &Tensor> {
		self.state.values().flat_map(|entries| entries.values().filter_map(StateValue::as_tensor))
	}
}

/// Moves every tensor-valued entry of a per-parameter state map to `device`,
/// leaving scalar entries alone.
pub fn relocate_param_state(state: &mut BTreeMap<usize, ParamState>, device: Device) {
	for entries in state.values_mut() {
		for value in entries.values_mut() {
			if let Some(tensor) = value.as_tensor_mut() {
				tensor.to_device(device);
			}
		}
	}
}

/// Persisted snapshot of a model and its optimizer. Both fields are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
	pub model: StateDict,
	pub optimizer: OptimizerState,
}
