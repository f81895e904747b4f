use crate::error::{HelperError, Result};
use std::fmt;
use std::str::FromStr;

/// Placement of a tensor.
///
/// The ndarray backend keeps every buffer in host memory, so a device is a tag
/// that relocation operations update and that callers can assert on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
	Cpu,
	Cuda(usize),
}

impl Default for Device {
	fn default() -> Self {
		Device::Cpu
	}
}

impl fmt::Display for Device {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Device::Cpu => write!(f, "cpu"),
			Device::Cuda(index) => write!(f, "cuda:{}", index),
		}
	}
}

impl FromStr for Device {
	type Err = HelperError;

	fn from_str(s: &str) -> Result<Self> {
		let lower = s.trim().to_lowercase();
		let (kind, index) = match lower.split_once(':') {
			Some((kind, index)) => {
				let index = index.parse::<usize>().map_err(|_| {
					HelperError::InvalidParameter(format!("Invalid device index in '{}'", s))
				})?;
				(kind.to_string(), Some(index))
			}
			None => (lower, None),
		};

		match (kind.as_str(), index) {
			("cpu", None) => Ok(Device::Cpu),
			("cuda", index) | ("gpu", index) => Ok(Device::Cuda(index.unwrap_or(0))),
			_ => Err(HelperError::InvalidParameter(format!(
				"Unknown device: {}. Valid options: cpu, cuda, cuda:N, gpu, gpu:N",
				s
			))),
		}
	}
}

impl Device {
	pub fn is_accelerator(&self) -> bool {
		matches!(self, Device::Cuda(_))
	}

	/// Accelerators visible to this build. The host-memory backend exposes none.
	pub fn list_accelerators() -> Vec<Device> {
		Vec::new()
	}

	pub fn accelerator_available() -> bool {
		!Self::list_accelerators().is_empty()
	}
}
