use crate::constants::{record, seed};
use crate::device::Device;
use crate::error::{HelperError, Result};
use crate::serialization::RecordFormat;

/// How checkpoints and weights files are written.
#[derive(Debug, Clone)]
pub struct SaveOptions {
	pub format: RecordFormat,
	pub quantise: bool,
	pub compression_level: u32,
}

impl Default for SaveOptions {
	fn default() -> Self {
		Self {
			format: RecordFormat::Binary,
			quantise: false,
			compression_level: record::DEFAULT_COMPRESSION_LEVEL,
		}
	}
}

impl SaveOptions {
	pub fn builder() -> SaveOptionsBuilder {
		SaveOptionsBuilder::default()
	}

	pub fn validate(&self) -> Result<()> {
		if self.compression_level > record::MAX_COMPRESSION_LEVEL {
			return Err(HelperError::InvalidParameter(format!(
				"Compression level ({}) must be at most {}",
				self.compression_level,
				record::MAX_COMPRESSION_LEVEL
			)));
		}
		Ok(())
	}
}

#[derive(Default)]
pub struct SaveOptionsBuilder {
	format: Option<RecordFormat>,
	quantise: Option<bool>,
	compression_level: Option<u32>,
}

impl SaveOptionsBuilder {
	pub fn format(mut self, format: RecordFormat) -> Self {
		self.format = Some(format);
		self
	}

	pub fn quantise(mut self, quantise: bool) -> Self {
		self.quantise = Some(quantise);
		self
	}

	pub fn compression_level(mut self, level: u32) -> Self {
		self.compression_level = Some(level);
		self
	}

	pub fn build(self) -> SaveOptions {
		SaveOptions {
			format: self.format.unwrap_or(RecordFormat::Binary),
			quantise: self.quantise.unwrap_or(false),
			compression_level: self.compression_level.unwrap_or(record::DEFAULT_COMPRESSION_LEVEL),
		}
	}
}

/// Everything the seed initializer needs, passed explicitly instead of read
/// from process state.
#[derive(Debug, Clone)]
pub struct RandomnessConfig {
	pub seed: u64,
	/// Request deterministic kernels on accelerators.
	pub deterministic: bool,
	/// Allow kernel auto-tuning. Ignored when `deterministic` is set.
	pub benchmark: bool,
	/// Export the hash-seed (and determinism) environment variables.
	pub set_env_vars: bool,
	/// Accelerators to seed. `None` means whatever `Device::list_accelerators`
	/// reports.
	pub accelerators: Option<Vec<Device>>,
}

impl Default for RandomnessConfig {
	fn default() -> Self {
		Self::new(seed::DEFAULT_SEED)
	}
}

impl RandomnessConfig {
	pub fn new(seed: u64) -> Self {
		Self {
			seed,
			deterministic: true,
			benchmark: false,
			set_env_vars: true,
			accelerators: None,
		}
	}

	pub fn builder() -> RandomnessConfigBuilder {
		RandomnessConfigBuilder::default()
	}

	pub fn accelerators(&self) -> Vec<Device> {
		match &self.accelerators {
			Some(devices) => devices.clone(),
			None => Device::list_accelerators(),
		}
	}

	pub fn validate(&self) -> Result<()> {
		if let Some(devices) = &self.accelerators {
			if let Some(cpu) = devices.iter().find(|d| !d.is_accelerator()) {
				return Err(HelperError::InvalidParameter(format!(
					"{} is not an accelerator device",
					cpu
				)));
			}
		}
		Ok(())
	}
}

#[derive(Default)]
pub struct RandomnessConfigBuilder {
	seed: Option<u64>,
	deterministic: Option<bool>,
	benchmark: Option<bool>,
	set_env_vars: Option<bool>,
	accelerators: Option<Vec<Device>>,
}

impl RandomnessConfigBuilder {
	pub fn seed(mut self, seed: u64) -> Self {
		self.seed = Some(seed);
		self
	}

	pub fn deterministic(mut self, deterministic: bool) -> Self {
		self.deterministic = Some(deterministic);
		self
	}

	pub fn benchmark(mut self, benchmark: bool) -> Self {
		self.benchmark = Some(benchmark);
		self
	}

	pub fn set_env_vars(mut self, set_env_vars: bool) -> Self {
		self.set_env_vars = Some(set_env_vars);
		self
	}

	pub fn accelerators(mut self, accelerators: Vec<Device>) -> Self {
		self.accelerators = Some(accelerators);
		self
	}

	pub fn build(self) -> RandomnessConfig {
		let defaults = RandomnessConfig::new(self.seed.unwrap_or(seed::DEFAULT_SEED));
		RandomnessConfig {
			deterministic: self.deterministic.unwrap_or(defaults.deterministic),
			benchmark: self.benchmark.unwrap_or(defaults.benchmark),
			set_env_vars: self.set_env_vars.unwrap_or(defaults.set_env_vars),
			accelerators: self.accelerators.or(defaults.accelerators),
			seed: defaults.seed,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_save_options_validate() {
		assert!(SaveOptions::default().validate().is_ok());
		let options = SaveOptions::builder().compression_level(12).build();
		let err = options.validate().unwrap_err();
		assert!(format!("{}", err).contains("Compression level"));
	}

	#[test]
	fn test_randomness_builder_defaults() {
		let config = RandomnessConfig::builder().seed(42).build();
		assert_eq!(config.seed, 42);
		assert!(config.deterministic);
		assert!(!config.benchmark);
		assert!(config.set_env_vars);
		assert!(config.accelerators().is_empty());
	}

	#[test]
	fn test_randomness_rejects_cpu_as_accelerator() {
		let config = RandomnessConfig::builder().accelerators(vec![Device::Cpu]).build();
		assert!(config.validate().is_err());
		let config = RandomnessConfig::builder().accelerators(vec![Device::Cuda(0)]).build();
		assert!(config.validate().is_ok());
	}
}
