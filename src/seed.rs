//! Deterministic seeding.
//!
//! Instead of mutating hidden global generators, seeding produces a
//! [`SeededRngs`] bundle the caller threads through its code. The only
//! process-wide effect is exporting the hash-seed and determinism environment
//! variables for child processes and foreign runtimes.

use crate::config::RandomnessConfig;
use crate::constants::seed as seed_constants;
use crate::device::Device;
use crate::error::Result;
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::env;

/// Determinism switches applied to accelerator kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Determinism {
	pub deterministic: bool,
	pub benchmark: bool,
}

/// Every random source a training run draws from, seeded from one value.
#[derive(Debug, Clone)]
pub struct SeededRngs {
	pub seed: u64,
	/// General purpose generator (shuffling, sampling, dropout masks...).
	pub general: StdRng,
	/// Generator for numeric-array initialisation via `ndarray-rand`.
	pub array: StdRng,
	/// Generator owned by the tensor framework (parameter initialisation).
	pub framework: StdRng,
	devices: Vec<(Device, StdRng)>,
	determinism: Option<Determinism>,
}

impl SeededRngs {
	fn from_seed(seed: u64) -> Self {
		SeededRngs {
			seed,
			general: StdRng::seed_from_u64(seed),
			array: StdRng::seed_from_u64(seed),
			framework: StdRng::seed_from_u64(seed),
			devices: Vec::new(),
			determinism: None,
		}
	}

	/// Generator for an accelerator, if that accelerator was seeded.
	pub fn device(&mut self, device: Device) -> Option<&mut StdRng> {
		self.devices.iter_mut().find(|(d, _)| *d == device).map(|(_, rng)| rng)
	}

	pub fn seeded_devices(&self) -> Vec<Device> {
		self.devices.iter().map(|(d, _)| *d).collect()
	}

	/// Determinism flags, set only when at least one accelerator was seeded.
	pub fn determinism(&self) -> Option<Determinism> {
		self.determinism
	}
}

/// Seeds every generator with `seed` using the default configuration.
pub fn fix_seed(seed: u64) -> SeededRngs {
	seed_all(&RandomnessConfig::new(seed))
}

pub fn fix_seed_with(config: &RandomnessConfig) -> Result<SeededRngs> {
	config.validate()?;
	Ok(seed_all(config))
}

/// Seeding for a second framework that only reads its determinism switch from
/// the environment and has no per-device generators.
pub fn fix_seed_alternate_framework(seed: u64) -> SeededRngs {
	let config = RandomnessConfig::builder().seed(seed).accelerators(Vec::new()).build();
	let rngs = seed_all(&config);
	if config.set_env_vars {
		env::set_var(seed_constants::ALT_DETERMINISM_VAR, seed.to_string());
	}
	rngs
}

fn seed_all(config: &RandomnessConfig) -> SeededRngs {
	let seed = config.seed;
	if config.set_env_vars {
		env::set_var(seed_constants::HASH_SEED_VAR, seed.to_string());
	}

	let mut rngs = SeededRngs::from_seed(seed);

	let accelerators = config.accelerators();
	if !accelerators.is_empty() {
		rngs.devices = accelerators
			.into_iter()
			.map(|device| (device, StdRng::seed_from_u64(seed)))
			.collect();
		rngs.determinism = Some(Determinism {
			deterministic: config.deterministic,
			benchmark: config.benchmark && !config.deterministic,
		});
	}

	debug!(
		"Seeded general, array and framework generators with {} ({} accelerators)",
		seed,
		rngs.devices.len()
	);
	rngs
}
