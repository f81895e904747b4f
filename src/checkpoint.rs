//! Saving and restoring model/optimizer checkpoints and bare weights files.

use crate::config::SaveOptions;
use crate::device::Device;
use crate::error::Result;
use crate::module::{Module, Optimizer};
use crate::serialization;
use crate::state::{relocate_param_state, Checkpoint};
use crate::utils::file_io::{read_file_bytes, write_file_bytes};
use log::info;
use std::path::{Path, PathBuf};

/// Writes `{model, optimizer}` to `path`, replacing any existing file.
///
/// The confirmation line goes through the `log` facade; install a logger
/// (e.g. [`crate::logging::init_simple_logger`]) to see it on the console.
pub fn save_ckpt<M, O, P>(model: &M, optimizer: &O, path: P) -> Result<()>
where
	M: Module + ?Sized,
	O: Optimizer + ?Sized,
	P: AsRef<Path>,
{
	save_ckpt_with(model, optimizer, path, &SaveOptions::default())
}

pub fn save_ckpt_with<M, O, P>(model: &M, optimizer: &O, path: P, options: &SaveOptions) -> Result<()>
where
	M: Module + ?Sized,
	O: Optimizer + ?Sized,
	P: AsRef<Path>,
{
	options.validate()?;
	let path = path.as_ref();
	let checkpoint = Checkpoint {
		model: model.state_dict(),
		optimizer: optimizer.state_dict(),
	};
	let bytes = serialization::checkpoint_to_bytes(&checkpoint, options)?;
	write_file_bytes(path, &bytes)?;
	info!("Saved model and optimizer state to {}", path.display());
	Ok(())
}

/// Reads the raw checkpoint record at `path` without touching any live object.
pub fn load_ckpt<P: AsRef<Path>>(path: P) -> Result<Checkpoint> {
	let data = read_file_bytes(path)?;
	serialization::checkpoint_from_bytes(&data)
}

/// Restores the `model` field of the checkpoint at `path` into `model` and
/// returns the full record so the optimizer state can be used separately.
pub fn load_model<'m, M, P>(model: &'m mut M, path: P) -> Result<(&'m mut M, Checkpoint)>
where
	M: Module + ?Sized,
	P: AsRef<Path>,
{
	let checkpoint = load_ckpt(path)?;
	model.load_state_dict(&checkpoint.model)?;
	Ok((model, checkpoint))
}

/// Restores the optimizer state stored at `path` and moves every tensor in
/// it to `device`.
///
/// The optimizer must have been built against a model already on `device`.
///
/// The per-group `learning_rate` lines and the confirmation are emitted
/// through the `log` facade at `info` level, so they only reach the console
/// when the caller has installed a logger.
pub fn load_optim<'o, O, P>(optimizer: &'o mut O, path: P, device: Device) -> Result<&'o mut O>
where
	O: Optimizer + ?Sized,
	P: AsRef<Path>,
{
	let path = path.as_ref();
	let checkpoint = load_ckpt(path)?;
	optimizer.load_state_dict(checkpoint.optimizer)?;
	relocate_param_state(optimizer.state_mut(), device);

	for group in optimizer.param_groups() {
		info!("learning_rate: {}", group.lr);
	}
	info!("Loaded optimizer {} state from {}", optimizer.name(), path.display());
	Ok(optimizer)
}

/// Writes only the model's state dict, with no wrapping record.
pub fn save_weights<M, P>(model: &M, path: P) -> Result<()>
where
	M: Module + ?Sized,
	P: AsRef<Path>,
{
	save_weights_with(model, path, &SaveOptions::default())
}

pub fn save_weights_with<M, P>(model: &M, path: P, options: &SaveOptions) -> Result<()>
where
	M: Module + ?Sized,
	P: AsRef<Path>,
{
	options.validate()?;
	let path = path.as_ref();
	let bytes = serialization::weights_to_bytes(&model.state_dict(), options)?;
	write_file_bytes(path, &bytes)?;
	info!("Saved model weights to {}", path.display());
	Ok(())
}

/// Loads a bare weights file into `model`. Checkpoint records are rejected.
pub fn load_weights<'m, M, P>(model: &'m mut M, path: P) -> Result<&'m mut M>
where
	M: Module + ?Sized,
	P: AsRef<Path>,
{
	let data = read_file_bytes(path)?;
	let weights = serialization::weights_from_bytes(&data)?;
	model.load_state_dict(&weights)?;
	Ok(model)
}

/// Writes a checkpoint every `interval` steps to a fixed path, for callers
/// driving their own training loop.
pub struct CheckpointManager {
	output_path: PathBuf,
	interval: usize,
	options: SaveOptions,
}

impl CheckpointManager {
	pub fn new(output_path: impl AsRef<Path>, interval: usize, options: SaveOptions) -> Self {
		Self {
			output_path: output_path.as_ref().to_path_buf(),
			interval: interval.max(1),
			options,
		}
	}

	pub fn output_path(&self) -> &Path {
		&self.output_path
	}

	pub fn should_checkpoint(&self, step: usize) -> bool {
		step % self.interval == self.interval - 1
	}

	/// Saves when `step` is due and reports whether it did.
	pub fn save_if_due<M, O>(&self, step: usize, model: &M, optimizer: &O) -> Result<bool>
	where
		M: Module + ?Sized,
		O: Optimizer + ?Sized,
	{
		if !self.should_checkpoint(step) {
			return Ok(false);
		}
		save_ckpt_with(model, optimizer, &self.output_path, &self.options)?;
		Ok(true)
	}
}
