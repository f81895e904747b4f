//! Helpers for deep-learning training scripts: seeding every random source
//! from one value, saving and restoring model/optimizer checkpoints, and
//! collating batches.
//!
//! ```no_run
//! use model_helpers::{fix_seed, load_model, load_optim, save_ckpt, Device, Module, Sequential, Sgd};
//!
//! fn main() -> model_helpers::Result<()> {
//!     let mut rngs = fix_seed(1234);
//!     let model = Sequential::mlp(&[4, 16, 2], &mut rngs.framework);
//!     let optimizer = Sgd::new(&model.parameters(), 0.01, 0.9);
//!     save_ckpt(&model, &optimizer, "run.ckpt")?;
//!
//!     let mut restored = Sequential::mlp(&[4, 16, 2], &mut rngs.framework);
//!     let (restored, _checkpoint) = load_model(&mut restored, "run.ckpt")?;
//!     let mut optimizer = Sgd::new(&restored.parameters(), 0.01, 0.9);
//!     load_optim(&mut optimizer, "run.ckpt", Device::Cpu)?;
//!     Ok(())
//! }
//! ```

extern crate bincode;
extern crate byteorder;
extern crate clap;
extern crate indexmap;
extern crate ndarray;
extern crate ndarray_rand;
extern crate rand;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate xz2;

pub mod checkpoint;
pub mod cli;
pub mod collate;
pub mod commands;
pub mod config;
pub mod config_file;
pub mod constants;
pub mod device;
pub mod error;
pub mod logging;
pub mod module;
pub mod nn;
pub mod optim;
pub mod seed;
pub mod serialization;
pub mod state;
pub mod tensor;
pub mod utils;

pub use checkpoint::{
	load_ckpt, load_model, load_optim, load_weights, save_ckpt, save_ckpt_with, save_weights, save_weights_with,
	CheckpointManager,
};
pub use collate::{collate_fn, Collate};
pub use config::{RandomnessConfig, SaveOptions};
pub use device::Device;
pub use error::{HelperError, Result};
pub use module::{Module, Optimizer};
pub use nn::{Linear, Sequential};
pub use optim::{Adam, Sgd};
pub use seed::{fix_seed, fix_seed_alternate_framework, fix_seed_with, Determinism, SeededRngs};
pub use serialization::{RecordFormat, RecordKind};
pub use state::{Checkpoint, OptimizerState, ParamGroup, ParamState, StateDict, StateValue};
pub use tensor::Tensor;
