use crate::error::{HelperError, Result};
use crate::serialization::{self, RecordKind};
use crate::state::{OptimizerState, StateDict};
use crate::utils::file_io::read_file_bytes;
use clap::ArgMatches;
use log::info;

pub fn inspect(app_m: &ArgMatches) -> Result<()> {
	let input = app_m
		.value_of("INPUT_FILE")
		.ok_or_else(|| HelperError::InvalidParameter("No input file given".to_string()))?;

	let data = read_file_bytes(input)?;
	for line in describe_record(&data)? {
		info!("{}", line);
	}
	Ok(())
}

/// Human readable summary of a checkpoint or weights record.
pub fn describe_record(data: &[u8]) -> Result<Vec<String>> {
	let format = serialization::detect_format(data)?;
	let mut lines = Vec::new();
	match serialization::peek_kind(data)? {
		RecordKind::Checkpoint => {
			let checkpoint = serialization::checkpoint_from_bytes(data)?;
			lines.push(format!("{:?} checkpoint", format));
			describe_model(&checkpoint.model, &mut lines);
			describe_optimizer(&checkpoint.optimizer, &mut lines);
		}
		RecordKind::Weights => {
			let weights = serialization::weights_from_bytes(data)?;
			lines.push(format!("{:?} weights file", format));
			describe_model(&weights, &mut lines);
		}
	}
	Ok(lines)
}

fn describe_model(model: &StateDict, lines: &mut Vec<String>) {
	lines.push(format!("model: {} tensors, {} values", model.len(), model.numel()));
	for (name, tensor) in model.iter() {
		lines.push(format!("  {} {:?} on {}", name, tensor.shape(), tensor.device));
	}
}

fn describe_optimizer(optimizer: &OptimizerState, lines: &mut Vec<String>) {
	lines.push(format!(
		"optimizer: {} parameter groups, state for {} parameters",
		optimizer.param_groups.len(),
		optimizer.state.len()
	));
	for (i, group) in optimizer.param_groups.iter().enumerate() {
		lines.push(format!(
			"  group {}: learning_rate: {}, {} params, options {:?}",
			i,
			group.lr,
			group.params.len(),
			group.options
		));
	}
	for (index, entries) in &optimizer.state {
		let names: Vec<&str> = entries.keys().map(String::as_str).collect();
		lines.push(format!("  param {}: {}", index, names.join(", ")));
	}
}
