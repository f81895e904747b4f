use crate::config::SaveOptions;
use crate::error::{HelperError, Result};
use crate::serialization::{self, RecordFormat};
use crate::utils::file_io::{read_file_bytes, write_file_bytes};
use clap::ArgMatches;
use log::info;

pub fn extract_weights(app_m: &ArgMatches) -> Result<()> {
	let checkpoint_path = app_m
		.value_of("CHECKPOINT")
		.ok_or_else(|| HelperError::InvalidParameter("No checkpoint given".to_string()))?;
	let output_path = app_m
		.value_of("OUTPUT_FILE")
		.ok_or_else(|| HelperError::InvalidParameter("No output file given".to_string()))?;

	let options = SaveOptions::builder()
		.format(RecordFormat::from_str(app_m.value_of("FORMAT").unwrap_or("binary"))?)
		.quantise(app_m.is_present("QUANTISE"))
		.build();

	let checkpoint = serialization::checkpoint_from_bytes(&read_file_bytes(checkpoint_path)?)?;
	let bytes = serialization::weights_to_bytes(&checkpoint.model, &options)?;
	write_file_bytes(output_path, &bytes)?;

	info!(
		"Wrote {} tensors from {} to {}",
		checkpoint.model.len(),
		checkpoint_path,
		output_path
	);
	Ok(())
}
