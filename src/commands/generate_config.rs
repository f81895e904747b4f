use crate::config_file::HelperConfigFile;
use crate::constants::file;
use crate::error::{HelperError, Result};
use crate::utils::file_io::write_file_string;
use clap::ArgMatches;
use log::info;
use std::path::Path;

pub fn generate_config(app_m: &ArgMatches) -> Result<()> {
    let output_path = app_m
        .value_of("OUTPUT_FILE")
        .unwrap_or(file::DEFAULT_CONFIG_FILE);

    let format = app_m.value_of("FORMAT").unwrap_or("toml");
    let example = app_m.is_present("EXAMPLE");

    if Path::new(output_path).exists() && !app_m.is_present("FORCE") {
        return Err(HelperError::InvalidParameter(format!(
            "File {} already exists. Use --force to overwrite",
            output_path
        )));
    }

    if example {
        if format != "toml" {
            return Err(HelperError::InvalidParameter(
                "Example configuration with comments is only available in TOML format".to_string(),
            ));
        }
        write_file_string(output_path, &HelperConfigFile::create_example_toml())?;
        info!("Generated example configuration file with comments: {}", output_path);
        return Ok(());
    }

    let config = HelperConfigFile::generate_default();
    match format {
        "toml" => config.to_toml_file(output_path)?,
        "json" => config.to_json_file(output_path)?,
        _ => {
            return Err(HelperError::InvalidParameter(format!(
                "Unknown format: {}. Use 'toml' or 'json'",
                format
            )));
        }
    }
    info!("Generated {} configuration file: {}", format.to_uppercase(), output_path);

    Ok(())
}
