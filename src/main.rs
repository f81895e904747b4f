extern crate model_helpers;
#[macro_use]
extern crate log;

use model_helpers::{cli, commands, logging};

fn main() {
	logging::init_simple_logger();

	let app_m = cli::build_cli();

	let result = match app_m.subcommand() {
		("inspect", Some(sub_m)) => commands::inspect(sub_m),
		("extract-weights", Some(sub_m)) => commands::extract_weights(sub_m),
		("generate-config", Some(sub_m)) => commands::generate_config(sub_m),
		_ => Ok(()),
	};

	if let Err(err) = result {
		error!("Error: {}", err);
		std::process::exit(1);
	}
}
