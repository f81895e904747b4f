use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

pub fn build_cli() -> ArgMatches<'static> {
	build_app().get_matches()
}

pub fn build_app() -> App<'static, 'static> {
	App::new("model-helpers")
		.version("v0.1.0")
		.about("Inspect and convert model/optimizer checkpoints")
		.settings(&[AppSettings::SubcommandRequiredElseHelp, AppSettings::VersionlessSubcommands])
		.subcommand(build_inspect_subcommand())
		.subcommand(build_extract_weights_subcommand())
		.subcommand(build_generate_config_subcommand())
}

fn build_inspect_subcommand() -> App<'static, 'static> {
	SubCommand::with_name("inspect")
		.about("Prints the parameters and optimizer state stored in a checkpoint or weights file")
		.arg(
			Arg::with_name("INPUT_FILE")
				.help("Checkpoint or weights file to inspect")
				.required(true)
				.index(1),
		)
}

fn build_extract_weights_subcommand() -> App<'static, 'static> {
	SubCommand::with_name("extract-weights")
		.about("Writes the model state of a checkpoint as a bare weights file")
		.arg(
			Arg::with_name("CHECKPOINT")
				.help("Checkpoint to read")
				.required(true)
				.index(1),
		)
		.arg(
			Arg::with_name("OUTPUT_FILE")
				.help("Weights file to write/overwrite")
				.required(true)
				.index(2),
		)
		.arg(build_format_arg())
		.arg(
			Arg::with_name("QUANTISE")
				.short("q")
				.long("quantise")
				.help("Zero the 12 least significant bits of every value"),
		)
}

fn build_generate_config_subcommand() -> App<'static, 'static> {
	SubCommand::with_name("generate-config")
		.about("Writes a default configuration file")
		.arg(
			Arg::with_name("OUTPUT_FILE")
				.help("Configuration file to write. Default: model_helpers.toml")
				.index(1),
		)
		.arg(
			Arg::with_name("FORMAT")
				.long("format")
				.value_name("FORMAT")
				.possible_values(&["toml", "json"])
				.help("Output format. Default: toml"),
		)
		.arg(
			Arg::with_name("EXAMPLE")
				.long("example")
				.help("Write the commented example (TOML only)"),
		)
		.arg(
			Arg::with_name("FORCE")
				.short("f")
				.long("force")
				.help("Overwrite an existing file"),
		)
}

fn build_format_arg() -> Arg<'static, 'static> {
	Arg::with_name("FORMAT")
		.long("format")
		.value_name("FORMAT")
		.possible_values(&["binary", "json"])
		.help("Record format. Default: binary")
}
