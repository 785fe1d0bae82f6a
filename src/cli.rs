use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::consts::{DEFAULT_CONFIG_FILE, RAW_EXTENSION};

#[derive(Parser)]
#[command(
	name = "epd-tools",
	about = "Asset tools for the 5.65 inch 7 color e-paper frame"
)]
pub struct Cli {
	#[arg(
		short,
		long,
		global = true,
		action = ArgAction::Count,
		help = "More log output on stderr (-v info, -vv debug)"
	)]
	pub verbose: u8,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
	#[command(about = "Convert 600x448 palette images into raw EPD images")]
	Convert {
		#[arg(required = true, help = "Palette indexed images (PNG, GIF)")]
		images: Vec<PathBuf>,

		#[arg(long, default_value = RAW_EXTENSION, help = "Extension of the written raw images")]
		ext: String,
	},
	#[command(about = "Write the frame parameter file from a JSON description")]
	Config {
		#[arg(help = "JSON file with a \"Parameter\" object")]
		input: PathBuf,

		#[arg(default_value = DEFAULT_CONFIG_FILE, help = "Output file path")]
		output: PathBuf,
	},
	#[command(about = "Validate a parameter file and show its content")]
	Inspect {
		#[arg(help = "Parameter file path")]
		file: PathBuf,
	},
}
