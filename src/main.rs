mod cli;
mod consts;
mod encoder;
mod image;
mod pack;
mod palette;
mod types;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use encoder::{Encoder, FileReport};
use palette::DevicePalette;
use types::{ConfigBlob, EpdParameters};

fn main() -> Result<()> {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	match cli.command {
		Commands::Convert { images, ext } => cmd_convert(&images, &ext),
		Commands::Config { input, output } => cmd_config(&input, &output),
		Commands::Inspect { file } => cmd_inspect(&file),
	}
}

fn init_logging(verbose: u8) {
	let default = match verbose {
		0 => "warn",
		1 => "info",
		_ => "debug",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

fn cmd_convert(images: &[PathBuf], ext: &str) -> Result<()> {
	let palette = DevicePalette::epd().context("built-in EPD palette is invalid")?;
	let encoder = Encoder::new(&palette, ext);

	for report in encoder.encode_batch(images) {
		if let Some(line) = report_line(&report) {
			println!("{line}");
		}
	}
	Ok(())
}

/// Stdout line for one converted file; unreadable inputs only go to the log.
fn report_line(report: &FileReport) -> Option<String> {
	match &report.outcome {
		Ok(artifact) => Some(format!(
			"Created epd image {} (crc32 {:#010x})",
			artifact.path.display(),
			artifact.crc32
		)),
		Err(e) if e.is_load() => {
			warn!("skipping {}: {e}", report.input.display());
			None
		}
		Err(e) => Some(format!("{} : {e}", report.input.display())),
	}
}

fn cmd_config(input: &Path, output: &Path) -> Result<()> {
	println!("Reading data from {}\n", input.display());
	let params = EpdParameters::load(input)?;
	println!("{params}");

	let blob = ConfigBlob::new(params);
	println!("crc        : {:#04x}", blob.crc());

	println!("\nStoring configuration into {}", output.display());
	std::fs::write(output, blob.to_bytes())
		.with_context(|| format!("cannot write {}", output.display()))?;
	Ok(())
}

fn cmd_inspect(file: &Path) -> Result<()> {
	let data = std::fs::read(file).with_context(|| format!("cannot read {}", file.display()))?;
	let blob = ConfigBlob::from_bytes(&data)
		.with_context(|| format!("{} is not a valid parameter file", file.display()))?;

	println!("{}", file.display());
	println!("{}", blob.params);
	println!("crc        : {:#04x}", blob.crc());
	Ok(())
}
