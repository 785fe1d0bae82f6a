use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::{DISPLAY_HEIGHT, DISPLAY_WIDTH, PACKED_FRAME_SIZE};
use crate::image::{load_image, LoadError};
use crate::pack::{pack_pixels, PackError};
use crate::palette::{DevicePalette, PaletteError};
use crate::types::{IndexedImage, SourceImage};

#[derive(Debug, Error)]
pub enum EncodeError {
	#[error(transparent)]
	Load(#[from] LoadError),

	#[error("wrong image size ({width}, {height}), need ({}, {})", DISPLAY_WIDTH, DISPLAY_HEIGHT)]
	SizeMismatch { width: u32, height: u32 },

	#[error("wrong color format {0}, need palette indexed")]
	Format(String),

	#[error(transparent)]
	Palette(#[from] PaletteError),

	#[error(transparent)]
	Pack(#[from] PackError),

	#[error("cannot write {}: {source}", path.display())]
	Write {
		path: PathBuf,
		source: std::io::Error,
	},
}

impl EncodeError {
	pub fn is_load(&self) -> bool {
		matches!(self, EncodeError::Load(_))
	}
}

/// A raw image written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
	pub path: PathBuf,
	pub crc32: u32,
}

/// Outcome of one input file of a batch.
#[derive(Debug)]
pub struct FileReport {
	pub input: PathBuf,
	pub outcome: Result<Artifact, EncodeError>,
}

pub struct Encoder<'a> {
	palette: &'a DevicePalette,
	extension: String,
}

impl<'a> Encoder<'a> {
	pub fn new(palette: &'a DevicePalette, extension: impl Into<String>) -> Self {
		Self {
			palette,
			extension: extension.into(),
		}
	}

	pub fn output_path(&self, input: &Path) -> PathBuf {
		input.with_extension(&self.extension)
	}

	/// Run every input to completion, one file at a time.
	pub fn encode_batch(&self, inputs: &[PathBuf]) -> Vec<FileReport> {
		inputs
			.iter()
			.map(|input| FileReport {
				input: input.clone(),
				outcome: self.encode_file(input),
			})
			.collect()
	}

	pub fn encode_file(&self, input: &Path) -> Result<Artifact, EncodeError> {
		let source = load_image(input)?;
		debug!("{}: loaded", input.display());

		let data = self.encode(source)?;

		let path = self.output_path(input);
		let crc32 = write_artifact(&path, &data)?;
		Ok(Artifact { path, crc32 })
	}

	/// Validate, reconcile and pack a loaded image.
	pub fn encode(&self, source: SourceImage) -> Result<Vec<u8>, EncodeError> {
		let image = validate(source)?;
		debug!("validated {}x{} indexed image", image.width, image.height);

		let local = image.palette.as_deref().ok_or(PaletteError::Missing)?;
		let table = self.palette.reconcile(local)?;
		debug!("reconciled palette to {:?}", table.as_slice());

		let data = pack_pixels(&image, &table)?;
		debug_assert_eq!(data.len(), PACKED_FRAME_SIZE);
		debug!("packed {} bytes", data.len());
		Ok(data)
	}
}

fn validate(source: SourceImage) -> Result<IndexedImage, EncodeError> {
	let (width, height) = source.dimensions();
	if width != DISPLAY_WIDTH || height != DISPLAY_HEIGHT {
		return Err(EncodeError::SizeMismatch { width, height });
	}

	match source {
		SourceImage::Indexed(image) => Ok(image),
		SourceImage::Direct { color, .. } => Err(EncodeError::Format(color)),
		SourceImage::Oversized { width, height } => Err(EncodeError::SizeMismatch { width, height }),
	}
}

fn write_artifact(path: &Path, data: &[u8]) -> Result<u32, EncodeError> {
	let write_error = |source| EncodeError::Write {
		path: path.to_path_buf(),
		source,
	};

	let mut file = File::create(path).map_err(write_error)?;
	let result = file.write_all(data).and_then(|_| file.sync_all());
	drop(file);
	if let Err(e) = result {
		let _ = fs::remove_file(path);
		return Err(write_error(e));
	}

	let crc32 = crc32fast::hash(data);
	info!("wrote {} ({} bytes)", path.display(), data.len());
	Ok(crc32)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::consts::COLOR_COUNT;
	use crate::palette::{Rgb, EPD_COLORS};
	use ::image::codecs::bmp::BmpEncoder;
	use ::image::ExtendedColorType;
	use std::io::BufWriter;
	use tempfile::TempDir;

	fn epd_rgbs() -> Vec<Rgb> {
		EPD_COLORS.iter().map(|(rgb, _)| *rgb).collect()
	}

	fn frame_pixels() -> Vec<u8> {
		(0..DISPLAY_WIDTH * DISPLAY_HEIGHT)
			.map(|i| (i % COLOR_COUNT as u32) as u8)
			.collect()
	}

	fn write_indexed_png(path: &Path, width: u32, height: u32, palette: &[Rgb], pixels: &[u8]) {
		let file = File::create(path).unwrap();
		let mut enc = png::Encoder::new(BufWriter::new(file), width, height);
		enc.set_color(png::ColorType::Indexed);
		enc.set_depth(png::BitDepth::Eight);
		enc.set_palette(palette.iter().flat_map(|c| c.0).collect::<Vec<u8>>());
		let mut writer = enc.write_header().unwrap();
		writer.write_image_data(pixels).unwrap();
		writer.finish().unwrap();
	}

	fn indexed(width: u32, height: u32, pixels: Vec<u8>, palette: Option<Vec<Rgb>>) -> SourceImage {
		SourceImage::Indexed(IndexedImage {
			width,
			height,
			pixels,
			palette,
		})
	}

	#[test]
	fn test_output_path_replaces_extension() {
		let palette = DevicePalette::epd().unwrap();
		let encoder = Encoder::new(&palette, "raw");
		assert_eq!(
			encoder.output_path(Path::new("/tmp/img000.bmp")),
			PathBuf::from("/tmp/img000.raw")
		);
		assert_eq!(
			encoder.output_path(Path::new("noext")),
			PathBuf::from("noext.raw")
		);
	}

	#[test]
	fn test_encode_full_frame() {
		let palette = DevicePalette::epd().unwrap();
		let encoder = Encoder::new(&palette, "raw");
		let source = indexed(DISPLAY_WIDTH, DISPLAY_HEIGHT, frame_pixels(), Some(epd_rgbs()));

		let data = encoder.encode(source).unwrap();
		assert_eq!(data.len(), PACKED_FRAME_SIZE);
		assert_eq!(&data[..4], &[0x01, 0x23, 0x45, 0x67]);
	}

	#[test]
	fn test_encode_reconciles_reordered_palette() {
		let palette = DevicePalette::epd().unwrap();
		let encoder = Encoder::new(&palette, "raw");
		let mut local = epd_rgbs();
		local.reverse();
		let source = indexed(DISPLAY_WIDTH, DISPLAY_HEIGHT, frame_pixels(), Some(local));

		let data = encoder.encode(source).unwrap();
		assert_eq!(&data[..4], &[0x76, 0x54, 0x32, 0x10]);
	}

	#[test]
	fn test_encode_rejects_wrong_size() {
		let palette = DevicePalette::epd().unwrap();
		let encoder = Encoder::new(&palette, "raw");
		let source = indexed(DISPLAY_WIDTH, 447, vec![0; 600 * 447], Some(epd_rgbs()));

		let err = encoder.encode(source).unwrap_err();
		assert!(matches!(
			err,
			EncodeError::SizeMismatch {
				width: 600,
				height: 447
			}
		));
		assert_eq!(err.to_string(), "wrong image size (600, 447), need (600, 448)");
	}

	#[test]
	fn test_encode_rejects_one_wrong_dimension() {
		let palette = DevicePalette::epd().unwrap();
		let encoder = Encoder::new(&palette, "raw");
		let source = SourceImage::Direct {
			width: 448,
			height: 448,
			color: "Rgb8".into(),
		};
		assert!(matches!(
			encoder.encode(source).unwrap_err(),
			EncodeError::SizeMismatch { .. }
		));
	}

	#[test]
	fn test_encode_rejects_direct_color() {
		let palette = DevicePalette::epd().unwrap();
		let encoder = Encoder::new(&palette, "raw");
		let source = SourceImage::Direct {
			width: DISPLAY_WIDTH,
			height: DISPLAY_HEIGHT,
			color: "Rgb8".into(),
		};
		assert!(matches!(
			encoder.encode(source).unwrap_err(),
			EncodeError::Format(_)
		));
	}

	#[test]
	fn test_encode_rejects_missing_palette() {
		let palette = DevicePalette::epd().unwrap();
		let encoder = Encoder::new(&palette, "raw");
		let source = indexed(DISPLAY_WIDTH, DISPLAY_HEIGHT, frame_pixels(), None);
		assert!(matches!(
			encoder.encode(source).unwrap_err(),
			EncodeError::Palette(PaletteError::Missing)
		));
	}

	#[test]
	fn test_encode_rejects_short_palette() {
		let palette = DevicePalette::epd().unwrap();
		let encoder = Encoder::new(&palette, "raw");
		let local = epd_rgbs()[..7].to_vec();
		let source = indexed(DISPLAY_WIDTH, DISPLAY_HEIGHT, frame_pixels(), Some(local));
		assert!(matches!(
			encoder.encode(source).unwrap_err(),
			EncodeError::Palette(PaletteError::WrongLength(7))
		));
	}

	#[test]
	fn test_encode_file_writes_artifact() {
		let dir = TempDir::new().unwrap();
		let input = dir.path().join("img000.png");
		write_indexed_png(&input, DISPLAY_WIDTH, DISPLAY_HEIGHT, &epd_rgbs(), &frame_pixels());

		let palette = DevicePalette::epd().unwrap();
		let encoder = Encoder::new(&palette, "raw");
		let artifact = encoder.encode_file(&input).unwrap();

		assert_eq!(artifact.path, dir.path().join("img000.raw"));
		let data = fs::read(&artifact.path).unwrap();
		assert_eq!(data.len(), PACKED_FRAME_SIZE);
		assert_eq!(&data[..4], &[0x01, 0x23, 0x45, 0x67]);
		assert_eq!(artifact.crc32, crc32fast::hash(&data));
	}

	#[test]
	fn test_encode_file_out_of_range_leaves_no_artifact() {
		let dir = TempDir::new().unwrap();
		let input = dir.path().join("bad.png");
		let mut pixels = frame_pixels();
		pixels[DISPLAY_WIDTH as usize * 3 + 11] = 9;
		write_indexed_png(&input, DISPLAY_WIDTH, DISPLAY_HEIGHT, &epd_rgbs(), &pixels);

		let palette = DevicePalette::epd().unwrap();
		let encoder = Encoder::new(&palette, "raw");
		let err = encoder.encode_file(&input).unwrap_err();

		assert!(matches!(
			err,
			EncodeError::Pack(PackError::OutOfRange {
				x: 11,
				y: 3,
				value: 9
			})
		));
		assert!(!dir.path().join("bad.raw").exists());
	}

	#[test]
	fn test_encode_file_reports_write_failure() {
		let dir = TempDir::new().unwrap();
		let input = dir.path().join("img.png");
		write_indexed_png(&input, DISPLAY_WIDTH, DISPLAY_HEIGHT, &epd_rgbs(), &frame_pixels());
		fs::create_dir(dir.path().join("img.raw")).unwrap();

		let palette = DevicePalette::epd().unwrap();
		let encoder = Encoder::new(&palette, "raw");
		let err = encoder.encode_file(&input).unwrap_err();
		assert!(matches!(err, EncodeError::Write { .. }));
		assert!(!err.is_load());
	}

	#[test]
	fn test_batch_isolates_corrupt_file() {
		let dir = TempDir::new().unwrap();
		let first = dir.path().join("a.png");
		let second = dir.path().join("b.png");
		let third = dir.path().join("c.png");
		write_indexed_png(&first, DISPLAY_WIDTH, DISPLAY_HEIGHT, &epd_rgbs(), &frame_pixels());
		fs::write(&second, b"\x89PNG truncated").unwrap();
		let mut reversed = epd_rgbs();
		reversed.reverse();
		write_indexed_png(&third, DISPLAY_WIDTH, DISPLAY_HEIGHT, &reversed, &frame_pixels());

		let palette = DevicePalette::epd().unwrap();
		let encoder = Encoder::new(&palette, "raw");
		let reports = encoder.encode_batch(&[first.clone(), second.clone(), third.clone()]);

		assert_eq!(reports.len(), 3);
		assert_eq!(reports[0].input, first);
		assert_eq!(reports[0].outcome.as_ref().unwrap().path, dir.path().join("a.raw"));
		assert!(reports[1].outcome.as_ref().unwrap_err().is_load());
		assert_eq!(reports[2].outcome.as_ref().unwrap().path, dir.path().join("c.raw"));

		assert!(!dir.path().join("b.raw").exists());
		let a = fs::read(dir.path().join("a.raw")).unwrap();
		let c = fs::read(dir.path().join("c.raw")).unwrap();
		assert_eq!(&a[..4], &[0x01, 0x23, 0x45, 0x67]);
		assert_eq!(&c[..4], &[0x76, 0x54, 0x32, 0x10]);
	}

	#[test]
	fn test_encode_rejects_oversized_header() {
		let palette = DevicePalette::epd().unwrap();
		let encoder = Encoder::new(&palette, "raw");
		let source = SourceImage::Oversized {
			width: 65535,
			height: 65535,
		};
		assert!(matches!(
			encoder.encode(source).unwrap_err(),
			EncodeError::SizeMismatch {
				width: 65535,
				height: 65535
			}
		));
	}

	#[test]
	fn test_encode_file_palette_bmp() {
		let dir = TempDir::new().unwrap();
		let input = dir.path().join("img001.bmp");
		let mut local: Vec<[u8; 3]> = epd_rgbs().iter().map(|c| c.0).collect();
		local.reverse();
		{
			let mut file = BufWriter::new(File::create(&input).unwrap());
			let mut enc = BmpEncoder::new(&mut file);
			enc.encode_with_palette(
				&frame_pixels(),
				DISPLAY_WIDTH,
				DISPLAY_HEIGHT,
				ExtendedColorType::L8,
				Some(local.as_slice()),
			)
			.unwrap();
		}

		let palette = DevicePalette::epd().unwrap();
		let encoder = Encoder::new(&palette, "raw");
		let artifact = encoder.encode_file(&input).unwrap();

		assert_eq!(artifact.path, dir.path().join("img001.raw"));
		let data = fs::read(&artifact.path).unwrap();
		assert_eq!(data.len(), PACKED_FRAME_SIZE);
		assert_eq!(&data[..4], &[0x76, 0x54, 0x32, 0x10]);
		assert_eq!(&data[data.len() - 4..], &[0x76, 0x54, 0x32, 0x10]);
	}
}
