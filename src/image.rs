use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use byteorder::{ReadBytesExt, LE};
use image::{ImageDecoder, ImageFormat, ImageReader};
use thiserror::Error;
use tracing::debug;

use crate::consts::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::palette::{rgb_triples, Rgb};
use crate::types::{IndexedImage, SourceImage};

const BMP_FILE_HEADER_SIZE: usize = 14;
const BMP_INFO_HEADER_SIZE: u32 = 40;

#[derive(Debug, Error)]
pub enum LoadError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("PNG decode failed: {0}")]
	Png(#[from] png::DecodingError),

	#[error("GIF decode failed: {0}")]
	Gif(#[from] gif::DecodingError),

	#[error("BMP decode failed: {0}")]
	Bmp(String),

	#[error("image decode failed: {0}")]
	Image(#[from] image::ImageError),

	#[error("GIF has no frames")]
	NoFrames,
}

/// Open an image keeping its palette indices when the format has them.
///
/// PNG, GIF and BMP are read with dedicated decoders so slot values and the
/// local palette survive. Anything else `image` recognises is reported as
/// direct color from its header.
pub fn load_image(path: &Path) -> Result<SourceImage, LoadError> {
	let reader = ImageReader::open(path)?.with_guessed_format()?;

	match reader.format() {
		Some(ImageFormat::Png) => load_png(path),
		Some(ImageFormat::Gif) => load_gif(path),
		Some(ImageFormat::Bmp) => load_bmp(path),
		_ => load_direct(reader),
	}
}

// Pixel data of images larger than the panel is never decoded.
fn exceeds_display(width: u32, height: u32) -> bool {
	width as u64 * height as u64 > DISPLAY_WIDTH as u64 * DISPLAY_HEIGHT as u64
}

fn load_direct(reader: ImageReader<BufReader<File>>) -> Result<SourceImage, LoadError> {
	let decoder = reader.into_decoder()?;
	let (width, height) = decoder.dimensions();
	let color = decoder.color_type();
	debug!("direct color image {}x{} {:?}", width, height, color);
	Ok(SourceImage::Direct {
		width,
		height,
		color: format!("{color:?}"),
	})
}

fn load_png(path: &Path) -> Result<SourceImage, LoadError> {
	let mut decoder = png::Decoder::new(BufReader::new(File::open(path)?));
	decoder.set_transformations(png::Transformations::IDENTITY);
	let mut reader = decoder.read_info()?;

	let info = reader.info();
	let (width, height) = (info.width, info.height);
	if info.color_type != png::ColorType::Indexed {
		return Ok(SourceImage::Direct {
			width,
			height,
			color: format!("{:?}", info.color_type),
		});
	}
	if exceeds_display(width, height) {
		return Ok(SourceImage::Oversized { width, height });
	}
	let palette = info.palette.as_deref().map(rgb_triples);

	let mut buf = vec![0u8; reader.output_buffer_size()];
	let frame = reader.next_frame(&mut buf)?;
	debug!(
		"png {}x{} indexed, {} bit",
		width, height, frame.bit_depth as u8
	);

	let pixels = unpack_indexed(
		&buf[..frame.buffer_size()],
		width,
		height,
		frame.line_size,
		frame.bit_depth as u8,
	);

	Ok(SourceImage::Indexed(IndexedImage {
		width,
		height,
		pixels,
		palette,
	}))
}

fn unpack_indexed(data: &[u8], width: u32, height: u32, line_size: usize, bits: u8) -> Vec<u8> {
	let bits = bits as usize;
	let per_byte = 8 / bits;
	let mask = ((1u16 << bits) - 1) as u8;

	let mut pixels = Vec::with_capacity(width as usize * height as usize);
	for row in data.chunks(line_size).take(height as usize) {
		for x in 0..width as usize {
			let byte = row[x / per_byte];
			let shift = 8 - bits * (x % per_byte + 1);
			pixels.push((byte >> shift) & mask);
		}
	}
	pixels
}

/// Uncompressed BMP with a BITMAPINFOHEADER (or a later extension of it).
///
/// 1/2/4/8 bit images keep their color table as the local palette, deeper
/// ones are direct color. Rows are stored bottom-up unless the height is
/// negative.
fn load_bmp(path: &Path) -> Result<SourceImage, LoadError> {
	let data = std::fs::read(path)?;

	let mut cursor = Cursor::new(&data[..]);
	let mut magic = [0u8; 2];
	cursor.read_exact(&mut magic)?;
	if &magic != b"BM" {
		return Err(LoadError::Bmp("missing BM signature".into()));
	}
	cursor.set_position(10);
	let pixel_offset = cursor.read_u32::<LE>()? as usize;
	let dib_size = cursor.read_u32::<LE>()?;
	if dib_size < BMP_INFO_HEADER_SIZE {
		return Err(LoadError::Bmp(format!("unsupported header size {dib_size}")));
	}
	let raw_width = cursor.read_i32::<LE>()?;
	let raw_height = cursor.read_i32::<LE>()?;
	let _planes = cursor.read_u16::<LE>()?;
	let bits = cursor.read_u16::<LE>()?;
	let compression = cursor.read_u32::<LE>()?;
	let _image_size = cursor.read_u32::<LE>()?;
	let _x_ppm = cursor.read_i32::<LE>()?;
	let _y_ppm = cursor.read_i32::<LE>()?;
	let colors_used = cursor.read_u32::<LE>()?;

	if raw_width <= 0 || raw_height == 0 {
		return Err(LoadError::Bmp(format!("invalid size {raw_width}x{raw_height}")));
	}
	let width = raw_width as u32;
	let height = raw_height.unsigned_abs();

	if !matches!(bits, 1 | 2 | 4 | 8) {
		return Ok(SourceImage::Direct {
			width,
			height,
			color: format!("Bmp{bits}"),
		});
	}
	if compression != 0 {
		return Err(LoadError::Bmp(format!("compression {compression} is not supported")));
	}
	if exceeds_display(width, height) {
		return Ok(SourceImage::Oversized { width, height });
	}

	let color_count = match colors_used {
		0 => 1usize << bits,
		n if n as usize <= 1 << bits => n as usize,
		n => return Err(LoadError::Bmp(format!("{n} palette colors for {bits} bit pixels"))),
	};
	let table_start = BMP_FILE_HEADER_SIZE + dib_size as usize;
	let table = data
		.get(table_start..table_start + 4 * color_count)
		.ok_or_else(|| LoadError::Bmp("truncated color table".into()))?;
	// entries are stored as B, G, R, reserved
	let palette: Vec<Rgb> = table
		.chunks_exact(4)
		.map(|c| Rgb([c[2], c[1], c[0]]))
		.collect();

	let stride = (width as usize * bits as usize).div_ceil(32) * 4;
	let rows = data
		.get(pixel_offset..pixel_offset + stride * height as usize)
		.ok_or_else(|| LoadError::Bmp("truncated pixel data".into()))?;

	let mut pixels = unpack_indexed(rows, width, height, stride, bits as u8);
	if raw_height > 0 {
		pixels = pixels
			.chunks(width as usize)
			.rev()
			.flatten()
			.copied()
			.collect();
	}
	debug!("bmp {}x{} indexed, {} bit, {} colors", width, height, bits, color_count);

	Ok(SourceImage::Indexed(IndexedImage {
		width,
		height,
		pixels,
		palette: Some(palette),
	}))
}

fn load_gif(path: &Path) -> Result<SourceImage, LoadError> {
	use gif::DecodeOptions;

	let mut opts = DecodeOptions::new();
	opts.set_color_output(gif::ColorOutput::Indexed);
	let mut decoder = opts.read_info(BufReader::new(File::open(path)?))?;

	let width = decoder.width() as u32;
	let height = decoder.height() as u32;
	if exceeds_display(width, height) {
		return Ok(SourceImage::Oversized { width, height });
	}
	let global_palette = decoder.global_palette().map(<[u8]>::to_vec);
	let background = decoder.bg_color().unwrap_or(0) as u8;

	let frame = decoder.read_next_frame()?.ok_or(LoadError::NoFrames)?;
	let palette = frame
		.palette
		.as_deref()
		.or(global_palette.as_deref())
		.map(rgb_triples);

	let mut canvas = vec![background; (width * height) as usize];
	let fx = frame.left as u32;
	let fy = frame.top as u32;
	let fw = frame.width as u32;
	let fh = frame.height as u32;

	for y in 0..fh {
		for x in 0..fw {
			let dst_x = fx + x;
			let dst_y = fy + y;
			if dst_x < width && dst_y < height {
				canvas[(dst_y * width + dst_x) as usize] = frame.buffer[(y * fw + x) as usize];
			}
		}
	}
	debug!("gif {}x{}, frame {}x{} at ({}, {})", width, height, fw, fh, fx, fy);

	Ok(SourceImage::Indexed(IndexedImage {
		width,
		height,
		pixels: canvas,
		palette,
	}))
}
