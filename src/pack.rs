use thiserror::Error;

use crate::palette::TranslationTable;

/// Random access to the palette slot stored for each pixel.
pub trait PixelSource {
	fn width(&self) -> u32;
	fn height(&self) -> u32;
	fn slot(&self, x: u32, y: u32) -> u8;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PackError {
	#[error("image width {0} is odd, pixels cannot be paired")]
	OddWidth(u32),

	#[error("color index {value} out of range at ({x}, {y})")]
	OutOfRange { x: u32, y: u32, value: u8 },
}

/// Pack two pixels per byte, left pixel in the high nibble.
pub fn pack_pixels<S: PixelSource + ?Sized>(
	src: &S,
	table: &TranslationTable,
) -> Result<Vec<u8>, PackError> {
	let width = src.width();
	let height = src.height();
	if width % 2 != 0 {
		return Err(PackError::OddWidth(width));
	}

	let translate = |x: u32, y: u32| {
		let value = src.slot(x, y);
		table
			.translate(value)
			.ok_or(PackError::OutOfRange { x, y, value })
	};

	let mut data = Vec::with_capacity((width / 2) as usize * height as usize);
	for y in 0..height {
		for x in (0..width).step_by(2) {
			let hi = translate(x, y)?;
			let lo = translate(x + 1, y)?;
			data.push((hi << 4) | lo);
		}
	}
	Ok(data)
}
