use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::consts::COLOR_COUNT;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Rgb(pub [u8; 3]);

impl fmt::Display for Rgb {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let [r, g, b] = self.0;
		write!(f, "({r}, {g}, {b})")
	}
}

/// Physical colors of the 7 color panel, valued by their controller index.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EpdColor {
	Black = 0,
	White = 1,
	Green = 2,
	Blue = 3,
	Red = 4,
	Yellow = 5,
	Orange = 6,
	Clean = 7,
}

/// Colors as they appear in the E-Paper.gpl palette used to dither images.
pub const EPD_COLORS: [(Rgb, EpdColor); COLOR_COUNT] = [
	(Rgb([0, 0, 0]), EpdColor::Black),
	(Rgb([255, 255, 255]), EpdColor::White),
	(Rgb([67, 138, 28]), EpdColor::Green),
	(Rgb([100, 64, 255]), EpdColor::Blue),
	(Rgb([191, 0, 0]), EpdColor::Red),
	(Rgb([255, 243, 56]), EpdColor::Yellow),
	(Rgb([232, 126, 0]), EpdColor::Orange),
	(Rgb([200, 200, 216]), EpdColor::Clean),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaletteTableError {
	#[error("device palette needs {} entries, got {0}", COLOR_COUNT)]
	WrongSize(usize),

	#[error("device palette lists color {0} twice")]
	DuplicateColor(Rgb),

	#[error("device palette index {0} is out of range or used twice")]
	BadIndex(u8),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaletteError {
	#[error("image has no color palette")]
	Missing,

	#[error("wrong palette length {0}")]
	WrongLength(usize),

	#[error("palette slot {slot} color {rgb} is not an EPD color")]
	Unmatched { slot: usize, rgb: Rgb },
}

/// Validated RGB to device index lookup.
#[derive(Debug, Clone)]
pub struct DevicePalette {
	lookup: HashMap<Rgb, u8>,
}

impl DevicePalette {
	pub fn new(entries: &[(Rgb, u8)]) -> Result<Self, PaletteTableError> {
		if entries.len() != COLOR_COUNT {
			return Err(PaletteTableError::WrongSize(entries.len()));
		}

		let mut seen = [false; COLOR_COUNT];
		let mut lookup = HashMap::with_capacity(COLOR_COUNT);
		for &(rgb, index) in entries {
			let slot = seen
				.get_mut(index as usize)
				.filter(|used| !**used)
				.ok_or(PaletteTableError::BadIndex(index))?;
			*slot = true;
			if lookup.insert(rgb, index).is_some() {
				return Err(PaletteTableError::DuplicateColor(rgb));
			}
		}
		Ok(Self { lookup })
	}

	pub fn epd() -> Result<Self, PaletteTableError> {
		let entries: Vec<(Rgb, u8)> = EPD_COLORS
			.iter()
			.map(|&(rgb, color)| (rgb, color as u8))
			.collect();
		Self::new(&entries)
	}

	pub fn index_of(&self, rgb: &Rgb) -> Option<u8> {
		self.lookup.get(rgb).copied()
	}

	/// Map every slot of an image's local palette onto a device index.
	///
	/// The local palette must hold exactly [`COLOR_COUNT`] colors. Slots may
	/// repeat a color, but each one has to be an exact device color match.
	pub fn reconcile(&self, local: &[Rgb]) -> Result<TranslationTable, PaletteError> {
		if local.len() != COLOR_COUNT {
			return Err(PaletteError::WrongLength(local.len()));
		}

		let mut table = [0u8; COLOR_COUNT];
		for (slot, rgb) in local.iter().enumerate() {
			table[slot] = self
				.index_of(rgb)
				.ok_or(PaletteError::Unmatched { slot, rgb: *rgb })?;
		}
		Ok(TranslationTable(table))
	}
}

/// Per image mapping from local palette slot to device color index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationTable([u8; COLOR_COUNT]);

impl TranslationTable {
	#[cfg(test)]
	pub fn identity() -> Self {
		let mut table = [0u8; COLOR_COUNT];
		for (i, v) in table.iter_mut().enumerate() {
			*v = i as u8;
		}
		Self(table)
	}

	pub fn translate(&self, slot: u8) -> Option<u8> {
		self.0.get(slot as usize).copied()
	}

	pub fn as_slice(&self) -> &[u8] {
		&self.0
	}
}

pub fn rgb_triples(data: &[u8]) -> Vec<Rgb> {
	data.chunks_exact(3).map(|c| Rgb([c[0], c[1], c[2]])).collect()
}
