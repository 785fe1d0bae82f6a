use crate::pack::PixelSource;
use crate::palette::Rgb;

/// Palette based image, one slot value per pixel in row-major order.
#[derive(Debug, Clone)]
pub struct IndexedImage {
	pub width: u32,
	pub height: u32,
	pub pixels: Vec<u8>,
	pub palette: Option<Vec<Rgb>>,
}

impl PixelSource for IndexedImage {
	fn width(&self) -> u32 {
		self.width
	}

	fn height(&self) -> u32 {
		self.height
	}

	fn slot(&self, x: u32, y: u32) -> u8 {
		self.pixels[(y * self.width + x) as usize]
	}
}

#[derive(Debug, Clone)]
pub enum SourceImage {
	Indexed(IndexedImage),
	Direct {
		width: u32,
		height: u32,
		color: String,
	},
	/// Larger than the panel; only the header was read.
	Oversized { width: u32, height: u32 },
}

impl SourceImage {
	pub fn dimensions(&self) -> (u32, u32) {
		match self {
			SourceImage::Indexed(img) => (img.width, img.height),
			SourceImage::Direct { width, height, .. } | SourceImage::Oversized { width, height } => {
				(*width, *height)
			}
		}
	}
}
