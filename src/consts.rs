pub const DISPLAY_WIDTH: u32 = 600;
pub const DISPLAY_HEIGHT: u32 = 448;
pub const COLOR_COUNT: usize = 8;
pub const PACKED_FRAME_SIZE: usize = (DISPLAY_WIDTH * DISPLAY_HEIGHT / 2) as usize;

pub const RAW_EXTENSION: &str = "raw";

pub const CONFIG_MAGIC: [u8; 3] = *b"EPD";
pub const CONFIG_VERSION: u8 = 1;
pub const CONFIG_PARAM_COUNT: u8 = 4;
pub const CONFIG_HEADER_SIZE: usize = 6;
pub const CONFIG_PARAM_SIZE: usize = 2 * CONFIG_PARAM_COUNT as usize;
pub const CONFIG_BLOB_SIZE: usize = CONFIG_HEADER_SIZE + CONFIG_PARAM_SIZE;
pub const DEFAULT_CONFIG_FILE: &str = "epd.cfg";
