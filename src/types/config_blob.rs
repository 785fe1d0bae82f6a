use anyhow::{bail, Result};
use crc::{Crc, CRC_8_SMBUS};

use crate::consts::{
	CONFIG_BLOB_SIZE, CONFIG_HEADER_SIZE, CONFIG_MAGIC, CONFIG_PARAM_COUNT, CONFIG_VERSION,
};
use crate::types::EpdParameters;

// avr-libc _crc8_ccitt_update: poly 0x07, init 0, no reflection, no final xor
const CRC8_CCITT: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

pub fn crc8_ccitt(data: &[u8]) -> u8 {
	CRC8_CCITT.checksum(data)
}

/// The `epd.cfg` file: 6 byte header followed by the parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigBlob {
	pub params: EpdParameters,
}

impl ConfigBlob {
	pub fn new(params: EpdParameters) -> Self {
		Self { params }
	}

	pub fn crc(&self) -> u8 {
		crc8_ccitt(&self.params.to_bytes())
	}

	pub fn to_bytes(&self) -> [u8; CONFIG_BLOB_SIZE] {
		let param_bytes = self.params.to_bytes();
		let mut buf = [0u8; CONFIG_BLOB_SIZE];
		buf[0..3].copy_from_slice(&CONFIG_MAGIC);
		buf[3] = CONFIG_VERSION;
		buf[4] = CONFIG_PARAM_COUNT;
		buf[5] = crc8_ccitt(&param_bytes);
		buf[CONFIG_HEADER_SIZE..].copy_from_slice(&param_bytes);
		buf
	}

	/// Parse a blob the way the firmware accepts it.
	pub fn from_bytes(buf: &[u8]) -> Result<Self> {
		if buf.len() != CONFIG_BLOB_SIZE {
			bail!("config blob has {} bytes, expected {}", buf.len(), CONFIG_BLOB_SIZE);
		}
		if buf[0..3] != CONFIG_MAGIC {
			bail!("not an epd config blob (bad magic)");
		}
		if buf[3] != CONFIG_VERSION || buf[4] != CONFIG_PARAM_COUNT {
			bail!(
				"unsupported config header: version {}, {} parameters",
				buf[3],
				buf[4]
			);
		}

		let param_bytes = &buf[CONFIG_HEADER_SIZE..];
		let computed = crc8_ccitt(param_bytes);
		if computed != buf[5] {
			bail!("config CRC mismatch: stored {:#04x}, computed {:#04x}", buf[5], computed);
		}

		Ok(Self {
			params: EpdParameters::from_bytes(param_bytes)?,
		})
	}
}
