use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::consts::CONFIG_PARAM_SIZE;

/// Runtime parameters read by the frame firmware from `epd.cfg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EpdParameters {
	/// Minutes between display updates.
	pub interval: u16,
	/// Supply voltage in mV below which the frame stops and asks for a charge.
	pub min_voltage: u16,
	/// Calibrated internal ADC reference in mV.
	pub ref_voltage: u16,
	/// Supply voltage in mV measured while calibrating the reference.
	pub sup_voltage: u16,
}

#[derive(Deserialize)]
struct ParameterFile {
	#[serde(rename = "Parameter")]
	parameter: EpdParameters,
}

impl EpdParameters {
	pub fn from_json(text: &str) -> Result<Self> {
		let file: ParameterFile = serde_json::from_str(text)?;
		Ok(file.parameter)
	}

	pub fn load(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path)
			.with_context(|| format!("cannot read {}", path.display()))?;
		Self::from_json(&text).with_context(|| format!("invalid parameter file {}", path.display()))
	}

	pub fn from_bytes(data: &[u8]) -> Result<Self> {
		if data.len() < CONFIG_PARAM_SIZE {
			bail!("parameter data too short: {} < {}", data.len(), CONFIG_PARAM_SIZE);
		}
		Ok(Self {
			interval: u16::from_le_bytes([data[0], data[1]]),
			min_voltage: u16::from_le_bytes([data[2], data[3]]),
			ref_voltage: u16::from_le_bytes([data[4], data[5]]),
			sup_voltage: u16::from_le_bytes([data[6], data[7]]),
		})
	}

	pub fn to_bytes(&self) -> [u8; CONFIG_PARAM_SIZE] {
		let mut b = [0u8; CONFIG_PARAM_SIZE];
		b[0..2].copy_from_slice(&self.interval.to_le_bytes());
		b[2..4].copy_from_slice(&self.min_voltage.to_le_bytes());
		b[4..6].copy_from_slice(&self.ref_voltage.to_le_bytes());
		b[6..8].copy_from_slice(&self.sup_voltage.to_le_bytes());
		b
	}
}

impl fmt::Display for EpdParameters {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "Interval   : {} minutes", self.interval)?;
		writeln!(f, "MinVoltage : {} mV", self.min_voltage)?;
		writeln!(f, "RefVoltage : {} mV", self.ref_voltage)?;
		write!(f, "SupVoltage : {} mV", self.sup_voltage)
	}
}
