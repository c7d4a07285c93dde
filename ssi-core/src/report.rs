//! Conversion of raw frames to linear position and the text report format

use core::fmt::{self, Write};
use crate::types::{RawSample, SsiConfig};

/// Line written once when the transport comes up
pub const BANNER: &str = "System Started\n";

/// Linear position in nanometres
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Position(u64);

impl Position {
    pub const fn from_nanometers(nm: u64) -> Self {
        Self(nm)
    }

    /// Apply the leading-bit policy and scale counts to distance
    pub fn from_sample(sample: RawSample, config: &SsiConfig) -> Self {
        let counts = sample.counts(config.leading_bit) as u64;
        Self(counts * config.resolution_nm as u64)
    }

    pub const fn nanometers(&self) -> u64 {
        self.0
    }

    /// Whole millimetres
    pub const fn millimeters(&self) -> u64 {
        self.0 / 1_000_000
    }

    /// Fraction of a millimetre in micrometres, truncated
    pub const fn micrometer_fraction(&self) -> u16 {
        ((self.0 / 1_000) % 1_000) as u16
    }
}

/// Millimetres with exactly three truncated fractional digits
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.millimeters(), self.micrometer_fraction())
    }
}

/// Label and unit surrounding the number in a report line
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReportFormat {
    pub label: &'static str,
    pub unit: &'static str,
}

impl Default for ReportFormat {
    fn default() -> Self {
        Self {
            label: "Position: ",
            unit: " mm",
        }
    }
}

impl ReportFormat {
    /// Write one newline-terminated report line
    pub fn write_report<W: Write>(&self, out: &mut W, position: Position) -> fmt::Result {
        writeln!(out, "{}{}{}", self.label, position, self.unit)
    }
}

/// Write the startup banner
pub fn write_banner<W: Write>(out: &mut W) -> fmt::Result {
    out.write_str(BANNER)
}
