//! Game identifiers recovered from disc sector data.
//!
//! An identifier is the 9-character product code stamped on a disc, e.g.
//! `SCES00987`.  On disc it normally appears as the boot executable name
//! `SCES_009.87`; [`scanner::scan`] strips the delimiters.

pub mod scanner;

use std::fmt;

use crate::error::{copy_c_string, Result};

pub use scanner::{scan, PREFIXES, SCAN_WINDOW};

/// Length of an identifier in bytes (no terminator).
pub const IDENTIFIER_LEN: usize = 9;
/// Minimum capacity of a C output buffer for an identifier (9 bytes + NUL).
pub const IDENTIFIER_BUFFER_LEN: usize = IDENTIFIER_LEN + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier([u8; IDENTIFIER_LEN]);

impl Identifier {
    pub fn from_bytes(bytes: [u8; IDENTIFIER_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; IDENTIFIER_LEN] {
        &self.0
    }

    /// The 4-byte platform/region prefix, e.g. `SCES`.
    pub fn prefix(&self) -> &[u8] {
        &self.0[..4]
    }

    /// Region implied by the prefix, for diagnostics only.
    pub fn region(&self) -> Option<Region> {
        Region::from_prefix(self.prefix())
    }

    /// Copy into a NUL-terminated buffer of at least [`IDENTIFIER_BUFFER_LEN`]
    /// bytes.  The buffer is zero-filled first; on failure it is untouched.
    pub fn copy_into(&self, dst: &mut [u8]) -> Result<()> {
        copy_c_string(&self.0, dst)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Usa,
    Europe,
    Japan,
    Korea,
    Asia,
}

impl Region {
    pub fn from_prefix(prefix: &[u8]) -> Option<Self> {
        match prefix {
            b"SCUS" | b"SLUS" | b"SPUS" | b"PUPX"          => Some(Region::Usa),
            b"SCES" | b"SLES" | b"SCED" | b"SLED" | b"PEPX" => Some(Region::Europe),
            b"SCPS" | b"SLPS" | b"SLPM" | b"SIPS" | b"SCPM"
            | b"ESPM" | b"PAPX" | b"PCPX" | b"PCPD"
            | b"PTPX" | b"PBPX"                           => Some(Region::Japan),
            b"SCKA" | b"SLKA"                             => Some(Region::Korea),
            b"SCAJ" | b"SCZS" | b"CPCS"                   => Some(Region::Asia),
            _                                             => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Region::Usa    => "USA",
            Region::Europe => "Europe",
            Region::Japan  => "Japan",
            Region::Korea  => "Korea",
            Region::Asia   => "Asia",
        }
    }
}
