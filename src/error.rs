//! Error taxonomy shared by every plugin operation.
//!
//! Internally every fallible operation returns `Result<T, PluginError>`.  The
//! capability surface (see [`crate::codec`]) converts an `Err` into a failure
//! sentinel plus a Status message; nothing is ever thrown across the C ABI.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    /// No read session is open.
    #[error("There is no input file opened")]
    NoInput,
    /// No write session is open.
    #[error("There is no output file opened")]
    NoOutput,
    #[error("A file is already opened; close it first")]
    AlreadyOpen,
    /// Open mode must select exactly one of READER / WRITER.
    #[error("Unsupported open mode {0:#x}: select exactly one of reader or writer")]
    AmbiguousDirection(u32),
    #[error("Invalid threads value {0}: must be non-negative")]
    InvalidThreads(i32),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source:  io::Error,
    },
    #[error("Error seeking into the file: {0}")]
    InvalidAddressing(String),
    #[error("Output buffer too small: {needed} bytes needed, capacity is {capacity}")]
    BufferTooSmall { needed: usize, capacity: usize },
    #[error("No ID found.")]
    IdentifierNotFound,
    #[error("No ISO 9660 primary volume descriptor found.")]
    TitleNotFound,
    #[error("There was an error allocating {0} bytes of scan memory")]
    Allocation(usize),
    #[error("Disk {0} does not exist: ISO images contain exactly one disk")]
    DiskOutOfRange(u32),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Invalid file path")]
    InvalidPath,
    #[error("Null pointer passed for {0}")]
    NullPointer(&'static str),
}

/// Fieldless discriminant of [`PluginError`], for callers that only branch
/// on the category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoHandle,
    AlreadyOpen,
    InvalidArgument,
    Io,
    InvalidAddressing,
    BufferTooSmall,
    NotFound,
    Allocation,
}

impl PluginError {
    pub(crate) fn io(context: &'static str, source: io::Error) -> Self {
        PluginError::Io { context, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PluginError::NoInput | PluginError::NoOutput => ErrorKind::NoHandle,
            PluginError::AlreadyOpen                     => ErrorKind::AlreadyOpen,
            PluginError::AmbiguousDirection(_)
            | PluginError::InvalidThreads(_)
            | PluginError::DiskOutOfRange(_)
            | PluginError::InvalidSettings(_)
            | PluginError::InvalidPath
            | PluginError::NullPointer(_)                => ErrorKind::InvalidArgument,
            PluginError::Io { .. }                       => ErrorKind::Io,
            PluginError::InvalidAddressing(_)            => ErrorKind::InvalidAddressing,
            PluginError::BufferTooSmall { .. }           => ErrorKind::BufferTooSmall,
            PluginError::IdentifierNotFound
            | PluginError::TitleNotFound                 => ErrorKind::NotFound,
            PluginError::Allocation(_)                   => ErrorKind::Allocation,
        }
    }
}

pub type Result<T> = std::result::Result<T, PluginError>;

// ── C string helpers ─────────────────────────────────────────────────────────

/// Copy `text` into a caller-supplied NUL-terminated buffer.
///
/// The fit check runs first: if `text` plus its terminator does not fit, the
/// buffer is left exactly as it was.  Otherwise the whole buffer is zeroed
/// before the copy.
pub fn copy_c_string(text: &[u8], dst: &mut [u8]) -> Result<()> {
    let needed = text.len() + 1;
    if needed > dst.len() {
        return Err(PluginError::BufferTooSmall { needed, capacity: dst.len() });
    }
    dst.fill(0);
    dst[..text.len()].copy_from_slice(text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_zero_fills_tail() {
        let mut buf = [0xFFu8; 8];
        copy_c_string(b"abc", &mut buf).unwrap();
        assert_eq!(&buf, b"abc\0\0\0\0\0");
    }

    #[test]
    fn copy_rejects_missing_terminator_room() {
        let mut buf = [0x55u8; 3];
        let err = copy_c_string(b"abc", &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BufferTooSmall);
        assert_eq!(buf, [0x55u8; 3]);
    }

    #[test]
    fn not_found_message_is_stable() {
        assert_eq!(PluginError::IdentifierNotFound.to_string(), "No ID found.");
    }
}
