//! Disk-image codec capability surface.
//!
//! Every codec a host loads satisfies [`DiskImageCodec`], whatever the
//! container format.  The surface speaks in sentinels (`bool`, `0`) and
//! records every failure in the instance's [`Status`](crate::status::Status),
//! because that is what crosses the C ABI; internally implementations work
//! with `Result<T, PluginError>`.
//!
//! # Capability flags
//! Hosts filter codecs by [`PluginType`] before instantiating anything.  A
//! codec that lacks a role still implements the members of that role as
//! deterministic failures, so a host can iterate heterogeneous codecs
//! without probing.
//!
//! # Multi-disk
//! The multi-disk members are always present.  Single-disk formats answer
//! "disk 1 of 1".

pub mod iso;

use std::path::Path;

pub use iso::IsoCodec;

// ── PluginType ────────────────────────────────────────────────────────────────

/// Bitset of roles a codec supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginType(pub u32);

impl PluginType {
    pub const READER: PluginType = PluginType(1);
    pub const WRITER: PluginType = PluginType(2);
    pub const FILTER: PluginType = PluginType(4);

    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn contains(self, other: PluginType) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: PluginType) -> PluginType {
        PluginType(self.0 | other.0)
    }
}

impl std::ops::BitOr for PluginType {
    type Output = PluginType;
    fn bitor(self, rhs: PluginType) -> PluginType {
        self.union(rhs)
    }
}

// ── CapabilityDescriptor ──────────────────────────────────────────────────────

/// Static, immutable description of a codec.  Queryable without an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityDescriptor {
    pub name:       &'static str,
    pub version:    &'static str,
    /// Lower-case, without the leading dot.
    pub extensions: &'static [&'static str],
    pub flags:      PluginType,
}

impl CapabilityDescriptor {
    /// Extensions joined with `|`, the form the ABI hands to hosts.
    pub fn extensions_joined(&self) -> String {
        self.extensions.join("|")
    }

    /// Case-insensitive extension check for `path`.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }
}

// ── DiskImageCodec ────────────────────────────────────────────────────────────

pub trait DiskImageCodec: Send {
    fn descriptor() -> &'static CapabilityDescriptor
    where
        Self: Sized;

    // Common

    /// Open `path`.  `mode` selects the direction (exactly one of READER or
    /// WRITER).  `threads` must be non-negative; codecs that do no CPU-heavy
    /// work ignore it.
    fn open(&mut self, path: &Path, mode: PluginType, threads: i32) -> bool;
    /// Flush and release everything.  Valid in any state.
    fn close(&mut self) -> bool;
    fn is_ok(&self) -> bool;
    /// Last error message, empty when none.
    fn error(&self) -> &str;
    /// Copy the last error into a NUL-terminated buffer; `false` (buffer and
    /// status untouched) if it does not fit.
    fn copy_error_into(&self, dst: &mut [u8]) -> bool;
    fn clear_error(&mut self);
    /// JSON settings payload; unknown keys are ignored.
    fn apply_settings(&mut self, payload: &str) -> bool;

    // Positioning

    fn seek(&mut self, position: u64, mode: crate::session::SeekMode) -> bool;
    fn seek_current_disk(&mut self, position: u64, mode: crate::session::SeekMode) -> bool;
    /// `0` with the status set when nothing is open; check `is_ok`.
    fn tell(&mut self) -> u64;
    fn tell_current_disk(&mut self) -> u64;
    fn disk_size(&mut self) -> u64;
    fn disk_real_size(&mut self) -> u64;

    // Reader

    /// Bytes actually read; short only at end-of-file.
    fn read(&mut self, buf: &mut [u8]) -> u64;
    fn identifier(&mut self) -> Option<String>;
    fn disk_identifier(&mut self) -> Option<String>;
    fn title(&mut self) -> Option<String>;
    fn disk_title(&mut self) -> Option<String>;
    fn total_disks(&mut self) -> u32;
    fn current_disk(&mut self) -> u32;
    fn change_disk(&mut self, disk: u32) -> bool;

    // Writer

    /// `buf.len()` on success, `0` on failure.
    fn write(&mut self, buf: &[u8]) -> u64;
    fn set_identifier(&mut self, id: &str) -> bool;
    fn set_total_disks(&mut self, total: u32) -> bool;
    fn add_disk(&mut self) -> bool;
    fn close_disk(&mut self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_compose() {
        let rw = PluginType::READER | PluginType::WRITER;
        assert_eq!(rw.bits(), 3);
        assert!(rw.contains(PluginType::READER));
        assert!(!rw.contains(PluginType::FILTER));
    }

    #[test]
    fn descriptor_extension_matching() {
        let d = IsoCodec::descriptor();
        assert!(d.accepts(Path::new("/games/crash.ISO")));
        assert!(!d.accepts(Path::new("/games/crash.bin")));
        assert!(!d.accepts(Path::new("noext")));
        assert_eq!(d.extensions_joined(), "iso");
    }
}
