//! Raw ISO codec — the canonical [`DiskImageCodec`] implementation.
//!
//! ISO is a verbatim container: what is read is what is on disk, what is
//! written lands on disk unchanged.  There is exactly one disk.

use std::path::Path;

use crate::codec::{CapabilityDescriptor, DiskImageCodec, PluginType};
use crate::error::{PluginError, Result};
use crate::identifier::{self, Identifier, SCAN_WINDOW};
use crate::logging::Logger;
use crate::session::{Direction, DiskSession, SeekMode};
use crate::settings::BufferSettings;
use crate::status::Status;
use crate::volume::VolumeDescriptor;

pub static ISO_DESCRIPTOR: CapabilityDescriptor = CapabilityDescriptor {
    name:       "ISO Image",
    version:    env!("CARGO_PKG_VERSION"),
    extensions: &["iso"],
    flags:      PluginType::READER.union(PluginType::WRITER),
};

pub struct IsoCodec {
    session:    DiskSession,
    status:     Status,
    settings:   BufferSettings,
    identifier: Option<Identifier>,
    title:      Option<String>,
    logger:     Logger,
}

impl Default for IsoCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl IsoCodec {
    pub fn new() -> Self {
        Self::with_logger(Logger::disabled())
    }

    pub fn with_logger(logger: Logger) -> Self {
        Self {
            session:    DiskSession::new(logger.clone()),
            status:     Status::new(),
            settings:   BufferSettings::default(),
            identifier: None,
            title:      None,
            logger,
        }
    }

    pub fn settings(&self) -> &BufferSettings {
        &self.settings
    }

    pub fn direction(&self) -> Option<Direction> {
        self.session.direction()
    }

    /// Record `err` in the status channel and the log.
    pub fn report_error(&mut self, err: PluginError) {
        self.logger.error(format_args!("ISO: {err}"));
        self.status.record(&err);
    }

    /// Collapse a result to a sentinel, recording the error.
    fn report<T>(&mut self, result: Result<T>, sentinel: T) -> T {
        match result {
            Ok(v)  => v,
            Err(e) => {
                self.report_error(e);
                sentinel
            }
        }
    }

    // ── Result-returning core ────────────────────────────────────────────────

    pub fn try_open(&mut self, path: &Path, mode: PluginType, threads: i32) -> Result<()> {
        if threads < 0 {
            return Err(PluginError::InvalidThreads(threads));
        }
        // Threads are accepted for interface symmetry only; nothing here is
        // CPU-bound.
        let direction = Direction::from_mode(mode.bits())?;
        self.session.open(path, direction, &self.settings)?;
        self.identifier = None;
        self.title = None;
        Ok(())
    }

    pub fn try_close(&mut self) -> Result<()> {
        self.identifier = None;
        self.title = None;
        self.session.close()
    }

    /// The cached identifier, scanning on first use.
    ///
    /// A successful scan is cached until `close`.  A failed scan caches
    /// nothing, so every later call reads and scans [`SCAN_WINDOW`] bytes
    /// again.
    pub fn try_identifier(&mut self) -> Result<Identifier> {
        if let Some(id) = self.identifier {
            return Ok(id);
        }
        let window = self.session.read_prefix(SCAN_WINDOW)?;
        let id = identifier::scan(&window).ok_or(PluginError::IdentifierNotFound)?;
        self.logger.debug(format_args!("ISO: found game ID {id}"));
        self.identifier = Some(id);
        Ok(id)
    }

    /// The volume identifier from the primary volume descriptor; cached like
    /// the game identifier.
    pub fn try_title(&mut self) -> Result<String> {
        if let Some(title) = &self.title {
            return Ok(title.clone());
        }
        let pvd = self
            .session
            .preserving_position(|s| VolumeDescriptor::locate(s.input()?))?;
        self.title = Some(pvd.volume_id.clone());
        Ok(pvd.volume_id)
    }

    fn require_open(&self) -> Result<()> {
        if self.session.is_open() { Ok(()) } else { Err(self.session.missing_handle()) }
    }

    fn require_writer(&self) -> Result<()> {
        match self.session.direction() {
            Some(Direction::Write) => Ok(()),
            _                      => Err(PluginError::NoOutput),
        }
    }

    /// Copy the identifier into a NUL-terminated buffer of at least 10 bytes.
    pub fn copy_identifier_into(&mut self, dst: &mut [u8]) -> bool {
        let result = self.try_identifier().and_then(|id| id.copy_into(dst));
        self.report(result.map(|_| true), false)
    }

    /// Copy the title into a NUL-terminated buffer.
    pub fn copy_title_into(&mut self, dst: &mut [u8]) -> bool {
        let result = self
            .try_title()
            .and_then(|t| crate::error::copy_c_string(t.as_bytes(), dst));
        self.report(result.map(|_| true), false)
    }
}

impl DiskImageCodec for IsoCodec {
    fn descriptor() -> &'static CapabilityDescriptor {
        &ISO_DESCRIPTOR
    }

    fn open(&mut self, path: &Path, mode: PluginType, threads: i32) -> bool {
        let r = self.try_open(path, mode, threads);
        self.report(r.map(|_| true), false)
    }

    fn close(&mut self) -> bool {
        let r = self.try_close();
        self.report(r.map(|_| true), false)
    }

    fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    fn error(&self) -> &str {
        self.status.error()
    }

    fn copy_error_into(&self, dst: &mut [u8]) -> bool {
        self.status.copy_error_into(dst)
    }

    fn clear_error(&mut self) {
        self.status.clear();
    }

    fn apply_settings(&mut self, payload: &str) -> bool {
        let r = self.settings.apply_json(payload);
        self.report(r.map(|_| true), false)
    }

    fn seek(&mut self, position: u64, mode: SeekMode) -> bool {
        let r = self.session.seek(position, mode);
        self.report(r.map(|_| true), false)
    }

    fn seek_current_disk(&mut self, position: u64, mode: SeekMode) -> bool {
        self.seek(position, mode)
    }

    fn tell(&mut self) -> u64 {
        let r = self.session.tell();
        self.report(r, 0)
    }

    fn tell_current_disk(&mut self) -> u64 {
        self.tell()
    }

    fn disk_size(&mut self) -> u64 {
        let r = self.session.disk_size();
        self.report(r, 0)
    }

    fn disk_real_size(&mut self) -> u64 {
        let r = self.session.disk_real_size();
        self.report(r, 0)
    }

    fn read(&mut self, buf: &mut [u8]) -> u64 {
        let r = self.session.read(buf).map(|n| n as u64);
        self.report(r, 0)
    }

    fn identifier(&mut self) -> Option<String> {
        let r = self.try_identifier().map(|id| Some(id.to_string()));
        self.report(r, None)
    }

    fn disk_identifier(&mut self) -> Option<String> {
        self.identifier()
    }

    fn title(&mut self) -> Option<String> {
        let r = self.try_title().map(Some);
        self.report(r, None)
    }

    fn disk_title(&mut self) -> Option<String> {
        self.title()
    }

    fn total_disks(&mut self) -> u32 {
        let r = self.require_open().map(|_| 1);
        self.report(r, 0)
    }

    fn current_disk(&mut self) -> u32 {
        let r = self.require_open().map(|_| 1);
        self.report(r, 0)
    }

    fn change_disk(&mut self, disk: u32) -> bool {
        let r = if disk == 1 { Ok(true) } else { Err(PluginError::DiskOutOfRange(disk)) };
        self.report(r, false)
    }

    fn write(&mut self, buf: &[u8]) -> u64 {
        let r = self.session.write(buf).map(|n| n as u64);
        self.report(r, 0)
    }

    // ISO stores no identifier and has one disk, so the writer-side
    // bookkeeping members only validate the session.

    fn set_identifier(&mut self, id: &str) -> bool {
        self.logger.debug(format_args!("ISO: ignoring game ID {id}, the format has no field for it"));
        let r = self.require_writer().map(|_| true);
        self.report(r, false)
    }

    fn set_total_disks(&mut self, total: u32) -> bool {
        let r = self.require_writer().and_then(|_| {
            if total == 1 { Ok(true) } else { Err(PluginError::DiskOutOfRange(total)) }
        });
        self.report(r, false)
    }

    fn add_disk(&mut self) -> bool {
        let r = self.require_writer().map(|_| true);
        self.report(r, false)
    }

    fn close_disk(&mut self) -> bool {
        let r = self.require_writer().map(|_| true);
        self.report(r, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn image(data: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(data).unwrap();
        f.flush().unwrap();
        f
    }

    fn open_reader(f: &NamedTempFile) -> IsoCodec {
        let mut c = IsoCodec::new();
        assert!(c.open(f.path(), PluginType::READER, 1));
        c
    }

    #[test]
    fn descriptor_is_static() {
        let d = IsoCodec::descriptor();
        assert_eq!(d.name, "ISO Image");
        assert_eq!(d.extensions, &["iso"]);
        assert!(d.flags.contains(PluginType::READER));
        assert!(d.flags.contains(PluginType::WRITER));
        assert!(!d.flags.contains(PluginType::FILTER));
    }

    #[test]
    fn negative_threads_rejected() {
        let f = image(b"data");
        let mut c = IsoCodec::new();
        assert!(!c.open(f.path(), PluginType::READER, -1));
        assert!(!c.is_ok());
        assert!(c.direction().is_none());
        c.clear_error();
        assert!(c.open(f.path(), PluginType::READER, 64));
    }

    #[test]
    fn ambiguous_mode_rejected() {
        let f = image(b"data");
        let mut c = IsoCodec::new();
        assert!(!c.open(f.path(), PluginType::READER | PluginType::WRITER, 1));
        assert!(!c.is_ok());
        assert!(c.error().contains("Unsupported open mode"));
    }

    #[test]
    fn identifier_is_cached_and_position_restored() {
        let mut data = vec![0u8; 8192];
        data[100..111].copy_from_slice(b"SCES_009.87");
        let f = image(&data);
        let mut c = open_reader(&f);
        assert!(c.seek(500, SeekMode::Begin));
        assert_eq!(c.identifier().as_deref(), Some("SCES00987"));
        assert_eq!(c.tell(), 500);
        assert_eq!(c.disk_identifier().as_deref(), Some("SCES00987"));
        assert!(c.is_ok());

        let mut buf = [0xFFu8; 10];
        assert!(c.copy_identifier_into(&mut buf));
        assert_eq!(&buf, b"SCES00987\0");

        let mut small = [0xFFu8; 9];
        assert!(!c.copy_identifier_into(&mut small));
        assert_eq!(small, [0xFFu8; 9]);
        assert!(!c.is_ok());
    }

    #[test]
    fn missing_identifier_sets_status_every_time() {
        let f = image(&[0u8; 4096]);
        let mut c = open_reader(&f);
        assert_eq!(c.identifier(), None);
        assert!(!c.is_ok());
        assert_eq!(c.error(), "No ID found.");
        c.clear_error();
        assert_eq!(c.identifier(), None);
        assert_eq!(c.error(), "No ID found.");
    }

    #[test]
    fn identifier_cleared_on_close() {
        let mut data = vec![0u8; 2048];
        data[0..11].copy_from_slice(b"SLUS_012.34");
        let f = image(&data);
        let mut c = open_reader(&f);
        assert_eq!(c.identifier().as_deref(), Some("SLUS01234"));
        assert!(c.close());
        assert_eq!(c.identifier(), None);
        assert_eq!(c.error(), "There is no input file opened");
    }

    #[test]
    fn title_from_volume_descriptor() {
        let mut data = vec![0u8; 17 * 2048];
        data[16 * 2048..17 * 2048].copy_from_slice(&crate::volume::tests::pvd_sector("CRASH"));
        let f = image(&data);
        let mut c = open_reader(&f);
        assert!(c.seek(7, SeekMode::Begin));
        assert_eq!(c.title().as_deref(), Some("CRASH"));
        assert_eq!(c.disk_title().as_deref(), Some("CRASH"));
        assert_eq!(c.tell(), 7);

        let mut buf = [0u8; 6];
        assert!(c.copy_title_into(&mut buf));
        assert_eq!(&buf, b"CRASH\0");
    }

    #[test]
    fn multi_disk_is_one_of_one() {
        let mut c = IsoCodec::new();
        assert_eq!(c.total_disks(), 0);
        assert!(!c.is_ok());
        c.clear_error();

        let f = image(b"abc");
        assert!(c.open(f.path(), PluginType::READER, 1));
        assert_eq!(c.total_disks(), 1);
        assert_eq!(c.current_disk(), 1);
        assert!(c.change_disk(1));
        assert!(c.is_ok());
        assert!(!c.change_disk(2));
        assert!(!c.is_ok());
        assert_eq!(c.current_disk(), 1);
    }

    #[test]
    fn writer_bookkeeping_needs_write_session() {
        let f = image(b"abc");
        let mut c = open_reader(&f);
        assert!(!c.set_identifier("SCES00987"));
        assert!(!c.add_disk());
        c.close();
        c.clear_error();

        let out = NamedTempFile::new().unwrap();
        assert!(c.open(out.path(), PluginType::WRITER, 0));
        assert!(c.set_identifier("SCES00987"));
        assert!(c.set_total_disks(1));
        assert!(c.add_disk());
        assert!(c.close_disk());
        assert!(c.is_ok());
        assert!(!c.set_total_disks(2));
    }

    #[test]
    fn settings_apply_to_next_open() {
        let mut c = IsoCodec::new();
        assert!(c.apply_settings(r#"{"enable_buffer": true, "buffer_size": 47040}"#));
        assert!(c.settings().enable_buffer);
        assert!(!c.apply_settings(r#"{"buffer_size": 1}"#));
        assert_eq!(c.settings().buffer_size, 47040);

        let f = image(&[9u8; 100]);
        assert!(c.open(f.path(), PluginType::READER, 1));
        let mut buf = [0u8; 200];
        assert_eq!(c.read(&mut buf), 100);
    }
}
