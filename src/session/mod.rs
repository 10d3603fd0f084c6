//! Disk session — one open image file in one direction.
//!
//! # States
//! ```text
//! Closed --open(Read)--> Reading --close--> Closed
//! Closed --open(Write)-> Writing --close--> Closed
//! ```
//! `open` is only valid from `Closed`; `close` is valid from anywhere and is
//! idempotent.
//!
//! # Position
//! The position is never cached: every `tell` asks the backing handle, so it
//! cannot drift from what the OS (or the buffer in front of it) holds.
//!
//! # Buffering
//! With `enable_buffer` set, reads go through a `BufReader` and writes
//! through a [`WriteBuffer`], both `buffer_size` bytes large.  Buffering never
//! changes observable positions.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::buffer::WriteBuffer;
use crate::codec::PluginType;
use crate::error::{PluginError, Result};
use crate::logging::Logger;
use crate::settings::BufferSettings;

// ── Direction / SeekMode ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    /// Resolve an ABI open mode.  Exactly one of READER / WRITER must be set;
    /// FILTER and combinations are ambiguous for a session.
    pub fn from_mode(mode: u32) -> Result<Self> {
        match PluginType(mode) {
            PluginType::READER => Ok(Direction::Read),
            PluginType::WRITER => Ok(Direction::Write),
            _                  => Err(PluginError::AmbiguousDirection(mode)),
        }
    }

    pub fn plugin_type(self) -> PluginType {
        match self {
            Direction::Read  => PluginType::READER,
            Direction::Write => PluginType::WRITER,
        }
    }

    fn missing_handle(self) -> PluginError {
        match self {
            Direction::Read  => PluginError::NoInput,
            Direction::Write => PluginError::NoOutput,
        }
    }
}

/// Seek addressing mode.  Discriminants are the ABI encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SeekMode {
    Begin    = 1,
    End      = 2,
    Forward  = 3,
    Backward = 4,
}

impl SeekMode {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(SeekMode::Begin),
            2 => Some(SeekMode::End),
            3 => Some(SeekMode::Forward),
            4 => Some(SeekMode::Backward),
            _ => None,
        }
    }
}

// ── Backing handles ───────────────────────────────────────────────────────────

pub(crate) enum Input {
    Direct(File),
    Buffered(BufReader<File>),
}

impl Read for Input {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Input::Direct(f)   => f.read(buf),
            Input::Buffered(b) => b.read(buf),
        }
    }
}

impl Seek for Input {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Input::Direct(f)   => f.seek(pos),
            Input::Buffered(b) => b.seek(pos),
        }
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        match self {
            Input::Direct(f)   => f.stream_position(),
            Input::Buffered(b) => b.stream_position(),
        }
    }
}

enum Output {
    Direct(File),
    Buffered(WriteBuffer<File>),
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Direct(f)   => f.write(buf),
            Output::Buffered(b) => b.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Direct(f)   => f.flush(),
            Output::Buffered(b) => b.flush(),
        }
    }
}

impl Seek for Output {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Output::Direct(f)   => f.seek(pos),
            Output::Buffered(b) => b.seek(pos),
        }
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        match self {
            Output::Direct(f)   => f.stream_position(),
            Output::Buffered(b) => b.stream_position(),
        }
    }
}

struct Reading {
    input: Input,
    /// Size of the image as stored.  ISO is verbatim, so this is also the
    /// logical (decoded) size.
    size:  u64,
}

enum State {
    Closed,
    Reading(Reading),
    Writing(Output),
}

// ── DiskSession ───────────────────────────────────────────────────────────────

pub struct DiskSession {
    state:  State,
    /// Direction of the current or most recent session; picks which
    /// "no file opened" error a closed session reports.
    last:   Direction,
    logger: Logger,
}

impl Default for DiskSession {
    fn default() -> Self {
        Self::new(Logger::disabled())
    }
}

impl DiskSession {
    pub fn new(logger: Logger) -> Self {
        Self { state: State::Closed, last: Direction::Read, logger }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, State::Closed)
    }

    pub fn direction(&self) -> Option<Direction> {
        match self.state {
            State::Closed     => None,
            State::Reading(_) => Some(Direction::Read),
            State::Writing(_) => Some(Direction::Write),
        }
    }

    /// The error a handle-requiring call reports right now.
    pub fn missing_handle(&self) -> PluginError {
        self.last.missing_handle()
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Open `path` in `direction`.  Read sessions learn the file size up
    /// front and start at offset 0; write sessions create or truncate.
    pub fn open(&mut self, path: &Path, direction: Direction, settings: &BufferSettings) -> Result<()> {
        if self.is_open() {
            return Err(PluginError::AlreadyOpen);
        }
        self.last = direction;

        match direction {
            Direction::Read => {
                self.logger.debug(format_args!("ISO: opening the input file: {}", path.display()));
                let mut file = File::open(path)
                    .map_err(|e| PluginError::io("There was an error opening the file", e))?;
                let size = file
                    .seek(SeekFrom::End(0))
                    .map_err(|e| PluginError::io("There was an error getting the file size", e))?;
                file.seek(SeekFrom::Start(0))
                    .map_err(|e| PluginError::io("There was an error seeking into the input file", e))?;

                let input = if settings.enable_buffer {
                    Input::Buffered(BufReader::with_capacity(settings.buffer_size, file))
                } else {
                    Input::Direct(file)
                };
                self.state = State::Reading(Reading { input, size });
                self.logger.debug(format_args!("ISO: input file opened, {size} bytes"));
            }
            Direction::Write => {
                self.logger.debug(format_args!("ISO: opening the output file: {}", path.display()));
                let file = File::create(path)
                    .map_err(|e| PluginError::io("There was an error opening the file", e))?;
                let output = if settings.enable_buffer {
                    Output::Buffered(WriteBuffer::new(file, settings.buffer_size))
                } else {
                    Output::Direct(file)
                };
                self.state = State::Writing(output);
                self.logger.debug(format_args!("ISO: output file opened"));
            }
        }
        Ok(())
    }

    /// Release the handle.  A write session is flushed first; the handle is
    /// released even when the flush fails.
    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Closed => Ok(()),
            State::Reading(_) => {
                self.logger.debug(format_args!("ISO: closing the input file"));
                Ok(())
            }
            State::Writing(mut output) => {
                self.logger.debug(format_args!("ISO: closing the output file"));
                output
                    .flush()
                    .map_err(|e| PluginError::io("There was an error closing the output file", e))
            }
        }
    }

    // ── Positioning ──────────────────────────────────────────────────────────

    fn stream(&mut self) -> Result<&mut dyn Seek> {
        let missing = self.missing_handle();
        match &mut self.state {
            State::Reading(r) => Ok(&mut r.input),
            State::Writing(w) => Ok(w),
            State::Closed     => Err(missing),
        }
    }

    /// Move the position.  Returns the new absolute offset.
    ///
    /// `End` is relative to end-of-file (`seek(0, End)` lands on EOF).
    /// `Backward` past offset 0 fails and leaves the position unchanged.
    pub fn seek(&mut self, position: u64, mode: SeekMode) -> Result<u64> {
        let stream = self.stream()?;
        let current = || PluginError::InvalidAddressing("could not read the current position".into());

        let target = match mode {
            SeekMode::Begin => SeekFrom::Start(position),
            SeekMode::End => SeekFrom::End(i64::try_from(position).map_err(|_| {
                PluginError::InvalidAddressing(format!("offset {position} is too large"))
            })?),
            SeekMode::Forward => {
                let cur = stream.stream_position().map_err(|_| current())?;
                SeekFrom::Start(cur.checked_add(position).ok_or_else(|| {
                    PluginError::InvalidAddressing(format!("forward {position} from {cur} overflows"))
                })?)
            }
            SeekMode::Backward => {
                let cur = stream.stream_position().map_err(|_| current())?;
                SeekFrom::Start(cur.checked_sub(position).ok_or_else(|| {
                    PluginError::InvalidAddressing("Tried to backward below the 0 position.".into())
                })?)
            }
        };

        stream
            .seek(target)
            .map_err(|e| PluginError::io("There was an error seeking into the file", e))
    }

    pub fn tell(&mut self) -> Result<u64> {
        self.stream()?
            .stream_position()
            .map_err(|e| PluginError::io("There was an error getting the current file position", e))
    }

    // ── Data transfer ────────────────────────────────────────────────────────

    pub(crate) fn input(&mut self) -> Result<&mut Input> {
        match &mut self.state {
            State::Reading(r) => Ok(&mut r.input),
            _                 => Err(PluginError::NoInput),
        }
    }

    /// Fill `buf` from the current position.  Returns fewer bytes than asked
    /// only at end-of-file, which is not an error.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let input = self.input()?;
        let mut total = 0;
        while total < buf.len() {
            match input.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(PluginError::io("There was an error reading from the file", e)),
            }
        }
        self.logger.trace(format_args!("ISO: read {total} of {} bytes", buf.len()));
        Ok(total)
    }

    /// Write all of `buf`.  ISO is verbatim, so on success the return value
    /// is always `buf.len()`.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let output = match &mut self.state {
            State::Writing(w) => w,
            _                 => return Err(PluginError::NoOutput),
        };
        output
            .write_all(buf)
            .map_err(|e| PluginError::io("There was an error writing to the file", e))?;
        self.logger.trace(format_args!("ISO: wrote {} bytes", buf.len()));
        Ok(buf.len())
    }

    /// Run `f` and put the position back where it was, even if `f` fails.
    pub fn preserving_position<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.tell()?;
        let out = f(self);
        let restored = self.seek(saved, SeekMode::Begin);
        let out = out?;
        restored?;
        Ok(out)
    }

    /// Read up to `len` bytes from offset 0 without moving the position.
    /// The scratch buffer is reserved fallibly.
    pub fn read_prefix(&mut self, len: usize) -> Result<Vec<u8>> {
        self.preserving_position(|s| {
            let mut data = Vec::new();
            data.try_reserve_exact(len).map_err(|_| PluginError::Allocation(len))?;
            data.resize(len, 0);
            s.seek(0, SeekMode::Begin)?;
            let n = s.read(&mut data)?;
            data.truncate(n);
            Ok(data)
        })
    }

    // ── Sizes ────────────────────────────────────────────────────────────────

    /// Size captured at open for read sessions.
    pub fn disk_size(&self) -> Result<u64> {
        match &self.state {
            State::Reading(r) => Ok(r.size),
            _                 => Err(PluginError::NoInput),
        }
    }

    /// Decoded size; identical to [`disk_size`](Self::disk_size) for ISO.
    pub fn disk_real_size(&self) -> Result<u64> {
        self.disk_size()
    }
}

impl Drop for DiskSession {
    fn drop(&mut self) {
        // Buffered writes must reach the file even if the host never closed.
        if let Err(e) = self.close() {
            self.logger.error(format_args!("ISO: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::NamedTempFile;

    fn image(len: usize) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        f.write_all(&data).unwrap();
        f.flush().unwrap();
        f
    }

    fn reader(f: &NamedTempFile, settings: BufferSettings) -> DiskSession {
        let mut s = DiskSession::default();
        s.open(f.path(), Direction::Read, &settings).unwrap();
        s
    }

    #[test]
    fn direction_from_mode() {
        assert_eq!(Direction::from_mode(1).unwrap(), Direction::Read);
        assert_eq!(Direction::from_mode(2).unwrap(), Direction::Write);
        for bad in [0, 3, 4, 7] {
            assert_eq!(Direction::from_mode(bad).unwrap_err().kind(), ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn open_captures_size_and_rewinds() {
        let f = image(5000);
        let mut s = reader(&f, BufferSettings::default());
        assert_eq!(s.disk_size().unwrap(), 5000);
        assert_eq!(s.disk_real_size().unwrap(), 5000);
        assert_eq!(s.tell().unwrap(), 0);
    }

    #[test]
    fn second_open_is_rejected() {
        let f = image(10);
        let mut s = reader(&f, BufferSettings::default());
        let err = s.open(f.path(), Direction::Read, &BufferSettings::default()).unwrap_err();
        assert!(matches!(err, PluginError::AlreadyOpen));
        assert_eq!(s.direction(), Some(Direction::Read));
    }

    #[test]
    fn closed_session_errors_follow_last_direction() {
        let mut s = DiskSession::default();
        assert!(matches!(s.tell().unwrap_err(), PluginError::NoInput));

        let out = NamedTempFile::new().unwrap();
        s.open(out.path(), Direction::Write, &BufferSettings::default()).unwrap();
        s.close().unwrap();
        assert!(matches!(s.seek(0, SeekMode::Begin).unwrap_err(), PluginError::NoOutput));
    }

    #[test]
    fn buffered_reads_track_position() {
        let f = image(100_000);
        let settings = BufferSettings { enable_buffer: true, buffer_size: 23_520 };
        let mut s = reader(&f, settings);
        let mut buf = [0u8; 10];
        s.seek(300, SeekMode::Begin).unwrap();
        assert_eq!(s.read(&mut buf).unwrap(), 10);
        assert_eq!(buf[0], (300 % 251) as u8);
        assert_eq!(s.tell().unwrap(), 310);
        s.seek(5, SeekMode::Backward).unwrap();
        assert_eq!(s.tell().unwrap(), 305);
    }

    #[test]
    fn read_prefix_keeps_position() {
        let f = image(4096);
        let mut s = reader(&f, BufferSettings::default());
        s.seek(1234, SeekMode::Begin).unwrap();
        let prefix = s.read_prefix(100).unwrap();
        assert_eq!(prefix.len(), 100);
        assert_eq!(prefix[1], 1);
        assert_eq!(s.tell().unwrap(), 1234);

        let all = s.read_prefix(10_000).unwrap();
        assert_eq!(all.len(), 4096);
    }

    #[test]
    fn wrong_direction_transfers_fail() {
        let f = image(16);
        let mut s = reader(&f, BufferSettings::default());
        assert!(matches!(s.write(b"x").unwrap_err(), PluginError::NoOutput));

        let out = NamedTempFile::new().unwrap();
        let mut w = DiskSession::default();
        w.open(out.path(), Direction::Write, &BufferSettings::default()).unwrap();
        let mut buf = [0u8; 4];
        assert!(matches!(w.read(&mut buf).unwrap_err(), PluginError::NoInput));
        assert!(matches!(w.disk_size().unwrap_err(), PluginError::NoInput));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn drop_logs_a_failed_flush() {
        use crate::logging::{Level, LogSink};
        use std::sync::{Arc, Mutex};

        #[derive(Default)]
        struct Capture(Mutex<Vec<(Level, String)>>);

        impl LogSink for Capture {
            fn log(&self, level: Level, message: &str) {
                self.0.lock().unwrap().push((level, message.to_owned()));
            }
        }

        let cap = Arc::new(Capture::default());
        {
            let mut w = DiskSession::new(Logger::new(cap.clone()));
            let settings = BufferSettings { enable_buffer: true, buffer_size: 23_520 };
            // Every write to /dev/full fails with ENOSPC.
            w.open(Path::new("/dev/full"), Direction::Write, &settings).unwrap();
            w.write(b"pending").unwrap();
        }
        let logged = cap.0.lock().unwrap();
        assert!(logged
            .iter()
            .any(|(level, msg)| *level == Level::Error && msg.contains("closing the output file")));
    }

    #[test]
    fn buffered_write_lands_on_close() {
        let out = NamedTempFile::new().unwrap();
        let mut w = DiskSession::default();
        let settings = BufferSettings { enable_buffer: true, buffer_size: 23_520 };
        w.open(out.path(), Direction::Write, &settings).unwrap();
        assert_eq!(w.write(b"hello").unwrap(), 5);
        assert_eq!(w.tell().unwrap(), 5);
        w.close().unwrap();
        assert_eq!(std::fs::read(out.path()).unwrap(), b"hello");
        w.close().unwrap();
    }
}
