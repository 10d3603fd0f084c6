//! Per-instance status channel: an ok flag plus the last failure message.
//!
//! Successful operations never clear the channel; only [`Status::clear`]
//! does.  `is_ok()` therefore reflects the most recent failure since the last
//! explicit clear, not a history.

use crate::error::{copy_c_string, PluginError};

#[derive(Debug, Clone)]
pub struct Status {
    ok:      bool,
    message: Option<String>,
}

impl Default for Status {
    fn default() -> Self {
        Self { ok: true, message: None }
    }
}

impl Status {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure.  Any previous message is dropped, not accumulated.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
        self.ok = false;
    }

    pub(crate) fn record(&mut self, err: &PluginError) {
        self.set_error(err.to_string());
    }

    pub fn clear(&mut self) {
        self.message = None;
        self.ok = true;
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// The current message, or `""` when nothing failed.
    pub fn error(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }

    /// Copy the message into a fixed-capacity NUL-terminated buffer.
    ///
    /// Returns `false` without touching `dst` (or the status) when the message
    /// and its terminator do not fit.
    pub fn copy_error_into(&self, dst: &mut [u8]) -> bool {
        copy_c_string(self.error().as_bytes(), dst).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_ok_and_empty() {
        let s = Status::new();
        assert!(s.is_ok());
        assert_eq!(s.error(), "");
    }

    #[test]
    fn set_error_overwrites() {
        let mut s = Status::new();
        s.set_error("first");
        s.set_error("second");
        assert!(!s.is_ok());
        assert_eq!(s.error(), "second");
        s.clear();
        assert!(s.is_ok());
        assert_eq!(s.error(), "");
    }

    #[test]
    fn copy_error_is_idempotent() {
        let mut s = Status::new();
        s.set_error("disk full");
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        assert!(s.copy_error_into(&mut a));
        assert!(s.copy_error_into(&mut b));
        assert_eq!(a, b);
        assert_eq!(s.error(), "disk full");
    }

    #[test]
    fn copy_error_one_byte_short_leaves_buffer() {
        let mut s = Status::new();
        s.set_error("disk full");
        let mut buf = [0xAAu8; 9];
        assert!(!s.copy_error_into(&mut buf));
        assert_eq!(buf, [0xAAu8; 9]);
        assert_eq!(s.error(), "disk full");
        assert!(!s.is_ok());
    }
}
