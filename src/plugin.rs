//! Frozen C ABI for the ISO codec plugin.
//!
//! The shared library exports one symbol:
//!
//! ```c
//! const IsoPluginApi *iso_plugin_register(void);
//! ```
//!
//! The returned pointer is **static** — the host never frees it.  Every
//! operation of the capability surface is a function pointer in
//! [`IsoPluginApi`]; per-file state lives behind the opaque handle returned
//! by `instantiate` and released by `destroy`.
//!
//! # Stability contract
//! - `ISO_PLUGIN_ABI_VERSION` is monotonically increasing and never
//!   decremented.
//! - New fields are appended at the end of `IsoPluginApi` only.
//! - Existing field offsets and calling conventions are frozen.
//!
//! # Threading
//! One handle must only be used by one thread at a time; the host serialises
//! calls or instantiates one handle per file.  Different handles share no
//! state.
//!
//! # Failure model
//! Nothing unwinds across the boundary.  Every function returns a sentinel
//! (`false` / `0`) on failure and, when it has a handle, records the reason
//! in the handle's status (`is_ok` / `get_error`).  A panic inside the core
//! is caught and reported as the same sentinel.
//!
//! # Text buffers
//! Functions that hand text to the host take `(buf, capacity)`.  The text
//! plus a NUL terminator must fit; otherwise the call fails and `buf` is left
//! untouched.  On success the whole buffer is zero-filled before the copy.

use std::ffi::{c_char, c_void, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::ptr::NonNull;

use crate::codec::{DiskImageCodec, IsoCodec, PluginType};
use crate::error::{copy_c_string, PluginError};
use crate::logging::Logger;
use crate::session::{Direction, SeekMode};
use crate::settings;

/// ABI version of this header.  Written into `IsoPluginApi::abi_version`.
pub const ISO_PLUGIN_ABI_VERSION: u32 = 1;

/// Opaque per-instance handle.
pub type Handle = *mut c_void;

/// Function table for the ISO codec.
///
/// # Layout
/// `#[repr(C)]` is mandatory.  Do not reorder fields.  New fields go at the
/// end only.
#[repr(C)]
pub struct IsoPluginApi {
    /// Must equal `ISO_PLUGIN_ABI_VERSION`.  Hosts reject tables with a
    /// higher version than they were built against.
    pub abi_version: u32,

    // Static descriptors — callable without a handle.
    pub plugin_type:           unsafe extern "C" fn() -> u32,
    pub name:                  unsafe extern "C" fn(buf: *mut c_char, cap: u64) -> bool,
    pub version:               unsafe extern "C" fn(buf: *mut c_char, cap: u64) -> bool,
    /// Extensions joined with `|`, e.g. `"iso"`.
    pub compatible_extensions: unsafe extern "C" fn(buf: *mut c_char, cap: u64) -> bool,
    /// On entry `*size` is the capacity of `buf`; on return it holds the
    /// bytes the schema needs including the terminator, success or not.
    pub settings_schema:       unsafe extern "C" fn(buf: *mut c_char, size: *mut u64, mode: u32) -> bool,

    // Lifecycle.
    pub instantiate: unsafe extern "C" fn() -> Handle,
    pub destroy:     unsafe extern "C" fn(h: Handle),

    // Common.
    pub open:         unsafe extern "C" fn(h: Handle, path: *const c_char, mode: u32, threads: i32) -> bool,
    pub close:        unsafe extern "C" fn(h: Handle) -> bool,
    pub is_ok:        unsafe extern "C" fn(h: Handle) -> bool,
    pub get_error:    unsafe extern "C" fn(h: Handle, buf: *mut c_char, cap: u64) -> bool,
    pub clear_error:  unsafe extern "C" fn(h: Handle),
    /// `data[0..size]` is a JSON object; it need not be NUL-terminated.
    pub set_settings: unsafe extern "C" fn(h: Handle, data: *const c_char, size: u64, mode: u32) -> bool,

    // Positioning.
    pub seek:              unsafe extern "C" fn(h: Handle, position: u64, mode: u32) -> bool,
    pub seek_current_disk: unsafe extern "C" fn(h: Handle, position: u64, mode: u32) -> bool,
    pub tell:              unsafe extern "C" fn(h: Handle) -> u64,
    pub tell_current_disk: unsafe extern "C" fn(h: Handle) -> u64,
    pub disk_size:         unsafe extern "C" fn(h: Handle) -> u64,
    pub disk_real_size:    unsafe extern "C" fn(h: Handle) -> u64,

    // Reader.
    pub read:                unsafe extern "C" fn(h: Handle, out: *mut u8, len: u64) -> u64,
    pub get_identifier:      unsafe extern "C" fn(h: Handle, buf: *mut c_char, cap: u64) -> bool,
    pub get_disk_identifier: unsafe extern "C" fn(h: Handle, buf: *mut c_char, cap: u64) -> bool,
    pub get_title:           unsafe extern "C" fn(h: Handle, buf: *mut c_char, cap: u64) -> bool,
    pub total_disks:         unsafe extern "C" fn(h: Handle) -> u32,
    pub current_disk:        unsafe extern "C" fn(h: Handle) -> u32,
    pub change_disk:         unsafe extern "C" fn(h: Handle, disk: u32) -> bool,

    // Writer.
    pub write:          unsafe extern "C" fn(h: Handle, input: *const u8, len: u64) -> u64,
    pub set_identifier: unsafe extern "C" fn(h: Handle, id: *const c_char) -> bool,
    pub add_disk:       unsafe extern "C" fn(h: Handle) -> bool,
    pub close_disk:     unsafe extern "C" fn(h: Handle) -> bool,
}

static ISO_PLUGIN_API: IsoPluginApi = IsoPluginApi {
    abi_version:           ISO_PLUGIN_ABI_VERSION,
    plugin_type:           ffi::plugin_type,
    name:                  ffi::name,
    version:               ffi::version,
    compatible_extensions: ffi::compatible_extensions,
    settings_schema:       ffi::settings_schema,
    instantiate:           ffi::instantiate,
    destroy:               ffi::destroy,
    open:                  ffi::open,
    close:                 ffi::close,
    is_ok:                 ffi::is_ok,
    get_error:             ffi::get_error,
    clear_error:           ffi::clear_error,
    set_settings:          ffi::set_settings,
    seek:                  ffi::seek,
    seek_current_disk:     ffi::seek_current_disk,
    tell:                  ffi::tell,
    tell_current_disk:     ffi::tell_current_disk,
    disk_size:             ffi::disk_size,
    disk_real_size:        ffi::disk_real_size,
    read:                  ffi::read,
    get_identifier:        ffi::get_identifier,
    get_disk_identifier:   ffi::get_disk_identifier,
    get_title:             ffi::get_title,
    total_disks:           ffi::total_disks,
    current_disk:          ffi::current_disk,
    change_disk:           ffi::change_disk,
    write:                 ffi::write,
    set_identifier:        ffi::set_identifier,
    add_disk:              ffi::add_disk,
    close_disk:            ffi::close_disk,
};

/// The single exported symbol.
#[no_mangle]
pub extern "C" fn iso_plugin_register() -> *const IsoPluginApi {
    &ISO_PLUGIN_API
}

/// Safe Rust access to the same table, for in-process hosts and tests.
pub fn api() -> &'static IsoPluginApi {
    &ISO_PLUGIN_API
}

// ── Boundary functions ────────────────────────────────────────────────────────

mod ffi {
    use super::*;

    /// Run `f`, turning a panic into `fallback`.
    fn guard<T>(fallback: T, f: impl FnOnce() -> T) -> T {
        catch_unwind(AssertUnwindSafe(f)).unwrap_or(fallback)
    }

    /// # Safety
    /// `h` is null or a live pointer from `instantiate` not yet destroyed.
    unsafe fn codec<'a>(h: Handle) -> Option<&'a mut IsoCodec> {
        (h as *mut IsoCodec).as_mut()
    }

    /// # Safety
    /// `buf` is null or valid for `cap` writable bytes.
    unsafe fn out_buf<'a>(buf: *mut c_char, cap: u64) -> Option<&'a mut [u8]> {
        if buf.is_null() {
            return None;
        }
        let cap = usize::try_from(cap).ok()?;
        Some(std::slice::from_raw_parts_mut(buf as *mut u8, cap))
    }

    unsafe fn write_text(text: &str, buf: *mut c_char, cap: u64) -> bool {
        match out_buf(buf, cap) {
            Some(dst) => copy_c_string(text.as_bytes(), dst).is_ok(),
            None      => false,
        }
    }

    /// Resolve `h`, or return `fallback` for a null handle.
    unsafe fn with_codec<T>(h: Handle, fallback: T, f: impl FnOnce(&mut IsoCodec) -> T) -> T {
        match codec(h) {
            Some(c) => guard(fallback, || f(c)),
            None    => fallback,
        }
    }

    // Static descriptors

    pub(super) unsafe extern "C" fn plugin_type() -> u32 {
        IsoCodec::descriptor().flags.bits()
    }

    pub(super) unsafe extern "C" fn name(buf: *mut c_char, cap: u64) -> bool {
        write_text(IsoCodec::descriptor().name, buf, cap)
    }

    pub(super) unsafe extern "C" fn version(buf: *mut c_char, cap: u64) -> bool {
        write_text(IsoCodec::descriptor().version, buf, cap)
    }

    pub(super) unsafe extern "C" fn compatible_extensions(buf: *mut c_char, cap: u64) -> bool {
        write_text(&IsoCodec::descriptor().extensions_joined(), buf, cap)
    }

    pub(super) unsafe extern "C" fn settings_schema(buf: *mut c_char, size: *mut u64, mode: u32) -> bool {
        let Some(size) = size.as_mut() else { return false };
        let Ok(direction) = Direction::from_mode(mode) else { return false };
        let text = settings::schema_json(direction);
        let cap = *size;
        *size = text.len() as u64 + 1;
        write_text(&text, buf, cap)
    }

    // Lifecycle

    pub(super) unsafe extern "C" fn instantiate() -> Handle {
        guard(std::ptr::null_mut(), || {
            Box::into_raw(Box::new(IsoCodec::with_logger(Logger::facade()))) as Handle
        })
    }

    pub(super) unsafe extern "C" fn destroy(h: Handle) {
        if !h.is_null() {
            // Dropping the codec closes (and flushes) any open session.
            guard((), || drop(Box::from_raw(h as *mut IsoCodec)));
        }
    }

    // Common

    pub(super) unsafe extern "C" fn open(h: Handle, path: *const c_char, mode: u32, threads: i32) -> bool {
        with_codec(h, false, |c| {
            let path = match path.as_ref().map(|p| CStr::from_ptr(p).to_str()) {
                Some(Ok(p)) => p,
                Some(Err(_)) => {
                    c.report_error(PluginError::InvalidPath);
                    return false;
                }
                None => {
                    c.report_error(PluginError::NullPointer("path"));
                    return false;
                }
            };
            c.open(Path::new(path), PluginType(mode), threads)
        })
    }

    pub(super) unsafe extern "C" fn close(h: Handle) -> bool {
        with_codec(h, false, |c| c.close())
    }

    pub(super) unsafe extern "C" fn is_ok(h: Handle) -> bool {
        with_codec(h, false, |c| c.is_ok())
    }

    pub(super) unsafe extern "C" fn get_error(h: Handle, buf: *mut c_char, cap: u64) -> bool {
        with_codec(h, false, |c| match out_buf(buf, cap) {
            Some(dst) => c.copy_error_into(dst),
            None      => false,
        })
    }

    pub(super) unsafe extern "C" fn clear_error(h: Handle) {
        with_codec(h, (), |c| c.clear_error())
    }

    pub(super) unsafe extern "C" fn set_settings(h: Handle, data: *const c_char, size: u64, mode: u32) -> bool {
        with_codec(h, false, |c| {
            if let Err(e) = Direction::from_mode(mode) {
                c.report_error(e);
                return false;
            }
            let Some(len) = usize::try_from(size).ok().filter(|_| !data.is_null()) else {
                c.report_error(PluginError::NullPointer("settings data"));
                return false;
            };
            let bytes = std::slice::from_raw_parts(data as *const u8, len);
            // Hosts may pass the terminator in `size`.
            let bytes = bytes.strip_suffix(&[0]).unwrap_or(bytes);
            match std::str::from_utf8(bytes) {
                Ok(text) => c.apply_settings(text),
                Err(e)   => {
                    c.report_error(PluginError::InvalidSettings(e.to_string()));
                    false
                }
            }
        })
    }

    // Positioning

    fn seek_mode(c: &mut IsoCodec, mode: u32) -> Option<SeekMode> {
        let m = SeekMode::from_raw(mode);
        if m.is_none() {
            c.report_error(PluginError::InvalidAddressing(format!("unknown seek mode {mode}")));
        }
        m
    }

    pub(super) unsafe extern "C" fn seek(h: Handle, position: u64, mode: u32) -> bool {
        with_codec(h, false, |c| match seek_mode(c, mode) {
            Some(m) => c.seek(position, m),
            None    => false,
        })
    }

    pub(super) unsafe extern "C" fn seek_current_disk(h: Handle, position: u64, mode: u32) -> bool {
        with_codec(h, false, |c| match seek_mode(c, mode) {
            Some(m) => c.seek_current_disk(position, m),
            None    => false,
        })
    }

    pub(super) unsafe extern "C" fn tell(h: Handle) -> u64 {
        with_codec(h, 0, |c| c.tell())
    }

    pub(super) unsafe extern "C" fn tell_current_disk(h: Handle) -> u64 {
        with_codec(h, 0, |c| c.tell_current_disk())
    }

    pub(super) unsafe extern "C" fn disk_size(h: Handle) -> u64 {
        with_codec(h, 0, |c| c.disk_size())
    }

    pub(super) unsafe extern "C" fn disk_real_size(h: Handle) -> u64 {
        with_codec(h, 0, |c| c.disk_real_size())
    }

    // Reader

    pub(super) unsafe extern "C" fn read(h: Handle, out: *mut u8, len: u64) -> u64 {
        with_codec(h, 0, |c| {
            let Some(len) = usize::try_from(len).ok().filter(|&l| l == 0 || !out.is_null()) else {
                c.report_error(PluginError::NullPointer("read buffer"));
                return 0;
            };
            if len == 0 {
                return c.read(&mut []);
            }
            c.read(std::slice::from_raw_parts_mut(out, len))
        })
    }

    pub(super) unsafe extern "C" fn get_identifier(h: Handle, buf: *mut c_char, cap: u64) -> bool {
        with_codec(h, false, |c| match out_buf(buf, cap) {
            Some(dst) => c.copy_identifier_into(dst),
            None      => {
                c.report_error(PluginError::NullPointer("identifier buffer"));
                false
            }
        })
    }

    pub(super) unsafe extern "C" fn get_disk_identifier(h: Handle, buf: *mut c_char, cap: u64) -> bool {
        get_identifier(h, buf, cap)
    }

    pub(super) unsafe extern "C" fn get_title(h: Handle, buf: *mut c_char, cap: u64) -> bool {
        with_codec(h, false, |c| match out_buf(buf, cap) {
            Some(dst) => c.copy_title_into(dst),
            None      => {
                c.report_error(PluginError::NullPointer("title buffer"));
                false
            }
        })
    }

    pub(super) unsafe extern "C" fn total_disks(h: Handle) -> u32 {
        with_codec(h, 0, |c| c.total_disks())
    }

    pub(super) unsafe extern "C" fn current_disk(h: Handle) -> u32 {
        with_codec(h, 0, |c| c.current_disk())
    }

    pub(super) unsafe extern "C" fn change_disk(h: Handle, disk: u32) -> bool {
        with_codec(h, false, |c| c.change_disk(disk))
    }

    // Writer

    pub(super) unsafe extern "C" fn write(h: Handle, input: *const u8, len: u64) -> u64 {
        with_codec(h, 0, |c| {
            let Some(len) = usize::try_from(len).ok().filter(|&l| l == 0 || !input.is_null()) else {
                c.report_error(PluginError::NullPointer("write buffer"));
                return 0;
            };
            if len == 0 {
                return c.write(&[]);
            }
            c.write(std::slice::from_raw_parts(input, len))
        })
    }

    pub(super) unsafe extern "C" fn set_identifier(h: Handle, id: *const c_char) -> bool {
        with_codec(h, false, |c| match id.as_ref().map(|p| CStr::from_ptr(p).to_string_lossy()) {
            Some(id) => c.set_identifier(&id),
            None     => {
                c.report_error(PluginError::NullPointer("identifier"));
                false
            }
        })
    }

    pub(super) unsafe extern "C" fn add_disk(h: Handle) -> bool {
        with_codec(h, false, |c| c.add_disk())
    }

    pub(super) unsafe extern "C" fn close_disk(h: Handle) -> bool {
        with_codec(h, false, |c| c.close_disk())
    }
}

// ── Host-side wrapper ─────────────────────────────────────────────────────────

/// Safe Rust wrapper around an [`IsoPluginApi`] table and one instance.
///
/// This is what a host does after resolving `iso_plugin_register`: validate
/// the ABI version, instantiate, and drive the instance through the table.
/// The instance is destroyed on drop.
pub struct LoadedPlugin {
    api:    &'static IsoPluginApi,
    handle: NonNull<c_void>,
}

impl LoadedPlugin {
    /// Validate the table and create one instance.
    ///
    /// # Errors
    /// Returns an error string if `abi_version` exceeds
    /// `ISO_PLUGIN_ABI_VERSION` or the plugin fails to instantiate.
    pub fn new(api: &'static IsoPluginApi) -> Result<Self, String> {
        if api.abi_version > ISO_PLUGIN_ABI_VERSION {
            return Err(format!(
                "Plugin ABI version {} is newer than host ABI version {}",
                api.abi_version, ISO_PLUGIN_ABI_VERSION,
            ));
        }
        let handle = unsafe { (api.instantiate)() };
        let handle = NonNull::new(handle).ok_or("Plugin failed to instantiate")?;
        Ok(Self { api, handle })
    }

    fn h(&self) -> Handle {
        self.handle.as_ptr()
    }

    fn text(f: impl FnOnce(*mut c_char, u64) -> bool, cap: usize) -> Option<String> {
        let mut buf = vec![0u8; cap];
        if !f(buf.as_mut_ptr() as *mut c_char, cap as u64) {
            return None;
        }
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        buf.truncate(end);
        Some(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn plugin_type(&self) -> PluginType {
        PluginType(unsafe { (self.api.plugin_type)() })
    }

    pub fn name(&self) -> Option<String> {
        Self::text(|b, c| unsafe { (self.api.name)(b, c) }, 256)
    }

    pub fn version(&self) -> Option<String> {
        Self::text(|b, c| unsafe { (self.api.version)(b, c) }, 64)
    }

    pub fn compatible_extensions(&self) -> Option<String> {
        Self::text(|b, c| unsafe { (self.api.compatible_extensions)(b, c) }, 256)
    }

    /// Fetch the schema, growing the buffer once if the first guess is short.
    pub fn settings_schema(&self, direction: Direction) -> Option<String> {
        let mode = direction.plugin_type().bits();
        let mut size = 64u64;
        let mut buf = vec![0u8; size as usize];
        let ok = unsafe { (self.api.settings_schema)(buf.as_mut_ptr() as *mut c_char, &mut size, mode) };
        if !ok {
            buf = vec![0u8; usize::try_from(size).ok()?];
            let ok = unsafe { (self.api.settings_schema)(buf.as_mut_ptr() as *mut c_char, &mut size, mode) };
            if !ok {
                return None;
            }
        }
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        buf.truncate(end);
        String::from_utf8(buf).ok()
    }

    pub fn open(&mut self, path: &Path, mode: PluginType, threads: i32) -> bool {
        let Some(path) = path.to_str().and_then(|p| CString::new(p).ok()) else {
            return false;
        };
        unsafe { (self.api.open)(self.h(), path.as_ptr(), mode.bits(), threads) }
    }

    pub fn close(&mut self) -> bool {
        unsafe { (self.api.close)(self.h()) }
    }

    pub fn is_ok(&self) -> bool {
        unsafe { (self.api.is_ok)(self.h()) }
    }

    /// Raw error query into a caller buffer.
    pub fn error_into(&self, buf: &mut [u8]) -> bool {
        unsafe { (self.api.get_error)(self.h(), buf.as_mut_ptr() as *mut c_char, buf.len() as u64) }
    }

    pub fn error(&self) -> String {
        Self::text(|b, c| unsafe { (self.api.get_error)(self.h(), b, c) }, 1024).unwrap_or_default()
    }

    pub fn clear_error(&mut self) {
        unsafe { (self.api.clear_error)(self.h()) }
    }

    pub fn set_settings(&mut self, json: &str, direction: Direction) -> bool {
        let mode = direction.plugin_type().bits();
        unsafe { (self.api.set_settings)(self.h(), json.as_ptr() as *const c_char, json.len() as u64, mode) }
    }

    pub fn seek(&mut self, position: u64, mode: SeekMode) -> bool {
        unsafe { (self.api.seek)(self.h(), position, mode as u32) }
    }

    pub fn seek_current_disk(&mut self, position: u64, mode: SeekMode) -> bool {
        unsafe { (self.api.seek_current_disk)(self.h(), position, mode as u32) }
    }

    pub fn tell(&mut self) -> u64 {
        unsafe { (self.api.tell)(self.h()) }
    }

    pub fn tell_current_disk(&mut self) -> u64 {
        unsafe { (self.api.tell_current_disk)(self.h()) }
    }

    pub fn disk_size(&mut self) -> u64 {
        unsafe { (self.api.disk_size)(self.h()) }
    }

    pub fn disk_real_size(&mut self) -> u64 {
        unsafe { (self.api.disk_real_size)(self.h()) }
    }

    pub fn read(&mut self, buf: &mut [u8]) -> u64 {
        unsafe { (self.api.read)(self.h(), buf.as_mut_ptr(), buf.len() as u64) }
    }

    pub fn write(&mut self, buf: &[u8]) -> u64 {
        unsafe { (self.api.write)(self.h(), buf.as_ptr(), buf.len() as u64) }
    }

    /// Raw identifier query into a caller buffer.
    pub fn identifier_into(&mut self, buf: &mut [u8]) -> bool {
        unsafe { (self.api.get_identifier)(self.h(), buf.as_mut_ptr() as *mut c_char, buf.len() as u64) }
    }

    pub fn identifier(&mut self) -> Option<String> {
        let h = self.h();
        Self::text(|b, c| unsafe { (self.api.get_identifier)(h, b, c) }, 16)
    }

    pub fn disk_identifier(&mut self) -> Option<String> {
        let h = self.h();
        Self::text(|b, c| unsafe { (self.api.get_disk_identifier)(h, b, c) }, 16)
    }

    pub fn title(&mut self) -> Option<String> {
        let h = self.h();
        Self::text(|b, c| unsafe { (self.api.get_title)(h, b, c) }, 64)
    }

    pub fn total_disks(&mut self) -> u32 {
        unsafe { (self.api.total_disks)(self.h()) }
    }

    pub fn current_disk(&mut self) -> u32 {
        unsafe { (self.api.current_disk)(self.h()) }
    }

    pub fn change_disk(&mut self, disk: u32) -> bool {
        unsafe { (self.api.change_disk)(self.h(), disk) }
    }

    pub fn set_identifier(&mut self, id: &str) -> bool {
        let Ok(id) = CString::new(id) else { return false };
        unsafe { (self.api.set_identifier)(self.h(), id.as_ptr()) }
    }

    pub fn add_disk(&mut self) -> bool {
        unsafe { (self.api.add_disk)(self.h()) }
    }

    pub fn close_disk(&mut self) -> bool {
        unsafe { (self.api.close_disk)(self.h()) }
    }
}

impl Drop for LoadedPlugin {
    fn drop(&mut self) {
        unsafe { (self.api.destroy)(self.h()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_returns_static_table() {
        let p = iso_plugin_register();
        assert!(!p.is_null());
        assert_eq!(p, api() as *const IsoPluginApi);
        assert_eq!(api().abi_version, ISO_PLUGIN_ABI_VERSION);
    }

    #[test]
    fn descriptors_without_instance() {
        let api = api();
        assert_eq!(unsafe { (api.plugin_type)() }, 3);

        let mut buf = [0xEEu8; 16];
        assert!(unsafe { (api.name)(buf.as_mut_ptr() as *mut c_char, 16) });
        assert_eq!(&buf[..10], b"ISO Image\0");
        assert!(buf[10..].iter().all(|&b| b == 0));

        let mut tiny = [0xEEu8; 9];
        assert!(!unsafe { (api.name)(tiny.as_mut_ptr() as *mut c_char, 9) });
        assert_eq!(tiny, [0xEEu8; 9]);
    }

    #[test]
    fn null_handles_are_rejected() {
        let api = api();
        unsafe {
            assert!(!(api.is_ok)(std::ptr::null_mut()));
            assert!(!(api.close)(std::ptr::null_mut()));
            assert_eq!((api.tell)(std::ptr::null_mut()), 0);
            (api.clear_error)(std::ptr::null_mut());
            (api.destroy)(std::ptr::null_mut());
        }
    }

    #[test]
    fn schema_size_is_reported() {
        let api = api();
        let mut size = 4u64;
        let mut buf = [0u8; 4];
        assert!(!unsafe { (api.settings_schema)(buf.as_mut_ptr() as *mut c_char, &mut size, 1) });
        assert!(size > 4);
        assert_eq!(buf, [0u8; 4]);
    }

    #[test]
    fn zero_length_read_still_needs_a_reader() {
        let p = LoadedPlugin::new(api()).unwrap();
        assert_eq!(unsafe { (api().read)(p.h(), std::ptr::null_mut(), 0) }, 0);
        assert!(!p.is_ok());
        assert_eq!(p.error(), "There is no input file opened");
    }

    #[test]
    fn bad_seek_mode_sets_status() {
        let mut p = LoadedPlugin::new(api()).unwrap();
        assert!(!unsafe { (api().seek)(p.h(), 0, 9) });
        assert!(!p.is_ok());
        assert!(p.error().contains("unknown seek mode 9"));
        p.clear_error();
        assert!(p.is_ok());
    }
}
