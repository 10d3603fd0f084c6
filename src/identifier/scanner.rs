//! Heuristic identifier scanner.
//!
//! Walks a byte window (normally the first [`SCAN_WINDOW`] bytes of the disc,
//! which covers the volume descriptors and root directory of a CD-ROM
//! layout) looking for one of the [`PREFIXES`].  The first hit wins; no
//! attempt is made to find a better one later.
//!
//! ```text
//! offset: 0 1 2 3 4 5 6 7 8 9 10
//! bytes:  S C E S _ 0 0 9 . 8 7     ->  SCES00987
//! ```
//!
//! Offsets 4 and 8 hold delimiters and are skipped.  A hit so close to the
//! end of the window that offset 10 falls outside it is treated as no match.

use super::{Identifier, IDENTIFIER_LEN};

/// Bytes inspected from the start of the disc (200 KiB).
pub const SCAN_WINDOW: usize = 200 * 1024;

/// Known platform/region product-code prefixes.
pub const PREFIXES: &[&[u8; 4]] = &[
    b"SCUS", b"SLUS", b"SPUS", b"PUPX",
    b"SCES", b"SLES", b"SCED", b"SLED", b"PEPX",
    b"SCPS", b"SLPS", b"SLPM", b"SIPS", b"SCPM", b"ESPM",
    b"PAPX", b"PCPX", b"PCPD", b"PTPX", b"PBPX",
    b"CPCS", b"SCAJ", b"SCZS",
    b"SCKA", b"SLKA",
];

/// Relative offsets that make up the identifier.
const PICK: [usize; IDENTIFIER_LEN] = [0, 1, 2, 3, 5, 6, 7, 9, 10];

/// Span a hit must have inside the buffer: offsets 0..=10.
const SPAN: usize = 11;

/// Scan `bytes` for the first identifier.  Returns `None` when nothing
/// matches; absence is not an error at this level.
pub fn scan(bytes: &[u8]) -> Option<Identifier> {
    let pos = bytes
        .windows(4)
        .position(|w| PREFIXES.iter().any(|p| w == &p[..]))?;

    // Only the first hit counts, even when it is truncated.
    let hit = bytes.get(pos..pos + SPAN)?;
    let mut out = [0u8; IDENTIFIER_LEN];
    for (dst, &rel) in out.iter_mut().zip(PICK.iter()) {
        *dst = hit[rel];
    }
    Some(Identifier::from_bytes(out))
}
