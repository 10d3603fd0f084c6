//! ISO 9660 Primary Volume Descriptor lookup.
//!
//! The PVD lives in logical sector 16.  Images come in three layouts:
//!
//! | Layout          | Sector size | Data offset in sector |
//! |-----------------|-------------|-----------------------|
//! | Cooked          | 2048        | 0                     |
//! | Raw Mode 1      | 2352        | 16                    |
//! | Raw Mode 2 / F1 | 2352        | 24                    |
//!
//! All three are probed in that order; the first one that carries a valid
//! descriptor wins.

use std::io::{Cursor, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{PluginError, Result};

pub const COOKED_SECTOR_SIZE: u64 = 2048;
pub const RAW_SECTOR_SIZE:    u64 = 2352;
pub const PVD_SECTOR:         u64 = 16;

const PVD_TYPE:     u8       = 1;
const STANDARD_ID:  &[u8; 5] = b"CD001";
const DESCRIPTOR_LEN: usize  = 2048;

/// (sector size, header bytes before user data)
const LAYOUTS: [(u64, u64); 3] = [
    (COOKED_SECTOR_SIZE, 0),
    (RAW_SECTOR_SIZE, 16),
    (RAW_SECTOR_SIZE, 24),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeDescriptor {
    pub system_id:         String,
    /// Disc title as stored in the volume identifier field.
    pub volume_id:         String,
    pub volume_space_size: u32,
    pub logical_block_size: u16,
    /// Physical sector size of the layout the descriptor was found in.
    pub sector_size:       u64,
}

impl VolumeDescriptor {
    /// Probe every known layout.  `reader` position is left wherever the last
    /// probe ended; callers restore it themselves.
    pub fn locate<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        for (sector_size, header) in LAYOUTS {
            let offset = PVD_SECTOR * sector_size + header;
            reader
                .seek(SeekFrom::Start(offset))
                .map_err(|e| PluginError::io("There was an error seeking to the volume descriptor", e))?;

            let mut sector = Vec::with_capacity(DESCRIPTOR_LEN);
            reader
                .by_ref()
                .take(DESCRIPTOR_LEN as u64)
                .read_to_end(&mut sector)
                .map_err(|e| PluginError::io("There was an error reading the volume descriptor", e))?;

            if let Some(pvd) = Self::parse(&sector, sector_size) {
                return Ok(pvd);
            }
        }
        Err(PluginError::TitleNotFound)
    }

    /// Parse a 2048-byte descriptor.  `None` if it is not a PVD.
    pub fn parse(sector: &[u8], sector_size: u64) -> Option<Self> {
        if sector.len() < DESCRIPTOR_LEN
            || sector[0] != PVD_TYPE
            || &sector[1..6] != STANDARD_ID
            || sector[6] != 1
        {
            return None;
        }

        // Both-endian fields; the little-endian half comes first.
        let mut cur = Cursor::new(&sector[80..84]);
        let volume_space_size = cur.read_u32::<LittleEndian>().ok()?;
        let mut cur = Cursor::new(&sector[128..130]);
        let logical_block_size = cur.read_u16::<LittleEndian>().ok()?;

        Some(Self {
            system_id: trim_field(&sector[8..40]),
            volume_id: trim_field(&sector[40..72]),
            volume_space_size,
            logical_block_size,
            sector_size,
        })
    }
}

fn trim_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(|c: char| c == ' ' || c == '\0')
        .to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn pvd_sector(volume_id: &str) -> Vec<u8> {
        let mut s = vec![0u8; DESCRIPTOR_LEN];
        s[0] = PVD_TYPE;
        s[1..6].copy_from_slice(STANDARD_ID);
        s[6] = 1;
        s[8..40].copy_from_slice(&[b' '; 32]);
        s[8..19].copy_from_slice(b"PLAYSTATION");
        s[40..72].copy_from_slice(&[b' '; 32]);
        s[40..40 + volume_id.len()].copy_from_slice(volume_id.as_bytes());
        s[80..84].copy_from_slice(&1000u32.to_le_bytes());
        s[84..88].copy_from_slice(&1000u32.to_be_bytes());
        s[128..130].copy_from_slice(&2048u16.to_le_bytes());
        s[130..132].copy_from_slice(&2048u16.to_be_bytes());
        s
    }

    #[test]
    fn parses_fields() {
        let pvd = VolumeDescriptor::parse(&pvd_sector("MY_GAME"), 2048).unwrap();
        assert_eq!(pvd.volume_id, "MY_GAME");
        assert_eq!(pvd.system_id, "PLAYSTATION");
        assert_eq!(pvd.volume_space_size, 1000);
        assert_eq!(pvd.logical_block_size, 2048);
    }

    #[test]
    fn rejects_other_descriptor_types() {
        let mut s = pvd_sector("X");
        s[0] = 2;
        assert!(VolumeDescriptor::parse(&s, 2048).is_none());
        assert!(VolumeDescriptor::parse(&s[..100], 2048).is_none());
    }

    #[test]
    fn locates_cooked_layout() {
        let mut img = vec![0u8; (17 * COOKED_SECTOR_SIZE) as usize];
        let at = (PVD_SECTOR * COOKED_SECTOR_SIZE) as usize;
        img[at..at + DESCRIPTOR_LEN].copy_from_slice(&pvd_sector("COOKED"));
        let pvd = VolumeDescriptor::locate(&mut Cursor::new(img)).unwrap();
        assert_eq!(pvd.volume_id, "COOKED");
        assert_eq!(pvd.sector_size, COOKED_SECTOR_SIZE);
    }

    #[test]
    fn locates_raw_mode2_layout() {
        let mut img = vec![0u8; (17 * RAW_SECTOR_SIZE) as usize];
        let at = (PVD_SECTOR * RAW_SECTOR_SIZE + 24) as usize;
        img[at..at + DESCRIPTOR_LEN].copy_from_slice(&pvd_sector("RAWDISC"));
        let pvd = VolumeDescriptor::locate(&mut Cursor::new(img)).unwrap();
        assert_eq!(pvd.volume_id, "RAWDISC");
        assert_eq!(pvd.sector_size, RAW_SECTOR_SIZE);
    }

    #[test]
    fn small_image_has_no_title() {
        let err = VolumeDescriptor::locate(&mut Cursor::new(vec![0u8; 512])).unwrap_err();
        assert!(matches!(err, PluginError::TitleNotFound));
    }
}
