//! ICO container writer
//!
//! Layout (little-endian throughout):
//!
//! ```text
//! ICONDIR        reserved=0 (u16) | type=1 (u16) | count (u16)
//! ICONDIRENTRY   width (u8) | height (u8) | colors=0 (u8) | reserved=0 (u8)
//!   x count      planes=1 (u16) | bpp=32 (u16) | length (u32) | offset (u32)
//! payloads       PNG streams, back to back, in directory order
//! ```
//!
//! A width or height byte of zero means 256. Offsets are absolute and are
//! computed as a running sum starting right after the directory, so the
//! output is correct by construction and never re-read.

use crate::utils::error::{IcoError, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

/// Byte length of the ICONDIR header.
pub const HEADER_LEN: usize = 6;
/// Byte length of one ICONDIRENTRY.
pub const DIR_ENTRY_LEN: usize = 16;

const RESOURCE_TYPE_ICON: u16 = 1;
const COLOR_PLANES: u16 = 1;
const BITS_PER_PIXEL: u16 = 32;

// Size limits for images in an ICO file:
const MIN_SIZE: u32 = 1;
const MAX_SIZE: u32 = 256;

/// One square PNG-compressed image destined for the container.
#[derive(Clone, Debug)]
pub struct IconEntry<'a> {
    size: u32,
    png: &'a [u8],
}

impl<'a> IconEntry<'a> {
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn data(&self) -> &'a [u8] {
        self.png
    }

    /// Width/height byte as stored in the directory (256 encodes as 0).
    pub fn dimension_byte(&self) -> u8 {
        if self.size >= MAX_SIZE {
            0
        } else {
            self.size as u8
        }
    }
}

/// A collection of PNG images to be written as one ICO file.
#[derive(Clone, Debug, Default)]
pub struct IconDirectory<'a> {
    entries: Vec<IconEntry<'a>>,
}

impl<'a> IconDirectory<'a> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a `size` x `size` PNG payload. Entries keep insertion order.
    pub fn add_png(&mut self, size: u32, png: &'a [u8]) -> Result<()> {
        if !(MIN_SIZE..=MAX_SIZE).contains(&size) {
            return Err(IcoError::Encoding(format!(
                "Invalid icon size (was {}, but must be between {} and {})",
                size, MIN_SIZE, MAX_SIZE
            )));
        }
        if png.is_empty() {
            return Err(IcoError::Encoding(format!(
                "Empty PNG payload for {}x{} entry",
                size, size
            )));
        }
        self.entries.push(IconEntry { size, png });
        Ok(())
    }

    pub fn entries(&self) -> &[IconEntry<'a>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total byte length of the encoded container.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN
            + DIR_ENTRY_LEN * self.entries.len()
            + self.entries.iter().map(|e| e.png.len()).sum::<usize>()
    }

    /// Writes the ICO file to the given writer.
    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        if self.entries.len() > (u16::MAX as usize) {
            return Err(IcoError::Encoding(format!(
                "Too many entries in icon directory (was {}, but max is {})",
                self.entries.len(),
                u16::MAX
            )));
        }
        if self.encoded_len() > (u32::MAX as usize) {
            return Err(IcoError::Encoding(format!(
                "Icon payloads too large for 32-bit offsets ({} bytes)",
                self.encoded_len()
            )));
        }
        writer.write_u16::<LittleEndian>(0)?; // reserved
        writer.write_u16::<LittleEndian>(RESOURCE_TYPE_ICON)?;
        writer.write_u16::<LittleEndian>(self.entries.len() as u16)?;
        let mut data_offset = (HEADER_LEN + DIR_ENTRY_LEN * self.entries.len()) as u32;
        for entry in self.entries.iter() {
            writer.write_u8(entry.dimension_byte())?;
            writer.write_u8(entry.dimension_byte())?;
            writer.write_u8(0)?; // palette colors
            writer.write_u8(0)?; // reserved
            writer.write_u16::<LittleEndian>(COLOR_PLANES)?;
            writer.write_u16::<LittleEndian>(BITS_PER_PIXEL)?;
            let data_size = entry.png.len() as u32;
            writer.write_u32::<LittleEndian>(data_size)?;
            writer.write_u32::<LittleEndian>(data_offset)?;
            data_offset += data_size;
        }
        for entry in self.entries.iter() {
            writer.write_all(entry.png)?;
        }
        Ok(())
    }

    /// Encodes the container into a freshly allocated buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(self.encoded_len());
        self.write(&mut buffer)?;
        Ok(buffer)
    }
}

/// Assemble `(size, png)` pairs into an ICO byte stream, in the given order.
pub fn encode_ico(entries: &[(u32, &[u8])]) -> Result<Vec<u8>> {
    let mut directory = IconDirectory::new();
    for &(size, png) in entries {
        directory.add_png(size, png)?;
    }
    let bytes = directory.to_bytes()?;
    tracing::debug!(
        "Encoded ICO with {} entries ({} bytes)",
        directory.len(),
        bytes.len()
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(bytes: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([bytes[at], bytes[at + 1]])
    }

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    #[test]
    fn test_header_layout() {
        let a = [1u8, 2, 3];
        let b = [9u8; 5];
        let bytes = encode_ico(&[(16, &a[..]), (32, &b[..])]).unwrap();

        assert_eq!(u16_at(&bytes, 0), 0);
        assert_eq!(u16_at(&bytes, 2), 1);
        assert_eq!(u16_at(&bytes, 4), 2);
        assert_eq!(bytes.len(), 6 + 32 + 3 + 5);
    }

    #[test]
    fn test_directory_entries_match_payloads() {
        let a = [0xAAu8; 7];
        let b = [0xBBu8; 11];
        let c = [0xCCu8; 2];
        let bytes = encode_ico(&[(16, &a[..]), (48, &b[..]), (256, &c[..])]).unwrap();

        let mut expected_offset = 6 + 16 * 3;
        for (index, (size, payload)) in [(16u8, &a[..]), (48, &b[..]), (0, &c[..])]
            .iter()
            .enumerate()
        {
            let entry = 6 + 16 * index;
            assert_eq!(bytes[entry], *size);
            assert_eq!(bytes[entry + 1], *size);
            assert_eq!(bytes[entry + 2], 0);
            assert_eq!(bytes[entry + 3], 0);
            assert_eq!(u16_at(&bytes, entry + 4), 1);
            assert_eq!(u16_at(&bytes, entry + 6), 32);
            assert_eq!(u32_at(&bytes, entry + 8) as usize, payload.len());
            assert_eq!(u32_at(&bytes, entry + 12) as usize, expected_offset);
            assert_eq!(&bytes[expected_offset..expected_offset + payload.len()], *payload);
            expected_offset += payload.len();
        }
        assert_eq!(expected_offset, bytes.len());
    }

    #[test]
    fn test_size_256_encodes_as_zero() {
        let png = [1u8];
        let mut dir = IconDirectory::new();
        dir.add_png(256, &png).unwrap();
        dir.add_png(255, &png).unwrap();
        assert_eq!(dir.entries()[0].dimension_byte(), 0);
        assert_eq!(dir.entries()[1].dimension_byte(), 255);
    }

    #[test]
    fn test_rejects_out_of_range_sizes() {
        let png = [1u8];
        let mut dir = IconDirectory::new();
        assert!(matches!(dir.add_png(0, &png), Err(IcoError::Encoding(_))));
        assert!(matches!(dir.add_png(257, &png), Err(IcoError::Encoding(_))));
        assert!(dir.is_empty());
    }

    #[test]
    fn test_rejects_empty_payload() {
        let mut dir = IconDirectory::new();
        assert!(dir.add_png(16, &[]).is_err());
    }

    #[test]
    fn test_empty_directory_is_header_only() {
        let bytes = IconDirectory::new().to_bytes().unwrap();
        assert_eq!(bytes, vec![0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn test_write_reports_short_writer() {
        let png = [7u8; 32];
        let mut dir = IconDirectory::new();
        dir.add_png(32, &png).unwrap();

        let mut sink = [0u8; 10];
        let result = dir.write(&mut sink[..]);
        assert!(matches!(result, Err(IcoError::Io(_))));
    }
}
