//! XAR archive header.
//!
//! Every archive starts with a fixed big-endian header followed by the
//! zlib-compressed TOC and then the heap:
//!
//! ```text
//! +-------+-------------+---------+----------------+------------------+--------------+
//! | magic | header_size | version | toc_compressed | toc_uncompressed | checksum_alg |
//! |  u32  |     u16     |   u16   |      u64       |       u64        |     u32      |
//! +-------+-------------+---------+----------------+------------------+--------------+
//! ```
//!
//! Heap offsets are relative to the first byte after the compressed TOC.

use crate::config::DEFAULT_HEADER_SIZE;
use crate::error::{Error, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Archive magic number (`xar!`).
pub const XAR_MAGIC: u32 = 0x7861_7221;

/// Current header version.
pub const XAR_VERSION: u16 = 1;

/// Checksum algorithm recorded in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumAlgorithm {
    /// No TOC checksum
    None,
    /// SHA-1 (the historical default)
    #[default]
    Sha1,
    /// MD5
    Md5,
    /// Algorithm named in the TOC `checksum/style` property
    Other(u32),
}

impl ChecksumAlgorithm {
    /// Decode the header field.
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => ChecksumAlgorithm::None,
            1 => ChecksumAlgorithm::Sha1,
            2 => ChecksumAlgorithm::Md5,
            other => ChecksumAlgorithm::Other(other),
        }
    }

    /// Encode the header field.
    pub fn as_u32(&self) -> u32 {
        match self {
            ChecksumAlgorithm::None => 0,
            ChecksumAlgorithm::Sha1 => 1,
            ChecksumAlgorithm::Md5 => 2,
            ChecksumAlgorithm::Other(value) => *value,
        }
    }
}

/// Parsed archive header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XarHeader {
    /// Size of the header in bytes (may exceed 28 for future extensions)
    pub header_size: u16,
    /// Format version
    pub version: u16,
    /// Byte length of the compressed TOC
    pub toc_length_compressed: u64,
    /// Byte length of the TOC once inflated
    pub toc_length_uncompressed: u64,
    /// TOC checksum algorithm
    pub checksum_algorithm: ChecksumAlgorithm,
}

impl Default for XarHeader {
    fn default() -> Self {
        Self {
            header_size: DEFAULT_HEADER_SIZE as u16,
            version: XAR_VERSION,
            toc_length_compressed: 0,
            toc_length_uncompressed: 0,
            checksum_algorithm: ChecksumAlgorithm::Sha1,
        }
    }
}

impl XarHeader {
    /// Read a header from the start of an archive.
    ///
    /// Any bytes between the fixed fields and `header_size` are consumed so
    /// the reader is left positioned at the compressed TOC.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let magic = reader.read_u32::<BigEndian>().map_err(short_header)?;
        if magic != XAR_MAGIC {
            return Err(Error::InvalidHeader(format!(
                "expected magic 0x{:08x}, found 0x{:08x}",
                XAR_MAGIC, magic
            )));
        }

        let header_size = reader.read_u16::<BigEndian>().map_err(short_header)?;
        if u64::from(header_size) < DEFAULT_HEADER_SIZE {
            return Err(Error::InvalidHeader(format!(
                "header size {} is smaller than {}",
                header_size, DEFAULT_HEADER_SIZE
            )));
        }

        let version = reader.read_u16::<BigEndian>().map_err(short_header)?;
        let toc_length_compressed = reader.read_u64::<BigEndian>().map_err(short_header)?;
        let toc_length_uncompressed = reader.read_u64::<BigEndian>().map_err(short_header)?;
        let checksum_algorithm =
            ChecksumAlgorithm::from_u32(reader.read_u32::<BigEndian>().map_err(short_header)?);

        let extra = u64::from(header_size) - DEFAULT_HEADER_SIZE;
        if extra > 0 {
            let skipped = std::io::copy(&mut reader.by_ref().take(extra), &mut std::io::sink())
                .map_err(short_header)?;
            if skipped != extra {
                return Err(Error::InvalidHeader("truncated header extension".to_string()));
            }
        }

        log::debug!(
            "XAR header: size={} version={} toc={}/{} bytes",
            header_size,
            version,
            toc_length_compressed,
            toc_length_uncompressed
        );

        Ok(Self {
            header_size,
            version,
            toc_length_compressed,
            toc_length_uncompressed,
            checksum_algorithm,
        })
    }

    /// Write the header, zero-padding up to `header_size`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let write = |writer: &mut W| -> std::io::Result<()> {
            writer.write_u32::<BigEndian>(XAR_MAGIC)?;
            writer.write_u16::<BigEndian>(self.header_size)?;
            writer.write_u16::<BigEndian>(self.version)?;
            writer.write_u64::<BigEndian>(self.toc_length_compressed)?;
            writer.write_u64::<BigEndian>(self.toc_length_uncompressed)?;
            writer.write_u32::<BigEndian>(self.checksum_algorithm.as_u32())?;
            let padding = u64::from(self.header_size).saturating_sub(DEFAULT_HEADER_SIZE);
            for _ in 0..padding {
                writer.write_u8(0)?;
            }
            Ok(())
        };
        write(writer).map_err(|e| Error::io(crate::error::IoStage::Write, e))
    }

    /// Serialize the header to a byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(usize::from(self.header_size));
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }
}

fn short_header(e: std::io::Error) -> Error {
    Error::InvalidHeader(format!("unable to read header: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_layout() {
        let header = XarHeader {
            toc_length_compressed: 0x0102,
            toc_length_uncompressed: 0x0304,
            ..Default::default()
        };
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes.len(), 28);
        assert_eq!(&bytes[0..4], b"xar!");
        assert_eq!(&bytes[4..6], &[0, 28]);
        assert_eq!(&bytes[6..8], &[0, 1]);
        assert_eq!(&bytes[8..16], &[0, 0, 0, 0, 0, 0, 0x01, 0x02]);
        assert_eq!(&bytes[24..28], &[0, 0, 0, 1]);

        let parsed = XarHeader::read_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_extended_header_is_skipped() {
        let header = XarHeader {
            header_size: 32,
            ..Default::default()
        };
        let mut bytes = header.to_bytes().unwrap();
        assert_eq!(bytes.len(), 32);
        bytes.push(0xAA);

        let mut cursor = Cursor::new(bytes);
        let parsed = XarHeader::read_from(&mut cursor).unwrap();
        assert_eq!(parsed.header_size, 32);
        assert_eq!(cursor.position(), 32);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = XarHeader::default().to_bytes().unwrap();
        bytes[0] = b'z';
        let result = XarHeader::read_from(&mut Cursor::new(bytes));
        assert!(matches!(result, Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = XarHeader::default().to_bytes().unwrap();
        let result = XarHeader::read_from(&mut Cursor::new(&bytes[..12]));
        assert!(matches!(result, Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_header_too_small() {
        let mut bytes = XarHeader::default().to_bytes().unwrap();
        bytes[5] = 20;
        let result = XarHeader::read_from(&mut Cursor::new(bytes));
        assert!(matches!(result, Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_checksum_algorithm_codes() {
        assert_eq!(ChecksumAlgorithm::from_u32(0), ChecksumAlgorithm::None);
        assert_eq!(ChecksumAlgorithm::from_u32(2), ChecksumAlgorithm::Md5);
        assert_eq!(ChecksumAlgorithm::from_u32(7).as_u32(), 7);
    }
}
