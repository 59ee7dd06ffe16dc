//! Heap space reservation and random-access heap IO.
//!
//! The heap is the append-only region after the compressed TOC. Signatures
//! reserve their region before any file content is written, so a reserved
//! range is never handed out twice: the allocator only ever moves forward.

use crate::error::{Error, IoStage, Result};
use std::io::{Read, Seek, SeekFrom, Write};

/// Monotonic heap allocator.
///
/// Tracks the next free heap offset and the total heap length. Both only
/// grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapReservation {
    offset: u64,
    len: u64,
}

impl HeapReservation {
    /// Create an allocator starting at the given heap offset.
    pub fn new(offset: u64) -> Self {
        Self { offset, len: 0 }
    }

    /// Next free heap offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Total bytes accounted to the heap.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if nothing has been accounted to the heap.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reserve `length` bytes and return the offset of the reserved range.
    ///
    /// The returned offset is the heap offset before the reservation.
    pub fn reserve(&mut self, length: u64) -> Result<u64> {
        let start = self.offset;
        let next_offset = start.checked_add(length).ok_or_else(|| {
            Error::AllocationFailure(format!(
                "heap offset {} cannot grow by {} bytes",
                start, length
            ))
        })?;
        let next_len = self.len.checked_add(length).ok_or_else(|| {
            Error::AllocationFailure(format!(
                "heap length {} cannot grow by {} bytes",
                self.len, length
            ))
        })?;

        self.offset = next_offset;
        self.len = next_len;
        log::debug!("Reserved heap range [{}, {})", start, next_offset);
        Ok(start)
    }
}

/// Translates heap-relative offsets to absolute positions in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapLayout {
    /// Byte length of the compressed TOC
    pub toc_length: u64,
    /// Fixed archive header size
    pub header_size: u64,
}

impl HeapLayout {
    /// Absolute store position of a heap offset.
    pub fn position(&self, heap_offset: u64) -> Option<u64> {
        self.toc_length
            .checked_add(self.header_size)?
            .checked_add(heap_offset)
    }

    fn seek_to<S: Seek>(&self, store: &mut S, heap_offset: u64) -> Result<()> {
        let position = self.position(heap_offset).ok_or_else(|| {
            Error::io(
                IoStage::Seek,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("heap offset {} overflows the store", heap_offset),
                ),
            )
        })?;

        let reached = store
            .seek(SeekFrom::Start(position))
            .map_err(|e| Error::io(IoStage::Seek, e))?;
        if reached != position {
            return Err(Error::io(
                IoStage::Seek,
                std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("seek reached {} instead of {}", reached, position),
                ),
            ));
        }
        Ok(())
    }

    /// Read exactly `length` bytes at a heap offset.
    ///
    /// A short read is an error; no partial buffer is returned.
    pub fn read<S: Read + Seek>(&self, store: &mut S, heap_offset: u64, length: usize) -> Result<Vec<u8>> {
        self.seek_to(store, heap_offset)?;

        // Buffer grows with the bytes actually read
        let mut data = Vec::new();
        store
            .by_ref()
            .take(length as u64)
            .read_to_end(&mut data)
            .map_err(|e| Error::io(IoStage::Read, e))?;
        if data.len() != length {
            return Err(Error::io(
                IoStage::Read,
                std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("heap holds {} of {} requested bytes", data.len(), length),
                ),
            ));
        }

        log::debug!("Read {} heap bytes at offset {}", length, heap_offset);
        Ok(data)
    }

    /// Write `data` at a heap offset.
    pub fn write<S: Write + Seek>(&self, store: &mut S, heap_offset: u64, data: &[u8]) -> Result<()> {
        self.seek_to(store, heap_offset)?;
        store
            .write_all(data)
            .map_err(|e| Error::io(IoStage::Write, e))?;
        log::debug!("Wrote {} heap bytes at offset {}", data.len(), heap_offset);
        Ok(())
    }
}
