//! Signed-data extraction.
//!
//! A XAR signature signs the archive's TOC checksum. Verification needs two
//! byte strings from the heap: the checksum digest (located through the
//! `checksum/offset` and `checksum/size` properties) and the signature's
//! own stored bytes.

use super::types::Signature;
use crate::error::{Error, Result};
use crate::heap::HeapLayout;
use crate::properties::{PropertyTree, CHECKSUM_OFFSET_KEY, CHECKSUM_SIZE_KEY};
use std::io::{Read, Seek};

/// Material an external verifier needs for one signature.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedData {
    /// TOC checksum digest bytes (the signed data)
    pub digest: Vec<u8>,
    /// Stored signature bytes
    pub signature: Vec<u8>,
}

impl SignedData {
    /// Byte length of the digest.
    pub fn digest_len(&self) -> usize {
        self.digest.len()
    }

    /// Byte length of the signature.
    pub fn signature_len(&self) -> usize {
        self.signature.len()
    }
}

impl std::fmt::Debug for SignedData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedData")
            .field("digest", &format!("{} bytes", self.digest.len()))
            .field("signature", &format!("{} bytes", self.signature.len()))
            .finish()
    }
}

/// Read the digest and the signature bytes for `signature` from the heap.
///
/// Missing checksum properties read as zero. Both reads must be satisfied in
/// full; a short read fails and no partial data is returned.
pub fn copy_signed_data<S: Read + Seek>(
    store: &mut S,
    layout: HeapLayout,
    properties: &PropertyTree,
    signature: &Signature,
) -> Result<SignedData> {
    let digest_len = properties.get_u64(CHECKSUM_SIZE_KEY).unwrap_or(0);
    let digest_offset = properties.get_u64(CHECKSUM_OFFSET_KEY).unwrap_or(0);
    if properties.get(CHECKSUM_SIZE_KEY).is_none() {
        log::warn!("Archive has no {} property; digest is empty", CHECKSUM_SIZE_KEY);
    }

    let digest_len = usize::try_from(digest_len).map_err(|_| {
        Error::AllocationFailure(format!("digest of {} bytes", digest_len))
    })?;
    let digest = layout.read(store, digest_offset, digest_len)?;
    let signature_bytes = layout.read(store, signature.offset(), signature.length() as usize)?;

    log::debug!(
        "Copied signed data: {} digest bytes at {}, {} signature bytes at {}",
        digest.len(),
        digest_offset,
        signature_bytes.len(),
        signature.offset()
    );

    Ok(SignedData {
        digest,
        signature: signature_bytes,
    })
}
