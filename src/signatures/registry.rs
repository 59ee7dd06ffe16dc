//! Ordered signature registry.
//!
//! Signatures are kept in creation order. Creation reserves the signature's
//! heap region up front, which is why it is only allowed before any file
//! content exists in the archive.

use super::strategy::SignatureStrategy;
use super::types::Signature;
use crate::error::{Error, Result};
use crate::heap::HeapReservation;
use std::sync::Arc;

/// Collection of an archive's signatures, in creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignatureRegistry {
    signatures: Vec<Signature>,
}

impl SignatureRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a signature and reserve `length` heap bytes for it.
    ///
    /// Fails with [`Error::OrderingViolation`] once the archive has files;
    /// the registry and heap are left unchanged on any failure.
    pub fn create(
        &mut self,
        heap: &mut HeapReservation,
        has_files: bool,
        style: &str,
        length: u32,
        signer: Option<Arc<dyn SignatureStrategy>>,
    ) -> Result<&mut Signature> {
        if has_files {
            log::warn!("Signature '{}' rejected: archive already has files", style);
            return Err(Error::OrderingViolation);
        }
        if style.is_empty() {
            return Err(Error::InvalidStyle);
        }

        self.signatures
            .try_reserve(1)
            .map_err(|e| Error::AllocationFailure(format!("signature record: {}", e)))?;
        let offset = heap.reserve(u64::from(length))?;

        log::debug!(
            "Created signature #{} style={} offset={} length={}",
            self.signatures.len(),
            style,
            offset,
            length
        );
        Ok(self.push(Signature::new(style.to_string(), length, offset, signer)))
    }

    /// Append a signature read from a TOC; no heap space is reserved.
    pub fn push_loaded(&mut self, signature: Signature) -> Result<&mut Signature> {
        self.signatures
            .try_reserve(1)
            .map_err(|e| Error::AllocationFailure(format!("signature record: {}", e)))?;
        Ok(self.push(signature))
    }

    fn push(&mut self, signature: Signature) -> &mut Signature {
        let index = self.signatures.len();
        self.signatures.push(signature);
        &mut self.signatures[index]
    }

    /// Remove the signature at `index` together with every signature created
    /// after it. Heap space is not reclaimed.
    ///
    /// Returns the number of signatures removed.
    pub fn remove(&mut self, index: usize) -> usize {
        if index >= self.signatures.len() {
            return 0;
        }
        let removed = self.signatures.len() - index;
        self.signatures.truncate(index);
        log::debug!("Removed {} signature(s) starting at #{}", removed, index);
        removed
    }

    /// Number of signatures.
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    /// Returns true if there are no signatures.
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// First signature, if any.
    pub fn first(&self) -> Option<&Signature> {
        self.signatures.first()
    }

    /// Signature following the one at `index`.
    pub fn next_after(&self, index: usize) -> Option<&Signature> {
        self.signatures.get(index.checked_add(1)?)
    }

    /// Signature at `index`.
    pub fn get(&self, index: usize) -> Option<&Signature> {
        self.signatures.get(index)
    }

    /// Mutable signature at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Signature> {
        self.signatures.get_mut(index)
    }

    /// Look up a signature, failing with [`Error::NotFound`].
    pub fn require(&self, index: usize) -> Result<&Signature> {
        self.signatures.get(index).ok_or(Error::NotFound {
            what: "signature",
            index,
            count: self.signatures.len(),
        })
    }

    /// Iterate over signatures in creation order.
    pub fn iter(&self) -> std::slice::Iter<'_, Signature> {
        self.signatures.iter()
    }

    /// All signatures as a slice.
    pub fn as_slice(&self) -> &[Signature] {
        &self.signatures
    }
}

impl<'a> IntoIterator for &'a SignatureRegistry {
    type Item = &'a Signature;
    type IntoIter = std::slice::Iter<'a, Signature>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
