//! Certificate chain storage.
//!
//! Each signature owns an ordered chain of opaque certificate blobs
//! (DER-encoded X.509 in practice). The chain is addressed only by position;
//! certificate structure is never inspected here.

use crate::error::{Error, Result};

/// A single certificate blob.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    content: Vec<u8>,
}

impl Certificate {
    /// Raw certificate bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.content
    }

    /// Byte length of the certificate.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Returns true for a zero-length certificate.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("content", &format!("{} bytes", self.content.len()))
            .finish()
    }
}

/// Ordered chain of certificates, in append order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateChain {
    certificates: Vec<Certificate>,
}

impl CertificateChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `data` into the chain as its new last certificate.
    pub fn add(&mut self, data: &[u8]) -> Result<()> {
        let mut content = Vec::new();
        content.try_reserve_exact(data.len()).map_err(|e| {
            Error::AllocationFailure(format!("certificate of {} bytes: {}", data.len(), e))
        })?;
        content.extend_from_slice(data);

        self.certificates.try_reserve(1).map_err(|e| {
            Error::AllocationFailure(format!("certificate chain slot: {}", e))
        })?;
        self.certificates.push(Certificate { content });
        Ok(())
    }

    /// Number of certificates in the chain.
    pub fn count(&self) -> usize {
        self.certificates.len()
    }

    /// Returns true if the chain holds no certificates.
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Bytes of the certificate at `index`.
    pub fn get(&self, index: usize) -> Result<&[u8]> {
        self.certificates
            .get(index)
            .map(Certificate::as_bytes)
            .ok_or(Error::NotFound {
                what: "certificate",
                index,
                count: self.certificates.len(),
            })
    }

    /// Iterate over the certificates in chain order.
    pub fn iter(&self) -> std::slice::Iter<'_, Certificate> {
        self.certificates.iter()
    }

    /// Borrow every certificate's bytes, in chain order.
    pub fn as_slices(&self) -> Vec<&[u8]> {
        self.certificates.iter().map(Certificate::as_bytes).collect()
    }
}

impl<'a> IntoIterator for &'a CertificateChain {
    type Item = &'a Certificate;
    type IntoIter = std::slice::Iter<'a, Certificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
