//! Signature records.

use super::certificates::CertificateChain;
use super::strategy::SignatureStrategy;
use crate::error::{Error, Result};
use std::sync::Arc;

/// A signature attached to an archive.
///
/// The signature bytes live in the heap at `[offset, offset + length)`,
/// a region reserved when the signature was created.
#[derive(Clone)]
pub struct Signature {
    pub(crate) style: String,
    pub(crate) length: u32,
    pub(crate) offset: u64,
    pub(crate) certificates: CertificateChain,
    pub(crate) signer: Option<Arc<dyn SignatureStrategy>>,
}

impl Signature {
    pub(crate) fn new(
        style: String,
        length: u32,
        offset: u64,
        signer: Option<Arc<dyn SignatureStrategy>>,
    ) -> Self {
        Self {
            style,
            length,
            offset,
            certificates: CertificateChain::new(),
            signer,
        }
    }

    /// Signing style label (e.g. `RSA`).
    pub fn style(&self) -> &str {
        &self.style
    }

    /// Stored byte length of the signature blob.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Heap offset of the signature blob.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Certificate chain attached to this signature.
    pub fn certificates(&self) -> &CertificateChain {
        &self.certificates
    }

    /// Append a copy of `certificate` to the chain.
    pub fn add_certificate(&mut self, certificate: &[u8]) -> Result<()> {
        self.certificates.add(certificate)
    }

    /// Number of attached certificates.
    pub fn certificate_count(&self) -> usize {
        self.certificates.count()
    }

    /// Bytes of the certificate at `index`.
    pub fn certificate(&self, index: usize) -> Result<&[u8]> {
        self.certificates.get(index)
    }

    /// Signer attached at creation, if any.
    pub fn signer(&self) -> Option<&Arc<dyn SignatureStrategy>> {
        self.signer.as_ref()
    }

    /// Sign `digest` with the attached signer.
    ///
    /// The result must fill the reserved region exactly.
    pub fn sign(&self, digest: &[u8]) -> Result<Vec<u8>> {
        let signer = self.signer.as_ref().ok_or(Error::MissingSigner)?;
        let signed = signer.sign(digest)?;
        if signed.len() != self.length as usize {
            return Err(Error::SignatureSizeMismatch {
                expected: self.length,
                actual: signed.len(),
            });
        }
        Ok(signed)
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signature")
            .field("style", &self.style)
            .field("length", &self.length)
            .field("offset", &self.offset)
            .field("certificates", &self.certificates.count())
            .field("signer", &self.signer.is_some())
            .finish()
    }
}

impl PartialEq for Signature {
    /// Signatures compare by their stored fields; signers are not compared.
    fn eq(&self, other: &Self) -> bool {
        self.style == other.style
            && self.length == other.length
            && self.offset == other.offset
            && self.certificates == other.certificates
    }
}
