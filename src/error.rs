//! Error types for the XAR signature library.
//!
//! This module defines all error types that can occur while reserving heap
//! space, managing signatures and certificate chains, and reading signed
//! material back out of an archive.

use std::fmt;

/// Result type alias for XAR library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Heap access stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStage {
    /// Positioning the store at the requested heap location
    Seek,
    /// Reading the requested number of bytes
    Read,
    /// Writing signature bytes into a reserved heap region
    Write,
}

impl fmt::Display for IoStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoStage::Seek => f.write_str("seek"),
            IoStage::Read => f.write_str("read"),
            IoStage::Write => f.write_str("write"),
        }
    }
}

/// Error types that can occur during signature processing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Signature created after file entries were added to the archive
    #[error("Signatures must be added before files are added")]
    OrderingViolation,

    /// Storage for a reservation, record or certificate could not be obtained
    #[error("Allocation failure: {0}")]
    AllocationFailure(String),

    /// Heap access could not be completed in full
    #[error("Unable to {stage} heap: {source}")]
    Io {
        /// Stage that failed
        stage: IoStage,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Indexed item does not exist
    #[error("{what} {index} not found (count: {count})")]
    NotFound {
        /// Kind of item that was looked up
        what: &'static str,
        /// Requested index
        index: usize,
        /// Number of items available
        count: usize,
    },

    /// Signature style label is empty
    #[error("Signature style must not be empty")]
    InvalidStyle,

    /// Signer produced a signature that does not fill its reserved region
    #[error("Signature size mismatch: reserved {expected} bytes, signer produced {actual}")]
    SignatureSizeMismatch {
        /// Reserved length
        expected: u32,
        /// Length produced by the signer
        actual: usize,
    },

    /// Signature has no signer attached
    #[error("Signature has no signer attached")]
    MissingSigner,

    /// Invalid archive header
    #[error("Invalid XAR header: {0}")]
    InvalidHeader(String),

    /// TOC could not be loaded
    #[error("TOC error: {0}")]
    Toc(String),

    /// XML writer failure
    #[error("XML error: {0}")]
    Xml(String),

    /// Cryptographic backend failure
    #[cfg(feature = "signatures")]
    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl Error {
    /// Wrap an IO error raised during the given heap access stage.
    pub fn io(stage: IoStage, source: std::io::Error) -> Self {
        Error::Io { stage, source }
    }

    /// Returns the failing heap stage for IO errors.
    pub fn io_stage(&self) -> Option<IoStage> {
        match self {
            Error::Io { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
