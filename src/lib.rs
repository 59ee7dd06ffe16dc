// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::enum_variant_names)]
#![allow(clippy::doc_overindented_list_items)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # XAR Oxide
//!
//! Signature support for XAR (eXtensible ARchive) files in Rust.
//!
//! ## Core Features
//!
//! - **Heap Reservation**: signatures claim contiguous heap regions in
//!   creation order, before any file data is written
//! - **Certificate Chains**: ordered X.509 certificate blobs per signature
//! - **TOC Codec**: `<signature>` elements with `<offset>`, `<size>` and an
//!   XML-DSig `<KeyInfo>/<X509Data>` certificate list
//! - **Signed-Data Extraction**: the TOC checksum digest and stored
//!   signature bytes for external verification
//! - **Pluggable Signing**: a strategy trait with an RSA PKCS#1 v1.5 backend
//!   (`signatures` feature)
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::fs::File;
//! use xar_oxide::{Archive, ArchiveOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut archive = Archive::open(File::open("signed.xar")?, ArchiveOptions::default())?;
//! for (i, sig) in archive.signatures().iter().enumerate() {
//!     println!("#{} {} at {} ({} bytes)", i, sig.style(), sig.offset(), sig.length());
//! }
//! let data = archive.copy_signed_data(0)?;
//! println!("digest {} bytes, signature {} bytes", data.digest_len(), data.signature_len());
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Archive structure
pub mod archive;
/// Archive configuration options
pub mod config;
pub mod header;
pub mod heap;
pub mod properties;

// Digital signatures
pub mod signatures;

// Re-exports
pub use archive::Archive;
pub use config::ArchiveOptions;
pub use error::{Error, Result};
pub use signatures::{Signature, SignatureRegistry, SignatureStrategy, SignedData, TocCodec};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
