//! XAR digital signatures.
//!
//! This module manages the signatures attached to an archive:
//!
//! - **Registry**: signatures in creation order, each owning a heap region
//!   reserved at creation time
//! - **Certificate chains**: ordered, opaque certificate blobs per signature
//! - **TOC codec**: mapping between signatures and `<signature>` TOC elements
//! - **Signed-data extraction**: the digest and signature bytes a verifier
//!   needs
//! - **Strategies**: pluggable signing/verification backends
//!
//! ## Example
//!
//! ```
//! use std::io::Cursor;
//! use xar_oxide::archive::Archive;
//! use xar_oxide::config::ArchiveOptions;
//!
//! let mut archive = Archive::new(Cursor::new(Vec::<u8>::new()), ArchiveOptions::default());
//! archive.set_heap_offset(20);
//!
//! let sig = archive.create_signature("RSA", 256, None)?;
//! sig.add_certificate(b"leaf certificate DER")?;
//! assert_eq!(sig.offset(), 20);
//! assert_eq!(archive.heap().offset(), 276);
//!
//! let xml = archive.serialize_signatures()?;
//! assert!(xml.contains("<size>256</size>"));
//! # Ok::<(), xar_oxide::error::Error>(())
//! ```
//!
//! The RSA backend requires the `signatures` feature to be enabled.

mod certificates;
mod extract;
mod registry;
mod strategy;
mod toc;
mod types;

pub use certificates::{Certificate, CertificateChain};
pub use extract::{copy_signed_data, SignedData};
pub use registry::SignatureRegistry;
#[cfg(feature = "signatures")]
pub use strategy::RsaPkcs1Strategy;
pub use strategy::{DigestAlgorithm, SignatureStrategy};
pub use toc::{TocCodec, XMLDSIG_NAMESPACE};
pub use types::Signature;
