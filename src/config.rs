//! Configuration for archive loading and TOC writing.

/// Default fixed header size of a XAR archive in bytes.
pub const DEFAULT_HEADER_SIZE: u64 = 28;

/// Archive options controlling heap addressing and TOC handling.
///
/// # Example
///
/// ```
/// use xar_oxide::config::ArchiveOptions;
///
/// let options = ArchiveOptions::default()
///     .with_header_size(28)
///     .with_toc_indent(None);
/// assert_eq!(options.header_size, Some(28));
/// assert!(options.toc_indent.is_none());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ArchiveOptions {
    /// Fixed header size used to translate heap offsets to file positions.
    ///
    /// `None` uses the size recorded in the archive header
    /// ([`DEFAULT_HEADER_SIZE`] for archives created in memory).
    pub header_size: Option<u64>,

    /// Maximum uncompressed TOC size in bytes
    ///
    /// Protects against decompression bombs. Default: 64 MB. Set to 0 to
    /// disable the check.
    pub max_toc_size: usize,

    /// Indentation width for serialized TOC elements (`None` = compact)
    pub toc_indent: Option<usize>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            header_size: None,
            max_toc_size: 64 * 1024 * 1024, // 64 MB
            toc_indent: Some(2),
        }
    }
}

impl ArchiveOptions {
    /// Override the fixed header size.
    pub fn with_header_size(mut self, header_size: u64) -> Self {
        self.header_size = Some(header_size);
        self
    }

    /// Set the maximum uncompressed TOC size.
    pub fn with_max_toc_size(mut self, max_toc_size: usize) -> Self {
        self.max_toc_size = max_toc_size;
        self
    }

    /// Set the TOC indentation width.
    pub fn with_toc_indent(mut self, indent: Option<usize>) -> Self {
        self.toc_indent = indent;
        self
    }

    /// Check whether a TOC of the given size is acceptable.
    pub(crate) fn allows_toc_size(&self, size: u64) -> bool {
        self.max_toc_size == 0 || size <= self.max_toc_size as u64
    }
}
