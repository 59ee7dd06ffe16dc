//! Archive state relevant to signatures.
//!
//! An [`Archive`] owns the random-access byte store, the heap allocator, the
//! archive property tree, the "has files" gate and the signature registry.
//! Heap offsets are translated to store positions as
//! `toc_length + header_size + heap_offset`.

use crate::config::ArchiveOptions;
use crate::error::{Error, IoStage, Result};
use crate::header::XarHeader;
use crate::heap::{HeapLayout, HeapReservation};
use crate::properties::PropertyTree;
use crate::signatures::{
    copy_signed_data, Signature, SignatureRegistry, SignatureStrategy, SignedData, TocCodec,
};
use flate2::read::ZlibDecoder;
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;

/// A XAR archive backed by a byte store.
pub struct Archive<R> {
    store: R,
    options: ArchiveOptions,
    header: XarHeader,
    heap: HeapReservation,
    properties: PropertyTree,
    has_files: bool,
    signatures: SignatureRegistry,
}

impl<R> Archive<R> {
    /// Create an empty archive over `store`.
    ///
    /// The heap starts at offset 0, the TOC length is 0 and the archive has
    /// no files, so signatures may be created.
    pub fn new(store: R, options: ArchiveOptions) -> Self {
        Self {
            store,
            options,
            header: XarHeader::default(),
            heap: HeapReservation::default(),
            properties: PropertyTree::new(),
            has_files: false,
            signatures: SignatureRegistry::new(),
        }
    }

    /// Archive header.
    pub fn header(&self) -> &XarHeader {
        &self.header
    }

    /// Archive options.
    pub fn options(&self) -> &ArchiveOptions {
        &self.options
    }

    /// Byte length of the compressed TOC.
    pub fn toc_length(&self) -> u64 {
        self.header.toc_length_compressed
    }

    /// Set the byte length of the compressed TOC.
    pub fn set_toc_length(&mut self, toc_length: u64) {
        self.header.toc_length_compressed = toc_length;
    }

    /// Fixed header size used for heap position translation.
    pub fn header_size(&self) -> u64 {
        self.options
            .header_size
            .unwrap_or(u64::from(self.header.header_size))
    }

    /// Heap offset translation for this archive.
    pub fn layout(&self) -> HeapLayout {
        HeapLayout {
            toc_length: self.toc_length(),
            header_size: self.header_size(),
        }
    }

    /// Heap allocator state.
    pub fn heap(&self) -> &HeapReservation {
        &self.heap
    }

    /// Restart heap allocation at `offset`.
    ///
    /// Meant for archives that already hold heap data (e.g. the TOC
    /// checksum) before signatures are created.
    pub fn set_heap_offset(&mut self, offset: u64) {
        self.heap = HeapReservation::new(offset);
    }

    /// Returns true once file entries exist.
    pub fn has_files(&self) -> bool {
        self.has_files
    }

    /// Record that file entries exist; signatures can no longer be created.
    pub fn mark_has_files(&mut self) {
        self.has_files = true;
    }

    /// Archive property tree.
    pub fn properties(&self) -> &PropertyTree {
        &self.properties
    }

    /// Mutable archive property tree.
    pub fn properties_mut(&mut self) -> &mut PropertyTree {
        &mut self.properties
    }

    /// Signature registry.
    pub fn signatures(&self) -> &SignatureRegistry {
        &self.signatures
    }

    /// Mutable access to the signatures, e.g. to attach certificates.
    pub fn signature_mut(&mut self, index: usize) -> Option<&mut Signature> {
        self.signatures.get_mut(index)
    }

    /// Create a signature, reserving `length` heap bytes for its blob.
    pub fn create_signature(
        &mut self,
        style: &str,
        length: u32,
        signer: Option<Arc<dyn SignatureStrategy>>,
    ) -> Result<&mut Signature> {
        self.signatures
            .create(&mut self.heap, self.has_files, style, length, signer)
    }

    /// Remove the signature at `index` and every later signature.
    pub fn remove_signature(&mut self, index: usize) -> usize {
        self.signatures.remove(index)
    }

    /// Write every signature as `<signature>` elements.
    pub fn write_signatures<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        TocCodec::write_signatures(writer, self.signatures.as_slice())
    }

    /// Serialize every signature to a TOC fragment.
    pub fn serialize_signatures(&self) -> Result<String> {
        TocCodec::signatures_to_xml(self.signatures.as_slice(), self.options.toc_indent)
    }

    /// Serialize the signature at `index` and every signature after it.
    pub fn serialize_signatures_from(&self, index: usize) -> Result<String> {
        self.signatures.require(index)?;
        TocCodec::signatures_to_xml(&self.signatures.as_slice()[index..], self.options.toc_indent)
    }

    /// Append every `<signature>` element of `toc_xml` to the registry.
    ///
    /// Returns the number of signatures loaded.
    pub fn load_signatures(&mut self, toc_xml: &str) -> Result<usize> {
        let parsed = TocCodec::read_signatures(toc_xml);
        let count = parsed.len();
        for signature in parsed {
            self.signatures.push_loaded(signature)?;
        }
        Ok(count)
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &R {
        &self.store
    }

    /// Consume the archive and return the store.
    pub fn into_inner(self) -> R {
        self.store
    }
}

impl<R: Read + Seek> Archive<R> {
    /// Open an existing archive.
    ///
    /// Reads the header and the zlib-compressed TOC, then loads archive
    /// properties and signatures from the TOC.
    pub fn open(mut store: R, options: ArchiveOptions) -> Result<Self> {
        store
            .seek(SeekFrom::Start(0))
            .map_err(|e| Error::io(IoStage::Seek, e))?;
        let header = XarHeader::read_from(&mut store)?;

        if !options.allows_toc_size(header.toc_length_compressed)
            || !options.allows_toc_size(header.toc_length_uncompressed)
        {
            return Err(Error::Toc(format!(
                "TOC of {} bytes exceeds limit of {} bytes",
                header.toc_length_uncompressed.max(header.toc_length_compressed),
                options.max_toc_size
            )));
        }

        let toc = read_toc(&mut store, &header, &options)?;
        let store_len = store
            .seek(SeekFrom::End(0))
            .map_err(|e| Error::io(IoStage::Seek, e))?;

        let mut archive = Archive::new(store, options);
        archive.header = header;
        archive.properties = PropertyTree::from_toc(&toc);
        archive.has_files = toc_has_files(&toc);
        let heap_start = archive.toc_length().saturating_add(archive.header_size());
        archive.heap = HeapReservation::new(store_len.saturating_sub(heap_start));

        let loaded = archive.load_signatures(&toc)?;
        log::info!(
            "Opened archive: {} signature(s), {} properties, heap of {} bytes",
            loaded,
            archive.properties.len(),
            archive.heap.offset()
        );
        Ok(archive)
    }

    /// Read exactly `length` bytes at a heap offset.
    pub fn read_heap(&mut self, offset: u64, length: usize) -> Result<Vec<u8>> {
        self.layout().read(&mut self.store, offset, length)
    }

    /// Read the digest and stored bytes of the signature at `index`.
    pub fn copy_signed_data(&mut self, index: usize) -> Result<SignedData> {
        let layout = self.layout();
        let signature = self.signatures.require(index)?;
        copy_signed_data(&mut self.store, layout, &self.properties, signature)
    }

    /// Verify the signature at `index` with `strategy`.
    pub fn verify_signature(&mut self, index: usize, strategy: &dyn SignatureStrategy) -> Result<bool> {
        let data = self.copy_signed_data(index)?;
        let certificates = self.signatures.require(index)?.certificates().as_slices();
        strategy.verify(&data.digest, &data.signature, &certificates)
    }
}

impl<R: Write + Seek> Archive<R> {
    /// Write `data` at a heap offset.
    pub fn write_heap(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        self.layout().write(&mut self.store, offset, data)
    }

    /// Sign `digest` with each signature's signer and store the result in
    /// its reserved heap region.
    ///
    /// Signatures without a signer are skipped. Returns the number of
    /// signatures written.
    pub fn sign_signatures(&mut self, digest: &[u8]) -> Result<usize> {
        let layout = self.layout();
        let mut written = 0;
        for (index, signature) in self.signatures.iter().enumerate() {
            if signature.signer().is_none() {
                log::warn!("Signature #{} has no signer; leaving its region untouched", index);
                continue;
            }
            let bytes = signature.sign(digest)?;
            layout.write(&mut self.store, signature.offset(), &bytes)?;
            written += 1;
        }
        Ok(written)
    }
}

impl<R> std::fmt::Debug for Archive<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("header", &self.header)
            .field("heap", &self.heap)
            .field("properties", &self.properties.len())
            .field("has_files", &self.has_files)
            .field("signatures", &self.signatures.len())
            .finish()
    }
}

/// Read and inflate the TOC that follows the header.
fn read_toc<R: Read>(store: &mut R, header: &XarHeader, options: &ArchiveOptions) -> Result<String> {
    let mut compressed = Vec::new();
    store
        .take(header.toc_length_compressed)
        .read_to_end(&mut compressed)
        .map_err(|e| Error::io(IoStage::Read, e))?;
    if (compressed.len() as u64) != header.toc_length_compressed {
        return Err(Error::Toc(format!(
            "TOC truncated: expected {} bytes, found {}",
            header.toc_length_compressed,
            compressed.len()
        )));
    }

    let mut inflated = Vec::new();
    let limit = if options.max_toc_size == 0 {
        u64::MAX
    } else {
        options.max_toc_size as u64 + 1
    };
    ZlibDecoder::new(compressed.as_slice())
        .take(limit)
        .read_to_end(&mut inflated)
        .map_err(|e| Error::Toc(format!("unable to inflate TOC: {}", e)))?;
    if !options.allows_toc_size(inflated.len() as u64) {
        return Err(Error::Toc(format!(
            "inflated TOC exceeds limit of {} bytes",
            options.max_toc_size
        )));
    }
    if inflated.len() as u64 != header.toc_length_uncompressed {
        log::warn!(
            "TOC inflated to {} bytes, header says {}",
            inflated.len(),
            header.toc_length_uncompressed
        );
    }

    String::from_utf8(inflated).map_err(|e| Error::Toc(format!("TOC is not UTF-8: {}", e)))
}

/// Returns true if the TOC lists any `<file>` element.
fn toc_has_files(xml: &str) -> bool {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"file" => {
                return true;
            },
            Ok(Event::Eof) => return false,
            Err(e) => {
                log::warn!("TOC scan error: {:?}", e);
                return false;
            },
            _ => {},
        }
    }
}
