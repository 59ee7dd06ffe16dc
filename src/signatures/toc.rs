//! TOC codec for signature elements.
//!
//! Each signature is stored in the archive's TOC as:
//!
//! ```xml
//! <signature style="RSA">
//!   <offset>20</offset>
//!   <size>256</size>
//!   <KeyInfo xmlns="http://www.w3.org/2000/09/xmldsig#">
//!     <X509Data>
//!       <X509Certificate>MIICXTCCA...base64...</X509Certificate>
//!     </X509Data>
//!   </KeyInfo>
//! </signature>
//! ```
//!
//! Reading is forgiving: numeric text that does not parse yields zero,
//! unknown elements are skipped, and certificate text that is not valid
//! base64 is dropped with a warning. There is no "malformed document" error.

use super::types::Signature;
use crate::error::{Error, Result};
use crate::properties::{parse_decimal, style_attribute};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Write;

/// Namespace of the `KeyInfo` element (XML-DSig).
pub const XMLDSIG_NAMESPACE: &str = "http://www.w3.org/2000/09/xmldsig#";

/// Element currently being read inside a `<signature>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Signature,
    Offset,
    Size,
    KeyInfo,
    X509Data,
    X509Certificate,
    /// Unrecognized element; its whole subtree is ignored
    Unknown,
}

impl Scope {
    /// Scope entered by a child element `name` of `self`.
    fn child(self, name: &[u8]) -> Scope {
        match (self, name) {
            (Scope::Signature, b"offset") => Scope::Offset,
            (Scope::Signature, b"size") => Scope::Size,
            (Scope::Signature, b"KeyInfo") => Scope::KeyInfo,
            (Scope::KeyInfo, b"X509Data") => Scope::X509Data,
            (Scope::X509Data, b"X509Certificate") => Scope::X509Certificate,
            _ => Scope::Unknown,
        }
    }
}

/// Serializer/deserializer between signatures and TOC elements.
pub struct TocCodec;

impl TocCodec {
    /// Write one `<signature>` element.
    pub fn write_signature<W: Write>(writer: &mut Writer<W>, signature: &Signature) -> Result<()> {
        let start = BytesStart::new("signature").with_attributes([("style", signature.style())]);
        writer.write_event(Event::Start(start)).map_err(xml_error)?;

        write_text_element(writer, "offset", &signature.offset().to_string())?;
        write_text_element(writer, "size", &signature.length().to_string())?;

        let key_info = BytesStart::new("KeyInfo").with_attributes([("xmlns", XMLDSIG_NAMESPACE)]);
        writer.write_event(Event::Start(key_info)).map_err(xml_error)?;
        writer
            .write_event(Event::Start(BytesStart::new("X509Data")))
            .map_err(xml_error)?;
        for certificate in signature.certificates() {
            write_text_element(writer, "X509Certificate", &BASE64.encode(certificate.as_bytes()))?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("X509Data")))
            .map_err(xml_error)?;
        writer
            .write_event(Event::End(BytesEnd::new("KeyInfo")))
            .map_err(xml_error)?;

        writer
            .write_event(Event::End(BytesEnd::new("signature")))
            .map_err(xml_error)?;
        Ok(())
    }

    /// Write sibling `<signature>` elements for every signature, in order.
    ///
    /// Passing a registry's tail slice (`&signatures[i..]`) writes the
    /// signature at `i` and every one created after it.
    pub fn write_signatures<W: Write>(writer: &mut Writer<W>, signatures: &[Signature]) -> Result<()> {
        for signature in signatures {
            Self::write_signature(writer, signature)?;
        }
        Ok(())
    }

    /// Serialize signatures to a standalone XML fragment.
    pub fn signatures_to_xml(signatures: &[Signature], indent: Option<usize>) -> Result<String> {
        let mut writer = match indent {
            Some(width) => Writer::new_with_indent(Vec::new(), b' ', width),
            None => Writer::new(Vec::new()),
        };
        Self::write_signatures(&mut writer, signatures)?;
        String::from_utf8(writer.into_inner())
            .map_err(|e| Error::Xml(format!("serialized TOC is not UTF-8: {}", e)))
    }

    /// Read one signature whose start tag `start` was just returned by
    /// `reader`.
    ///
    /// Reading stops at the matching `</signature>`, at end of input, or at
    /// non-whitespace text placed directly inside `<signature>`.
    pub fn read_signature(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Signature {
        let mut signature = Self::signature_from_start(start);

        let mut stack = vec![Scope::Signature];
        let mut certificate_text: Option<String> = None;

        while let Some(&scope) = stack.last() {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let child = if scope == Scope::Unknown {
                        Scope::Unknown
                    } else {
                        scope.child(e.local_name().as_ref())
                    };
                    if child == Scope::X509Certificate {
                        certificate_text = None;
                    }
                    stack.push(child);
                },
                Ok(Event::Text(e)) => {
                    let text = e.unescape().unwrap_or_default();
                    if !Self::read_text(&mut signature, scope, &text, &mut certificate_text) {
                        break;
                    }
                },
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e);
                    if !Self::read_text(&mut signature, scope, &text, &mut certificate_text) {
                        break;
                    }
                },
                Ok(Event::End(_)) => {
                    if stack.pop() == Some(Scope::X509Certificate) {
                        if let Some(text) = certificate_text.take() {
                            Self::add_encoded_certificate(&mut signature, &text);
                        }
                    }
                },
                Ok(Event::Eof) => {
                    log::warn!("TOC ended inside <signature> element");
                    break;
                },
                Err(e) => {
                    log::warn!("Signature parsing error: {:?}", e);
                    break;
                },
                _ => {},
            }
        }

        signature
    }

    /// Read every `<signature>` element of a TOC document, in document order.
    pub fn read_signatures(xml: &str) -> Vec<Signature> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut signatures = Vec::new();
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"signature" => {
                    signatures.push(Self::read_signature(&mut reader, &e));
                },
                Ok(Event::Empty(e)) if e.local_name().as_ref() == b"signature" => {
                    signatures.push(Self::signature_from_start(&e));
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    log::warn!("TOC parsing error: {:?}", e);
                    break;
                },
                _ => {},
            }
        }

        log::debug!("Read {} signature(s) from TOC", signatures.len());
        signatures
    }

    /// Apply character data found in `scope`. Returns false when reading
    /// must stop.
    fn read_text(
        signature: &mut Signature,
        scope: Scope,
        text: &str,
        certificate_text: &mut Option<String>,
    ) -> bool {
        match scope {
            Scope::Signature => {
                if !text.trim().is_empty() {
                    log::warn!("Text inside <signature> element; stopping");
                    return false;
                }
            },
            Scope::Offset => signature.offset = parse_decimal(text),
            // Stored length is 32 bits wide; wider values keep their low bits
            Scope::Size => signature.length = parse_decimal(text) as u32,
            Scope::X509Certificate => {
                certificate_text.get_or_insert_with(String::new).push_str(text);
            },
            _ => {},
        }
        true
    }

    fn signature_from_start(start: &BytesStart<'_>) -> Signature {
        Signature::new(style_attribute(start).unwrap_or_default(), 0, 0, None)
    }

    fn add_encoded_certificate(signature: &mut Signature, text: &str) {
        let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        match BASE64.decode(compact.as_bytes()) {
            Ok(der) => {
                if let Err(e) = signature.add_certificate(&der) {
                    log::warn!("Dropping certificate: {}", e);
                }
            },
            Err(e) => log::warn!("Dropping undecodable X509Certificate: {}", e),
        }
    }
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_error)?;
    Ok(())
}

fn xml_error<E: std::fmt::Display>(e: E) -> Error {
    Error::Xml(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(style: &str, length: u32, offset: u64, certs: &[&[u8]]) -> Signature {
        let mut sig = Signature::new(style.to_string(), length, offset, None);
        for cert in certs {
            sig.add_certificate(cert).unwrap();
        }
        sig
    }

    #[test]
    fn test_write_signature_shape() {
        let sig = signature("RSA", 256, 20, &[b"abc"]);
        let xml = TocCodec::signatures_to_xml(&[sig], None).unwrap();
        assert_eq!(
            xml,
            "<signature style=\"RSA\"><offset>20</offset><size>256</size>\
             <KeyInfo xmlns=\"http://www.w3.org/2000/09/xmldsig#\"><X509Data>\
             <X509Certificate>YWJj</X509Certificate></X509Data></KeyInfo></signature>"
        );
    }

    #[test]
    fn test_key_info_written_without_certificates() {
        let sig = signature("RSA", 128, 0, &[]);
        let xml = TocCodec::signatures_to_xml(&[sig], None).unwrap();
        assert!(xml.contains("<X509Data></X509Data>"));
        assert!(xml.contains(XMLDSIG_NAMESPACE));
    }

    #[test]
    fn test_write_signatures_as_siblings() {
        let sigs = vec![signature("A", 1, 0, &[]), signature("B", 2, 1, &[])];
        let xml = TocCodec::signatures_to_xml(&sigs, Some(2)).unwrap();
        assert_eq!(xml.matches("<signature ").count(), 2);
        let a = xml.find("style=\"A\"").unwrap();
        let b = xml.find("style=\"B\"").unwrap();
        assert!(a < b);

        // Writing from the second signature on leaves out the first
        let tail = TocCodec::signatures_to_xml(&sigs[1..], None).unwrap();
        assert!(!tail.contains("style=\"A\""));
    }

    #[test]
    fn test_round_trip_keeps_fields() {
        let sigs = vec![
            signature("RSA-SHA1", 256, 20, &[&[0u8; 800], &[1u8; 810]]),
            signature("RSA-SHA256", 512, 276, &[]),
        ];
        let xml = TocCodec::signatures_to_xml(&sigs, Some(2)).unwrap();
        let parsed = TocCodec::read_signatures(&xml);
        assert_eq!(parsed, sigs);
        assert_eq!(parsed[0].certificate(0).unwrap().len(), 800);
        assert_eq!(parsed[0].certificate(1).unwrap().len(), 810);
    }

    #[test]
    fn test_read_non_numeric_yields_zero() {
        let xml = r#"<signature style="RSA"><offset>abc</offset><size>x12</size></signature>"#;
        let sigs = TocCodec::read_signatures(xml);
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].offset(), 0);
        assert_eq!(sigs[0].length(), 0);
    }

    #[test]
    fn test_read_size_keeps_low_bits() {
        let xml = format!(
            "<signature style=\"RSA\"><offset>{}</offset><size>{}</size></signature>",
            u64::MAX,
            (1u64 << 32) + 7
        );
        let sigs = TocCodec::read_signatures(&xml);
        assert_eq!(sigs[0].offset(), u64::MAX);
        assert_eq!(sigs[0].length(), 7);
    }

    #[test]
    fn test_unknown_elements_are_skipped() {
        let xml = r#"<signature style="RSA">
            <timestamp><size>999</size></timestamp>
            <offset>20</offset>
            <size>256</size>
            <KeyInfo xmlns="http://www.w3.org/2000/09/xmldsig#">
              <KeyName>signer</KeyName>
              <X509Data>
                <X509IssuerSerial>ignored</X509IssuerSerial>
                <X509Certificate>YWJj</X509Certificate>
              </X509Data>
            </KeyInfo>
          </signature>"#;
        let sigs = TocCodec::read_signatures(xml);
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].offset(), 20);
        assert_eq!(sigs[0].length(), 256);
        assert_eq!(sigs[0].certificate_count(), 1);
        assert_eq!(sigs[0].certificate(0).unwrap(), b"abc");
    }

    #[test]
    fn test_text_under_signature_stops_reading() {
        let xml = r#"<signature style="RSA"><offset>20</offset>stray<size>256</size></signature>"#;
        let sigs = TocCodec::read_signatures(xml);
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].style(), "RSA");
        assert_eq!(sigs[0].offset(), 20);
        assert_eq!(sigs[0].length(), 0);
    }

    #[test]
    fn test_wrapped_base64_and_bad_base64() {
        let xml = "<signature style=\"RSA\"><KeyInfo><X509Data>\
                   <X509Certificate>YW\n  Jj</X509Certificate>\
                   <X509Certificate>!!!notbase64</X509Certificate>\
                   <X509Certificate>ZGVm</X509Certificate>\
                   </X509Data></KeyInfo></signature>";
        let sigs = TocCodec::read_signatures(xml);
        assert_eq!(sigs[0].certificate_count(), 2);
        assert_eq!(sigs[0].certificate(0).unwrap(), b"abc");
        assert_eq!(sigs[0].certificate(1).unwrap(), b"def");
    }

    #[test]
    fn test_cdata_content_is_read() {
        let xml = "<signature style=\"RSA\"><offset><![CDATA[40]]></offset><size>8</size>\
                   <KeyInfo><X509Data>\
                   <X509Certificate><![CDATA[YWJj]]></X509Certificate>\
                   <X509Certificate>ZG<![CDATA[Vm]]></X509Certificate>\
                   </X509Data></KeyInfo></signature>";
        let sigs = TocCodec::read_signatures(xml);
        assert_eq!(sigs[0].offset(), 40);
        assert_eq!(sigs[0].certificate_count(), 2);
        assert_eq!(sigs[0].certificate(0).unwrap(), b"abc");
        assert_eq!(sigs[0].certificate(1).unwrap(), b"def");
    }

    #[test]
    fn test_empty_signature_element() {
        let sigs = TocCodec::read_signatures(r#"<toc><signature style="RSA"/></toc>"#);
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].style(), "RSA");
        assert_eq!(sigs[0].certificate_count(), 0);
    }

    #[test]
    fn test_missing_style_reads_as_empty() {
        let sigs = TocCodec::read_signatures("<signature><size>4</size></signature>");
        assert_eq!(sigs[0].style(), "");
        assert_eq!(sigs[0].length(), 4);
    }

    #[test]
    fn test_read_signature_from_caller_reader() {
        let xml = r#"<toc><signature style="RSA"><size>8</size></signature><after>1</after></toc>"#;
        let mut reader = Reader::from_str(xml);
        let mut parsed = None;
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) if e.local_name().as_ref() == b"signature" => {
                    parsed = Some(TocCodec::read_signature(&mut reader, &e));
                    break;
                },
                Event::Eof => break,
                _ => {},
            }
        }
        assert_eq!(parsed.unwrap().length(), 8);

        // The reader is left right after </signature>
        match reader.read_event().unwrap() {
            Event::Start(e) => assert_eq!(e.local_name().as_ref(), b"after"),
            other => panic!("unexpected event {:?}", other),
        }
    }
}
