//! Archive property tree.
//!
//! Archive-level TOC values (the TOC checksum location in particular) are
//! exposed as text looked up by slash-separated key, e.g. `checksum/offset`.

use indexmap::IndexMap;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Property key holding the byte length of the TOC checksum.
pub const CHECKSUM_SIZE_KEY: &str = "checksum/size";

/// Property key holding the heap offset of the TOC checksum.
pub const CHECKSUM_OFFSET_KEY: &str = "checksum/offset";

/// Parse the leading decimal digits of `text`.
///
/// Leading whitespace and a `+` sign are accepted, parsing stops at the
/// first non-digit, text without digits yields 0 and values past `u64::MAX`
/// saturate.
pub fn parse_decimal(text: &str) -> u64 {
    let trimmed = text.trim_start();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let mut value: u64 = 0;
    for byte in digits.bytes() {
        if !byte.is_ascii_digit() {
            break;
        }
        value = value
            .saturating_mul(10)
            .saturating_add(u64::from(byte - b'0'));
    }
    value
}

/// Insertion-ordered property tree keyed by slash-separated path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyTree {
    values: IndexMap<String, String>,
}

impl PropertyTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a property value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Look up a property and parse it as a decimal number.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).map(parse_decimal)
    }

    /// Set a property, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the tree holds no properties.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn insert_first(&mut self, key: String, value: String) {
        self.values.entry(key).or_insert(value);
    }

    /// Collect archive properties from a TOC document.
    ///
    /// Every text leaf below `<toc>` is stored under its path relative to
    /// `<toc>`; the first occurrence of a path wins. `file` and `signature`
    /// subtrees are not archive properties and are skipped.
    pub fn from_toc(xml: &str) -> Self {
        let mut tree = PropertyTree::new();
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        // Element path below <toc>; None until <toc> is entered
        let mut path: Option<Vec<String>> = None;
        let mut skip_depth = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                    if skip_depth > 0 {
                        skip_depth += 1;
                        continue;
                    }
                    let Some(stack) = path.as_mut() else {
                        if name == "toc" {
                            path = Some(Vec::new());
                        }
                        continue;
                    };
                    if name == "file" || name == "signature" {
                        skip_depth = 1;
                        continue;
                    }
                    stack.push(name);
                    if let Some(style) = style_attribute(&e) {
                        tree.insert_first(format!("{}/style", stack.join("/")), style);
                    }
                },
                Ok(Event::Empty(e)) => {
                    if skip_depth > 0 {
                        continue;
                    }
                    if let Some(stack) = path.as_ref() {
                        let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                        if name == "file" || name == "signature" {
                            continue;
                        }
                        let mut key = stack.clone();
                        key.push(name);
                        if let Some(style) = style_attribute(&e) {
                            tree.insert_first(format!("{}/style", key.join("/")), style);
                        }
                    }
                },
                Ok(Event::Text(e)) => {
                    if skip_depth > 0 {
                        continue;
                    }
                    if let Some(stack) = path.as_ref() {
                        if stack.is_empty() {
                            continue;
                        }
                        let text = e.unescape().unwrap_or_default().to_string();
                        tree.insert_first(stack.join("/"), text);
                    }
                },
                Ok(Event::End(_)) => {
                    if skip_depth > 0 {
                        skip_depth -= 1;
                        continue;
                    }
                    match path.as_mut() {
                        Some(stack) if stack.is_empty() => break,
                        Some(stack) => {
                            stack.pop();
                        },
                        None => {},
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    log::warn!("TOC property parsing error: {:?}", e);
                    break;
                },
                _ => {},
            }
        }

        tree
    }
}

/// Value of an element's `style` attribute.
pub(crate) fn style_attribute(e: &quick_xml::events::BytesStart<'_>) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == b"style" {
            return Some(match attr.unescape_value() {
                Ok(value) => value.to_string(),
                Err(_) => String::from_utf8_lossy(&attr.value).to_string(),
            });
        }
    }
    None
}
