//! Dictionary + postings compression.
//!
//! Each layout produces two parallel streams: a UTF-8 text dictionary (one line per
//! block or chunk) and a packed bit stream holding one postings group per term, in
//! dictionary-line order:
//!
//! ```text
//! df, then per posting (ascending doc id): gap, tf, doclen, max_tf
//! ```
//!
//! | layout        | term order | dictionary        | integer codec |
//! |---------------|------------|-------------------|---------------|
//! | `Blocked`     | ascending  | k-term blocks     | gamma         |
//! | `FrontCoded`  | ascending  | prefix chunks     | delta         |

pub mod blocked;
pub mod front_coded;
mod postings;

use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::bits::{BitReader, BitWriter};
use crate::codec::Codec;
use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::index::{Dictionary, DocId, DocumentStats, InvertedIndex, TermProperties};

pub use postings::DecodedPosting;

/// Separates a front-coded suffix length from its neighbours.
pub const SUFFIX_SEPARATOR: char = '◊';
/// Ends the shared prefix of a front-coded chunk.
pub const PREFIX_MARKER: char = '*';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    Blocked,
    FrontCoded,
}

impl Layout {
    pub fn codec(self) -> Codec {
        match self {
            Layout::Blocked => Codec::Gamma,
            Layout::FrontCoded => Codec::Delta,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Layout::Blocked => "blocked",
            Layout::FrontCoded => "front-coded",
        }
    }
}

/// The two streams of a compressed index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedIndex {
    pub layout: Layout,
    pub dictionary: String,
    pub postings: Vec<u8>,
}

impl CompressedIndex {
    pub fn size_bytes(&self) -> usize {
        self.dictionary.len() + self.postings.len()
    }
}

/// One decoded term with its full postings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermEntry {
    pub term: String,
    pub postings: Vec<DecodedPosting>,
}

pub fn compress(index: &InvertedIndex, layout: Layout, config: &IndexConfig) -> Result<CompressedIndex> {
    config.validate()?;
    let (dictionary, bits) = match layout {
        Layout::Blocked => blocked::encode(index, config)?,
        Layout::FrontCoded => front_coded::encode(index, config)?,
    };
    let postings_bits = bits.bit_len();
    let postings = bits.finish();
    tracing::info!(
        layout = layout.name(),
        num_terms = index.dictionary.len(),
        dictionary_bytes = dictionary.len(),
        postings_bits,
        postings_bytes = postings.len(),
        "compressed index"
    );
    Ok(CompressedIndex { layout, dictionary, postings })
}

/// Decode both streams into term entries, in dictionary-line order.
pub fn decode_entries(compressed: &CompressedIndex, config: &IndexConfig) -> Result<Vec<TermEntry>> {
    let terms = match compressed.layout {
        Layout::Blocked => blocked::decode_dictionary(&compressed.dictionary, config)?,
        Layout::FrontCoded => front_coded::decode_dictionary(&compressed.dictionary, config)?,
    };
    let codec = compressed.layout.codec();
    let mut reader = BitReader::new(&compressed.postings);
    let mut entries = Vec::with_capacity(terms.len());
    for term in terms {
        let postings = postings::decode_group(codec, &mut reader)?;
        entries.push(TermEntry { term, postings });
    }
    check_padding(&reader)?;
    Ok(entries)
}

/// Decode a compressed index back into an [`InvertedIndex`]. Headlines are not part
/// of the compressed streams and come back as `None`.
pub fn decompress(compressed: &CompressedIndex, config: &IndexConfig) -> Result<InvertedIndex> {
    let entries = decode_entries(compressed, config)?;
    let mut dictionary = Dictionary::new();
    let mut docs: BTreeMap<DocId, DocumentStats> = BTreeMap::new();
    let mut seen = std::collections::HashSet::new();

    for entry in entries {
        if !seen.insert(entry.term.clone()) {
            return Err(Error::corrupt(format!("term {:?} appears twice", entry.term)));
        }
        let mut props = TermProperties::default();
        for p in &entry.postings {
            props.postings.insert(p.doc_id, p.tf);
            match docs.entry(p.doc_id) {
                Entry::Vacant(e) => {
                    e.insert(DocumentStats { length: p.doc_len, max_tf: p.max_tf, headline: None });
                }
                Entry::Occupied(e) => {
                    let stats = e.get();
                    if stats.length != p.doc_len || stats.max_tf != p.max_tf {
                        return Err(Error::corrupt(format!(
                            "document {} has conflicting stats under term {:?}",
                            p.doc_id, entry.term
                        )));
                    }
                }
            }
        }
        props.doc_freq = props.postings.len() as u32;
        dictionary.insert(entry.term, props);
    }
    Ok(InvertedIndex { dictionary, docs })
}

/// Characters that carry structure in the text streams may not appear in terms, and a
/// leading digit would run into the preceding length field.
pub(crate) fn check_term(term: &str) -> Result<()> {
    let first = term.chars().next().ok_or_else(|| Error::invalid("empty term"))?;
    if first.is_ascii_digit() {
        return Err(Error::invalid(format!("term {term:?} starts with a digit")));
    }
    if term.contains(['\n', PREFIX_MARKER, SUFFIX_SEPARATOR]) {
        return Err(Error::invalid(format!("term {term:?} contains a reserved character")));
    }
    Ok(())
}

/// The final byte may only carry zero padding.
fn check_padding(reader: &BitReader<'_>) -> Result<()> {
    let remaining = reader.remaining();
    if remaining >= 8 {
        return Err(Error::corrupt(format!("{remaining} unread bits after the last postings group")));
    }
    let tail = reader.peek_bit_str(remaining)?;
    if tail.contains('1') {
        return Err(Error::corrupt("non-zero padding bits"));
    }
    Ok(())
}

fn encode_postings(index: &InvertedIndex, terms: &[&str], codec: Codec) -> Result<BitWriter> {
    let mut bits = BitWriter::new();
    for term in terms {
        let props = index
            .dictionary
            .get(term)
            .ok_or_else(|| Error::invalid(format!("term {term:?} not in dictionary")))?;
        postings::encode_group(codec, props, &index.docs, &mut bits)
            .map_err(|e| match e {
                Error::InvalidInput(msg) => Error::InvalidInput(format!("term {term:?}: {msg}")),
                other => other,
            })?;
    }
    Ok(bits)
}

/// Little cursor over the characters of one dictionary line.
struct LineCursor {
    chars: Vec<char>,
    pos: usize,
}

impl LineCursor {
    fn new(line: &str) -> Self {
        Self { chars: line.chars().collect(), pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn expect(&mut self, c: char) -> Result<()> {
        match self.peek() {
            Some(found) if found == c => {
                self.pos += 1;
                Ok(())
            }
            found => Err(Error::corrupt(format!("expected {c:?} at column {}, found {found:?}", self.pos))),
        }
    }

    fn number(&mut self) -> Result<usize> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(Error::corrupt(format!("expected a length at column {start}")));
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        digits.parse().map_err(|_| Error::corrupt(format!("length {digits} out of range")))
    }

    fn take(&mut self, n: usize) -> Result<String> {
        if self.chars.len() - self.pos < n {
            return Err(Error::corrupt(format!(
                "length {n} runs past the end of the line at column {}",
                self.pos
            )));
        }
        let s: String = self.chars[self.pos..self.pos + n].iter().collect();
        self.pos += n;
        Ok(s)
    }

    fn take_until(&mut self, stop: char) -> Option<String> {
        let rel = self.chars[self.pos..].iter().position(|&c| c == stop)?;
        let s: String = self.chars[self.pos..self.pos + rel].iter().collect();
        self.pos += rel;
        Some(s)
    }
}

/// Every block or chunk holds exactly `size` terms except the last, which may hold fewer.
fn check_group_size(kind: &str, line_no: usize, len: usize, size: usize, is_last: bool) -> Result<()> {
    if len > size || (!is_last && len != size) {
        return Err(Error::corrupt(format!("{kind} {line_no} holds {len} terms, expected {size}")));
    }
    Ok(())
}

/// Append decoded terms, requiring strictly ascending order across the whole stream.
fn extend_sorted(terms: &mut Vec<String>, group: Vec<String>) -> Result<()> {
    for term in group {
        if terms.last().is_some_and(|prev| *prev >= term) {
            return Err(Error::corrupt(format!("term {term:?} is out of sorted order")));
        }
        terms.push(term);
    }
    Ok(())
}

/// Split a dictionary stream into lines, rejecting a missing final newline.
fn dictionary_lines(text: &str) -> Result<impl Iterator<Item = &str>> {
    if !text.is_empty() && !text.ends_with('\n') {
        return Err(Error::corrupt("dictionary stream does not end with a newline"));
    }
    Ok(text.split_terminator('\n'))
}
