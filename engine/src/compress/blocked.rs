//! Blocked dictionary storage with gamma-coded postings.
//!
//! Terms are taken in ascending order and grouped `block_size` at a time. Each block
//! is one line: `<len><term>` for every term, then the decimal character count of the
//! block's concatenated terms. With k = 3:
//!
//! ```text
//! 3cat3dog4emus10
//! ```

use std::fmt::Write;

use super::{check_group_size, check_term, dictionary_lines, encode_postings, extend_sorted, LineCursor};
use crate::bits::BitWriter;
use crate::codec::Codec;
use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::index::InvertedIndex;

pub fn encode(index: &InvertedIndex, config: &IndexConfig) -> Result<(String, BitWriter)> {
    let terms: Vec<&str> = index.dictionary.terms().collect();
    let mut text = String::new();
    for block in terms.chunks(config.block_size) {
        let mut total = 0usize;
        for term in block {
            check_term(term)?;
            let len = term.chars().count();
            total += len;
            // Writing to a String cannot fail.
            let _ = write!(text, "{len}{term}");
        }
        let _ = writeln!(text, "{total}");
        tracing::debug!(first = block[0], terms = block.len(), chars = total, "block written");
    }
    let bits = encode_postings(index, &terms, Codec::Gamma)?;
    Ok((text, bits))
}

pub fn decode_dictionary(text: &str, config: &IndexConfig) -> Result<Vec<String>> {
    let lines: Vec<&str> = dictionary_lines(text)?.collect();
    let mut terms = Vec::new();
    for (line_no, line) in lines.iter().enumerate() {
        let block = decode_block(line).map_err(|e| match e {
            Error::CorruptDictionary(msg) => Error::corrupt(format!("block {line_no}: {msg}")),
            other => other,
        })?;
        check_group_size("block", line_no, block.len(), config.block_size, line_no + 1 == lines.len())?;
        extend_sorted(&mut terms, block)?;
    }
    Ok(terms)
}

fn decode_block(line: &str) -> Result<Vec<String>> {
    let mut cursor = LineCursor::new(line);
    let mut terms = Vec::new();
    let mut sum = 0usize;
    loop {
        let n = cursor.number()?;
        if cursor.at_end() {
            // The trailing number is the block's character count.
            if terms.is_empty() {
                return Err(Error::corrupt("block without terms"));
            }
            if n != sum {
                return Err(Error::corrupt(format!("block length {n} but terms add up to {sum}")));
            }
            return Ok(terms);
        }
        if n == 0 {
            return Err(Error::corrupt("zero-length term"));
        }
        let term = cursor.take(n)?;
        sum += n;
        terms.push(term);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexBuilder;

    fn index_of(terms: &[&str]) -> InvertedIndex {
        let mut b = IndexBuilder::new();
        b.add_document(1, None, terms.iter().copied()).unwrap();
        b.finish().unwrap()
    }

    #[test]
    fn writes_one_line_per_block() {
        let config = IndexConfig { block_size: 3, ..IndexConfig::default() };
        let index = index_of(&["emus", "dog", "cat", "yak"]);
        let (text, _) = encode(&index, &config).unwrap();
        assert_eq!(text, "3cat3dog4emus10\n3yak3\n");
        assert_eq!(decode_dictionary(&text, &config).unwrap(), vec!["cat", "dog", "emus", "yak"]);
    }

    #[test]
    fn default_blocks_hold_eight_terms() {
        let words = ["a", "b", "c", "d", "e", "f", "g", "h", "i"];
        let (text, _) = encode(&index_of(&words), &IndexConfig::default()).unwrap();
        assert_eq!(text, "1a1b1c1d1e1f1g1h8\n1i1\n");
    }

    #[test]
    fn terms_with_inner_digits_survive() {
        let config = IndexConfig::default();
        let (text, _) = encode(&index_of(&["b747", "x1"]), &config).unwrap();
        assert_eq!(text, "4b7472x16\n");
        assert_eq!(decode_dictionary(&text, &config).unwrap(), vec!["b747", "x1"]);
    }

    #[test]
    fn non_ascii_lengths_count_characters() {
        let config = IndexConfig::default();
        let (text, _) = encode(&index_of(&["café"]), &config).unwrap();
        assert_eq!(text, "4café4\n");
        assert_eq!(decode_dictionary(&text, &config).unwrap(), vec!["café"]);
    }

    #[test]
    fn length_mismatch_is_corrupt() {
        let config = IndexConfig::default();
        assert!(matches!(decode_dictionary("3cat3dog7\n", &config), Err(Error::CorruptDictionary(_))));
        assert!(matches!(decode_dictionary("5cat3\n", &config), Err(Error::CorruptDictionary(_))));
        assert!(matches!(decode_dictionary("3cat3", &config), Err(Error::CorruptDictionary(_))));
        assert!(matches!(decode_dictionary("cat3\n", &config), Err(Error::CorruptDictionary(_))));
    }

    #[test]
    fn oversized_block_is_corrupt() {
        let config = IndexConfig { block_size: 1, ..IndexConfig::default() };
        assert!(matches!(decode_dictionary("1a1b2\n", &config), Err(Error::CorruptDictionary(_))));
    }

    #[test]
    fn short_middle_block_is_corrupt() {
        let config = IndexConfig { block_size: 2, ..IndexConfig::default() };
        assert_eq!(decode_dictionary("1a1b2\n1c1\n", &config).unwrap(), vec!["a", "b", "c"]);
        assert!(matches!(decode_dictionary("1a1\n1b1c2\n", &config), Err(Error::CorruptDictionary(_))));
    }

    #[test]
    fn unsorted_blocks_are_corrupt() {
        let config = IndexConfig { block_size: 2, ..IndexConfig::default() };
        assert!(matches!(decode_dictionary("1c1d2\n1a1b2\n", &config), Err(Error::CorruptDictionary(_))));
        assert!(matches!(decode_dictionary("1b1a2\n", &config), Err(Error::CorruptDictionary(_))));
        assert!(matches!(decode_dictionary("1a1a2\n", &config), Err(Error::CorruptDictionary(_))));
    }
}
