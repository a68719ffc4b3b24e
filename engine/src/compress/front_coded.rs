//! Front-coded dictionary with delta-coded postings.
//!
//! Terms are sorted and cut into chunks of `front_coding_chunk`. A chunk whose terms
//! all share a prefix of at least `min_shared_prefix` characters is written as
//!
//! ```text
//! 8automat*a◊1◊e◊2◊ic◊3◊ion
//! ```
//!
//! i.e. the first term's length, the prefix, `*`, the first suffix, then for every
//! other term its suffix length and suffix between separators. Other chunks fall back
//! to `<len><term>` per term. One chunk per line.

use std::fmt::Write;

use super::{
    check_group_size, check_term, dictionary_lines, encode_postings, extend_sorted, LineCursor, PREFIX_MARKER,
    SUFFIX_SEPARATOR,
};
use crate::bits::BitWriter;
use crate::codec::Codec;
use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::index::InvertedIndex;

pub fn encode(index: &InvertedIndex, config: &IndexConfig) -> Result<(String, BitWriter)> {
    let mut terms: Vec<&str> = index.dictionary.terms().collect();
    terms.sort_unstable();
    for term in &terms {
        check_term(term)?;
    }

    let mut text = String::new();
    for chunk in terms.chunks(config.front_coding_chunk) {
        let chars: Vec<Vec<char>> = chunk.iter().map(|t| t.chars().collect()).collect();
        let prefix_len = common_prefix_len(&chars);
        if chunk.len() >= 2 && prefix_len >= config.min_shared_prefix {
            write_prefixed(&mut text, &chars, prefix_len);
        } else {
            for term in chunk {
                let _ = write!(text, "{}{}", term.chars().count(), term);
            }
        }
        text.push('\n');
        tracing::debug!(first = chunk[0], terms = chunk.len(), prefix_len, "chunk written");
    }

    let bits = encode_postings(index, &terms, Codec::Delta)?;
    Ok((text, bits))
}

fn common_prefix_len(terms: &[Vec<char>]) -> usize {
    let Some((first, rest)) = terms.split_first() else {
        return 0;
    };
    let mut len = first.len();
    for term in rest {
        len = len.min(first.iter().zip(term).take_while(|(a, b)| a == b).count());
    }
    len
}

fn write_prefixed(text: &mut String, terms: &[Vec<char>], prefix_len: usize) {
    let first = &terms[0];
    let prefix: String = first[..prefix_len].iter().collect();
    let suffix: String = first[prefix_len..].iter().collect();
    let _ = write!(text, "{}{prefix}{PREFIX_MARKER}{suffix}", first.len());
    for term in &terms[1..] {
        let suffix: String = term[prefix_len..].iter().collect();
        let _ = write!(text, "{SUFFIX_SEPARATOR}{}{SUFFIX_SEPARATOR}{suffix}", term.len() - prefix_len);
    }
}

pub fn decode_dictionary(text: &str, config: &IndexConfig) -> Result<Vec<String>> {
    let lines: Vec<&str> = dictionary_lines(text)?.collect();
    let mut terms: Vec<String> = Vec::new();
    for (line_no, line) in lines.iter().enumerate() {
        let decoded = if line.contains(PREFIX_MARKER) {
            decode_prefixed(line, config.min_shared_prefix)
        } else {
            decode_plain(line)
        };
        let chunk = decoded.map_err(|e| match e {
            Error::CorruptDictionary(msg) => Error::corrupt(format!("chunk {line_no}: {msg}")),
            other => other,
        })?;
        check_group_size("chunk", line_no, chunk.len(), config.front_coding_chunk, line_no + 1 == lines.len())?;
        extend_sorted(&mut terms, chunk)?;
    }
    Ok(terms)
}

fn decode_plain(line: &str) -> Result<Vec<String>> {
    let mut cursor = LineCursor::new(line);
    let mut terms = Vec::new();
    while !cursor.at_end() {
        let n = cursor.number()?;
        if n == 0 {
            return Err(Error::corrupt("zero-length term"));
        }
        let term = cursor.take(n)?;
        if term.contains(SUFFIX_SEPARATOR) {
            return Err(Error::corrupt(format!("term length {n} swallows a separator")));
        }
        terms.push(term);
    }
    if terms.is_empty() {
        return Err(Error::corrupt("empty chunk"));
    }
    Ok(terms)
}

fn decode_prefixed(line: &str, min_shared_prefix: usize) -> Result<Vec<String>> {
    let mut cursor = LineCursor::new(line);
    let first_len = cursor.number()?;
    let prefix = cursor
        .take_until(PREFIX_MARKER)
        .ok_or_else(|| Error::corrupt("missing prefix marker"))?;
    cursor.expect(PREFIX_MARKER)?;

    let prefix_len = prefix.chars().count();
    if prefix_len < min_shared_prefix {
        return Err(Error::corrupt(format!("shared prefix {prefix:?} shorter than {min_shared_prefix}")));
    }
    if prefix.contains(SUFFIX_SEPARATOR) {
        return Err(Error::corrupt("separator inside shared prefix"));
    }
    let first_suffix_len = first_len
        .checked_sub(prefix_len)
        .ok_or_else(|| Error::corrupt(format!("term length {first_len} shorter than prefix {prefix:?}")))?;

    let mut terms = vec![format!("{prefix}{}", suffix(&mut cursor, first_suffix_len)?)];
    while !cursor.at_end() {
        cursor.expect(SUFFIX_SEPARATOR)?;
        let n = cursor.number()?;
        cursor.expect(SUFFIX_SEPARATOR)?;
        terms.push(format!("{prefix}{}", suffix(&mut cursor, n)?));
    }
    Ok(terms)
}

fn suffix(cursor: &mut LineCursor, len: usize) -> Result<String> {
    let s = cursor.take(len)?;
    if s.contains([SUFFIX_SEPARATOR, PREFIX_MARKER]) {
        return Err(Error::corrupt(format!("suffix length {len} overruns into a separator")));
    }
    Ok(s)
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
    fn textbook_chunk() {
        let config = IndexConfig::default();
        let index = index_of(&["automation", "automatic", "automate", "automata"]);
        let (text, _) = encode(&index, &config).unwrap();
        assert_eq!(text, "8automat*a◊1◊e◊2◊ic◊3◊ion\n");
        assert_eq!(
            decode_dictionary(&text, &config).unwrap(),
            vec!["automata", "automate", "automatic", "automation"]
        );
    }

    #[test]
    fn chunk_without_shared_prefix_falls_back() {
        let config = IndexConfig::default();
        let index = index_of(&["apple", "apricot", "banana", "cherry", "date"]);
        let (text, _) = encode(&index, &config).unwrap();
        assert_eq!(text, "5apple7apricot6banana6cherry\n4date\n");
        assert_eq!(decode_dictionary(&text, &config).unwrap().len(), 5);
    }

    #[test]
    fn one_character_prefix_is_not_enough() {
        let config = IndexConfig::default();
        let (text, _) = encode(&index_of(&["ab", "ac"]), &config).unwrap();
        assert_eq!(text, "2ab2ac\n");
    }

    #[test]
    fn term_equal_to_prefix_has_empty_suffix() {
        let config = IndexConfig::default();
        let (text, _) = encode(&index_of(&["flow", "flows", "flowing"]), &config).unwrap();
        assert_eq!(text, "4flow*◊3◊ing◊1◊s\n");
        assert_eq!(decode_dictionary(&text, &config).unwrap(), vec!["flow", "flowing", "flows"]);
    }

    #[test]
    fn suffix_may_start_with_digit() {
        let config = IndexConfig::default();
        let (text, _) = encode(&index_of(&["mach2", "mach3"]), &config).unwrap();
        assert_eq!(text, "5mach*2◊1◊3\n");
        assert_eq!(decode_dictionary(&text, &config).unwrap(), vec!["mach2", "mach3"]);
    }

    #[test]
    fn prefix_length_mismatch_is_corrupt() {
        let config = IndexConfig::default();
        // first term claims 3 chars but the prefix alone has 7
        assert!(matches!(decode_dictionary("3automat*a\n", &config), Err(Error::CorruptDictionary(_))));
        // suffix length runs into the next separator
        assert!(matches!(decode_dictionary("8automat*a◊3◊e◊2◊ic\n", &config), Err(Error::CorruptDictionary(_))));
        // suffix length longer than the line
        assert!(matches!(decode_dictionary("8automat*a◊9◊e\n", &config), Err(Error::CorruptDictionary(_))));
        // prefix too short
        assert!(matches!(decode_dictionary("2a*b◊1◊c\n", &config), Err(Error::CorruptDictionary(_))));
        // missing separator
        assert!(matches!(decode_dictionary("8automat*a1◊e\n", &config), Err(Error::CorruptDictionary(_))));
    }

    #[test]
    fn unsorted_stream_is_corrupt() {
        let config = IndexConfig::default();
        let text = "3dog3eel3fox3gnu\n3cat\n";
        assert!(matches!(decode_dictionary(text, &config), Err(Error::CorruptDictionary(_))));
    }

    #[test]
    fn short_middle_chunk_is_corrupt() {
        let config = IndexConfig::default();
        assert!(matches!(decode_dictionary("3cat\n3dog3eel3fox3gnu\n", &config), Err(Error::CorruptDictionary(_))));
    }

    #[test]
    fn prefix_length_of_sorted_chunk() {
        let chars: Vec<Vec<char>> = ["interest", "interim", "internal"].iter().map(|t| t.chars().collect()).collect();
        assert_eq!(common_prefix_len(&chars), 5);
        assert_eq!(common_prefix_len(&[]), 0);
    }
}
