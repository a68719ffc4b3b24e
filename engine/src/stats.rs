//! Collection characteristics reported after a build.

use serde::Serialize;

use crate::index::{Dictionary, DocId, InvertedIndex, TermProperties};

/// Bytes per uncompressed posting: doc id, tf, doclen and max_tf as `u32`.
pub const UNCOMPRESSED_POSTING_BYTES: usize = 4 * std::mem::size_of::<u32>();

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermSummary {
    pub term: String,
    pub total_tf: u64,
    pub doc_freq: u32,
    pub list_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PostingDetail {
    pub doc_id: DocId,
    pub tf: u32,
    pub max_tf: u32,
    pub doc_len: u32,
}

/// The extreme value and every key that reaches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extremes<K> {
    pub value: u32,
    pub keys: Vec<K>,
}

fn extremes<K, I>(items: I, prefer: impl Fn(u32, u32) -> bool) -> Option<Extremes<K>>
where
    I: IntoIterator<Item = (K, u32)>,
{
    let mut best: Option<Extremes<K>> = None;
    for (key, value) in items {
        match best.as_mut() {
            Some(b) if b.value == value => {
                b.keys.push(key);
                continue;
            }
            Some(b) if !prefer(value, b.value) => continue,
            _ => {}
        }
        best = Some(Extremes { value, keys: vec![key] });
    }
    best
}

pub fn terms_with_largest_df(dictionary: &Dictionary) -> Option<Extremes<String>> {
    extremes(dictionary.iter().map(|(t, p)| (t.to_string(), p.doc_freq)), |a, b| a > b)
}

pub fn terms_with_smallest_df(dictionary: &Dictionary) -> Option<Extremes<String>> {
    extremes(dictionary.iter().map(|(t, p)| (t.to_string(), p.doc_freq)), |a, b| a < b)
}

pub fn docs_with_largest_max_tf(index: &InvertedIndex) -> Option<Extremes<DocId>> {
    extremes(index.docs.iter().map(|(&d, s)| (d, s.max_tf)), |a, b| a > b)
}

pub fn docs_with_largest_length(index: &InvertedIndex) -> Option<Extremes<DocId>> {
    extremes(index.docs.iter().map(|(&d, s)| (d, s.length)), |a, b| a > b)
}

pub fn list_bytes(props: &TermProperties) -> usize {
    props.postings.len() * UNCOMPRESSED_POSTING_BYTES
}

/// Summaries for the requested terms that exist in the dictionary, in request order.
pub fn term_summaries<'t>(dictionary: &Dictionary, terms: impl IntoIterator<Item = &'t str>) -> Vec<TermSummary> {
    terms
        .into_iter()
        .filter_map(|term| {
            dictionary.get(term).map(|p| TermSummary {
                term: term.to_string(),
                total_tf: p.total_tf(),
                doc_freq: p.doc_freq,
                list_bytes: list_bytes(p),
            })
        })
        .collect()
}

/// The first `n` postings of `term` in doc id order with their document stats.
pub fn first_postings(index: &InvertedIndex, term: &str, n: usize) -> Vec<PostingDetail> {
    index
        .dictionary
        .postings(term)
        .take(n)
        .map(|p| {
            let stats = index.doc(p.doc_id);
            PostingDetail {
                doc_id: p.doc_id,
                tf: p.tf,
                max_tf: stats.map_or(0, |s| s.max_tf),
                doc_len: stats.map_or(0, |s| s.length),
            }
        })
        .collect()
}

/// Terms whose total frequency across the collection is exactly one, in term order.
pub fn terms_occurring_once(dictionary: &Dictionary) -> Vec<String> {
    dictionary.iter().filter(|(_, p)| p.total_tf() == 1).map(|(t, _)| t.to_string()).collect()
}

/// The `n` terms with the highest total frequency, descending; ties in term order.
pub fn most_frequent_terms(dictionary: &Dictionary, n: usize) -> Vec<(String, u64)> {
    let mut terms: Vec<(&str, u64)> = dictionary.iter().map(|(t, p)| (t, p.total_tf())).collect();
    terms.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    terms.into_iter().take(n).map(|(t, tf)| (t.to_string(), tf)).collect()
}

/// Size of the uncompressed postings of the whole dictionary plus its term strings.
pub fn uncompressed_bytes(dictionary: &Dictionary) -> usize {
    dictionary.iter().map(|(t, p)| t.len() + std::mem::size_of::<u32>() + list_bytes(p)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexBuilder;

    fn sample() -> InvertedIndex {
        let mut b = IndexBuilder::new();
        b.add_document(1, None, ["flow", "flow", "shock"]).unwrap();
        b.add_document(2, None, ["flow", "nasa", "boundary", "shock"]).unwrap();
        b.add_document(3, None, ["pressure", "pressure"]).unwrap();
        b.finish().unwrap()
    }

    #[test]
    fn df_extremes_keep_ties() {
        let index = sample();
        let largest = terms_with_largest_df(&index.dictionary).unwrap();
        assert_eq!(largest.value, 2);
        assert_eq!(largest.keys, vec!["flow", "shock"]);

        let smallest = terms_with_smallest_df(&index.dictionary).unwrap();
        assert_eq!(smallest.value, 1);
        assert_eq!(smallest.keys, vec!["boundary", "nasa", "pressure"]);
    }

    #[test]
    fn document_extremes() {
        let index = sample();
        assert_eq!(docs_with_largest_max_tf(&index).unwrap(), Extremes { value: 2, keys: vec![1, 3] });
        assert_eq!(docs_with_largest_length(&index).unwrap(), Extremes { value: 4, keys: vec![2] });
        assert!(docs_with_largest_length(&InvertedIndex::new()).is_none());
    }

    #[test]
    fn summaries_skip_unknown_terms() {
        let index = sample();
        let rows = term_summaries(&index.dictionary, ["flow", "reynolds"]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_tf, 3);
        assert_eq!(rows[0].doc_freq, 2);
        assert_eq!(rows[0].list_bytes, 2 * UNCOMPRESSED_POSTING_BYTES);
    }

    #[test]
    fn frequency_counts() {
        let index = sample();
        assert_eq!(terms_occurring_once(&index.dictionary), vec!["boundary", "nasa"]);
        assert_eq!(
            most_frequent_terms(&index.dictionary, 3),
            vec![("flow".to_string(), 3), ("pressure".to_string(), 2), ("shock".to_string(), 2)]
        );
        assert_eq!(most_frequent_terms(&index.dictionary, 30).len(), 5);
        assert!(most_frequent_terms(&InvertedIndex::new().dictionary, 30).is_empty());
    }

    #[test]
    fn first_postings_are_in_doc_order() {
        let index = sample();
        let rows = first_postings(&index, "flow", 3);
        assert_eq!(
            rows,
            vec![
                PostingDetail { doc_id: 1, tf: 2, max_tf: 2, doc_len: 3 },
                PostingDetail { doc_id: 2, tf: 1, max_tf: 1, doc_len: 4 },
            ]
        );
    }
}
