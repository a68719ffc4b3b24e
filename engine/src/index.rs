use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};

/// Document identifier. `DocId::MAX` is reserved: the first postings gap is written as
/// `doc_id + 1` and must stay within 32 bits.
pub type DocId = u32;

/// Per-document statistics, written while the document is scanned and frozen afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    /// Number of non-stopword tokens.
    pub length: u32,
    /// Largest term frequency of any term in the document.
    pub max_tf: u32,
    pub headline: Option<String>,
}

/// A term's document frequency and postings (doc id -> term frequency, ascending doc id).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermProperties {
    pub doc_freq: u32,
    pub postings: BTreeMap<DocId, u32>,
}

impl TermProperties {
    pub fn total_tf(&self) -> u64 {
        self.postings.values().map(|&tf| u64::from(tf)).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub tf: u32,
}

/// Term -> properties, iterated in ascending term order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    terms: BTreeMap<String, TermProperties>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, term: &str) -> Option<&TermProperties> {
        self.terms.get(term)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains_key(term)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TermProperties)> {
        self.terms.iter().map(|(t, p)| (t.as_str(), p))
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().map(String::as_str)
    }

    pub fn postings(&self, term: &str) -> impl Iterator<Item = Posting> + '_ {
        self.terms
            .get(term)
            .into_iter()
            .flat_map(|p| p.postings.iter().map(|(&doc_id, &tf)| Posting { doc_id, tf }))
    }

    /// Record `tf` occurrences of `term` in `doc_id`. A new document for the term bumps
    /// its document frequency; a repeated one only adds to the term frequency.
    pub(crate) fn add_posting(&mut self, term: &str, doc_id: DocId, tf: u32) {
        let props = self.terms.entry(term.to_string()).or_default();
        match props.postings.entry(doc_id) {
            Entry::Vacant(e) => {
                e.insert(tf);
                props.doc_freq += 1;
            }
            Entry::Occupied(mut e) => *e.get_mut() += tf,
        }
    }

    pub(crate) fn insert(&mut self, term: String, props: TermProperties) {
        self.terms.insert(term, props);
    }
}

/// Token positions per term and document, in reading order. Only recorded when the
/// builder is created with [`IndexBuilder::with_positions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermPositions {
    terms: BTreeMap<String, BTreeMap<DocId, Vec<u32>>>,
}

impl TermPositions {
    pub fn get(&self, term: &str) -> Option<&BTreeMap<DocId, Vec<u32>>> {
        self.terms.get(term)
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn push(&mut self, term: &str, doc_id: DocId, position: u32) {
        self.terms
            .entry(term.to_string())
            .or_default()
            .entry(doc_id).or_default().push(position);
    }
}

/// A finished index: the dictionary plus the collection-wide document statistics it
/// refers to by doc id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndex {
    pub dictionary: Dictionary,
    pub docs: BTreeMap<DocId, DocumentStats>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct documents, N.
    pub fn num_docs(&self) -> u32 {
        self.docs.len() as u32
    }

    pub fn average_doc_length(&self) -> f64 {
        if self.docs.is_empty() {
            return 0.0;
        }
        let total: u64 = self.docs.values().map(|d| u64::from(d.length)).sum();
        total as f64 / self.docs.len() as f64
    }

    pub fn doc(&self, doc_id: DocId) -> Option<&DocumentStats> {
        self.docs.get(&doc_id)
    }

    /// Check `doc_freq == postings.len()` for every term and that every posted document
    /// has stats.
    pub fn validate(&self) -> Result<()> {
        for (term, props) in self.dictionary.iter() {
            if props.doc_freq as usize != props.postings.len() {
                return Err(Error::invalid(format!(
                    "term {term:?}: doc_freq {} but {} postings",
                    props.doc_freq,
                    props.postings.len()
                )));
            }
            if let Some(doc_id) = props.postings.keys().find(|d| !self.docs.contains_key(d)) {
                return Err(Error::invalid(format!("term {term:?} posts unknown document {doc_id}")));
            }
        }
        Ok(())
    }

    /// Combine two shard indexes. Postings are unioned, term frequencies of a document
    /// present in both are summed, and doc stats for such a document are recombined.
    pub fn merge(mut self, other: InvertedIndex) -> InvertedIndex {
        let mut shared = Vec::new();
        for (doc_id, stats) in other.docs {
            match self.docs.entry(doc_id) {
                Entry::Vacant(e) => {
                    e.insert(stats);
                }
                Entry::Occupied(mut e) => {
                    let mine = e.get_mut();
                    mine.length += stats.length;
                    if mine.headline.is_none() {
                        mine.headline = stats.headline;
                    }
                    shared.push(doc_id);
                }
            }
        }

        for (term, props) in other.dictionary.terms {
            for (doc_id, tf) in props.postings {
                self.dictionary.add_posting(&term, doc_id, tf);
            }
        }

        for doc_id in shared {
            let max_tf = self
                .dictionary
                .iter()
                .filter_map(|(_, p)| p.postings.get(&doc_id).copied())
                .max()
                .unwrap_or(0);
            if let Some(stats) = self.docs.get_mut(&doc_id) {
                stats.max_tf = max_tf;
            }
        }
        self
    }
}

/// Single-pass builder fed one document at a time.
///
/// Term counts for the open document are buffered and folded into the dictionary by
/// [`IndexBuilder::end_document`], which is also where `max_tf` is fixed.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    index: InvertedIndex,
    current: Option<OpenDocument>,
    last_doc: Option<DocId>,
    positions: Option<TermPositions>,
}

#[derive(Debug)]
struct OpenDocument {
    doc_id: DocId,
    headline: Option<String>,
    counts: HashMap<String, u32>,
    length: u32,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder that also records the position of every added term.
    pub fn with_positions() -> Self {
        Self { positions: Some(TermPositions::default()), ..Self::default() }
    }

    pub fn begin_document(&mut self, doc_id: DocId, headline: Option<String>) -> Result<()> {
        if let Some(open) = &self.current {
            return Err(Error::invalid(format!(
                "document {doc_id} started while document {} is still open",
                open.doc_id
            )));
        }
        if doc_id == DocId::MAX {
            return Err(Error::invalid(format!("document id {doc_id} is reserved")));
        }
        if let Some(last) = self.last_doc {
            if doc_id <= last {
                return Err(Error::invalid(format!(
                    "document ids must be strictly increasing: {doc_id} after {last}"
                )));
            }
        }
        self.current = Some(OpenDocument { doc_id, headline, counts: HashMap::new(), length: 0 });
        Ok(())
    }

    /// Add one (already normalised, non-stopword) token to the open document.
    pub fn add_term(&mut self, term: &str) -> Result<()> {
        let open = self
            .current
            .as_mut()
            .ok_or_else(|| Error::invalid(format!("term {term:?} added outside a document")))?;
        match open.counts.get_mut(term) {
            Some(c) => *c += 1,
            None => {
                open.counts.insert(term.to_string(), 1);
            }
        }
        if let Some(positions) = self.positions.as_mut() {
            positions.push(term, open.doc_id, open.length);
        }
        open.length += 1;
        Ok(())
    }

    pub fn end_document(&mut self) -> Result<()> {
        let open = self.current.take().ok_or_else(|| Error::invalid("no open document to end"))?;
        let max_tf = open.counts.values().copied().max().unwrap_or(0);
        for (term, tf) in &open.counts {
            self.index.dictionary.add_posting(term, open.doc_id, *tf);
        }
        tracing::trace!(doc_id = open.doc_id, length = open.length, max_tf, "document indexed");
        self.index
            .docs
            .insert(open.doc_id, DocumentStats { length: open.length, max_tf, headline: open.headline });
        self.last_doc = Some(open.doc_id);
        Ok(())
    }

    pub fn add_document<I, S>(&mut self, doc_id: DocId, headline: Option<String>, terms: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.begin_document(doc_id, headline)?;
        for term in terms {
            self.add_term(term.as_ref())?;
        }
        self.end_document()
    }

    pub fn num_docs(&self) -> usize {
        self.index.docs.len()
    }

    pub fn finish(self) -> Result<InvertedIndex> {
        self.finish_with_positions().map(|(index, _)| index)
    }

    /// Like [`IndexBuilder::finish`], also returning the recorded positions (empty unless
    /// built with [`IndexBuilder::with_positions`]).
    pub fn finish_with_positions(mut self) -> Result<(InvertedIndex, TermPositions)> {
        if self.current.is_some() {
            self.end_document()?;
        }
        tracing::debug!(
            num_docs = self.index.docs.len(),
            num_terms = self.index.dictionary.len(),
            "index built"
        );
        Ok((self.index, self.positions.unwrap_or_default()))
    }
}
