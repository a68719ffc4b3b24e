//! Ranked retrieval over a finished [`InvertedIndex`].
//!
//! Two term-weighting functions are provided:
//!
//! ```text
//! W1 = (0.4 + 0.6 * ln(tf + 0.5) / ln(maxtf + 1)) * (ln(N / df) / ln(N))
//! W2 = 0.4 + 0.6 * (tf / (tf + 0.5 + 1.5 * doclen / avgdoclen)) * ln(N / df) / ln(N)
//! ```
//!
//! Both are 0.0 whenever they are undefined (`N <= 1`, `df == 0`, `maxtf == 0`,
//! `avgdoclen == 0`) or evaluate to a non-finite value. A query's score for a
//! document is the sum of the weights of the query terms it contains.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::index::{DocId, DocumentStats, InvertedIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weighting {
    W1,
    W2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Similarity {
    Cosine,
    Jaccard,
}

pub fn w1(tf: u32, max_tf: u32, df: u32, n: u32) -> f64 {
    checked_w1(tf, max_tf, df, n).unwrap_or(0.0)
}

pub fn w2(tf: u32, doc_len: u32, avg_doc_len: f64, df: u32, n: u32) -> f64 {
    checked_w2(tf, doc_len, avg_doc_len, df, n).unwrap_or(0.0)
}

fn checked_w1(tf: u32, max_tf: u32, df: u32, n: u32) -> Option<f64> {
    if max_tf == 0 || df == 0 || n <= 1 {
        return None;
    }
    let tf_part = 0.4 + 0.6 * (f64::from(tf) + 0.5).ln() / (f64::from(max_tf) + 1.0).ln();
    finite(tf_part * idf_ratio(df, n))
}

fn checked_w2(tf: u32, doc_len: u32, avg_doc_len: f64, df: u32, n: u32) -> Option<f64> {
    if df == 0 || n <= 1 || !(avg_doc_len > 0.0) {
        return None;
    }
    let tf = f64::from(tf);
    let norm = tf / (tf + 0.5 + 1.5 * (f64::from(doc_len) / avg_doc_len));
    finite(0.4 + 0.6 * norm * idf_ratio(df, n))
}

#[inline]
fn idf_ratio(df: u32, n: u32) -> f64 {
    (f64::from(n) / f64::from(df)).ln() / f64::from(n).ln()
}

#[inline]
fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Term counts of a single query, built the same way as a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryVector {
    terms: BTreeMap<String, u32>,
    length: u32,
}

impl QueryVector {
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut query = QueryVector::default();
        for term in terms {
            *query.terms.entry(term.as_ref().to_string()).or_insert(0) += 1;
            query.length += 1;
        }
        query
    }

    pub fn tf(&self, term: &str) -> u32 {
        self.terms.get(term).copied().unwrap_or(0)
    }

    pub fn max_tf(&self) -> u32 {
        self.terms.values().copied().max().unwrap_or(0)
    }

    /// Number of tokens, counting repeats.
    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.terms.iter().map(|(t, &tf)| (t.as_str(), tf))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDocument {
    pub rank: usize,
    pub score: f64,
    pub doc_id: DocId,
    pub headline: Option<String>,
}

/// Accumulated scores of one query.
#[derive(Debug, Clone, Default)]
pub struct QueryScores {
    pub totals: HashMap<DocId, f64>,
    /// Per document, the weight each query term contributed.
    pub contributions: HashMap<DocId, BTreeMap<String, f64>>,
}

pub struct Scorer<'a> {
    index: &'a InvertedIndex,
    n: u32,
    avg_doc_len: f64,
    forward: HashMap<DocId, Vec<(&'a str, u32)>>,
}

impl<'a> Scorer<'a> {
    pub fn new(index: &'a InvertedIndex) -> Self {
        let mut forward: HashMap<DocId, Vec<(&'a str, u32)>> = HashMap::new();
        for (term, props) in index.dictionary.iter() {
            for (&doc_id, &tf) in &props.postings {
                forward.entry(doc_id).or_default().push((term, tf));
            }
        }
        Self { index, n: index.num_docs(), avg_doc_len: index.average_doc_length(), forward }
    }

    pub fn num_docs(&self) -> u32 {
        self.n
    }

    pub fn average_doc_length(&self) -> f64 {
        self.avg_doc_len
    }

    pub fn weight(&self, scheme: Weighting, tf: u32, doc: &DocumentStats, df: u32) -> f64 {
        match scheme {
            Weighting::W1 => w1(tf, doc.max_tf, df, self.n),
            Weighting::W2 => w2(tf, doc.length, self.avg_doc_len, df, self.n),
        }
    }

    /// Sum the weights of every query term over the documents that contain it. Query
    /// terms missing from the dictionary are skipped.
    pub fn score(&self, query: &QueryVector, scheme: Weighting) -> QueryScores {
        let mut scores = QueryScores::default();
        for (term, _) in query.iter() {
            let Some(props) = self.index.dictionary.get(term) else {
                continue;
            };
            for (&doc_id, &tf) in &props.postings {
                let Some(doc) = self.index.doc(doc_id) else {
                    continue;
                };
                let w = self.weight(scheme, tf, doc, props.doc_freq);
                *scores.totals.entry(doc_id).or_insert(0.0) += w;
                *scores.contributions.entry(doc_id).or_default().entry(term.to_string()).or_insert(0.0) += w;
            }
        }
        scores
    }

    /// Weights of the query's own terms, treating the query as a document with corpus
    /// df, N and average length. Terms absent from the corpus weigh 0.0.
    pub fn query_weights(&self, query: &QueryVector, scheme: Weighting) -> BTreeMap<String, f64> {
        let as_doc = DocumentStats { length: query.length(), max_tf: query.max_tf(), headline: None };
        query
            .iter()
            .map(|(term, tf)| {
                let df = self.index.dictionary.get(term).map_or(0, |p| p.doc_freq);
                (term.to_string(), self.weight(scheme, tf, &as_doc, df))
            })
            .collect()
    }

    pub fn rank(&self, query: &QueryVector, scheme: Weighting, k: usize) -> Vec<RankedDocument> {
        let scores = self.score(query, scheme);
        self.ranked(top_k(scores.totals, k))
    }

    /// Cosine of the query and document vectors over the union of their terms. Query
    /// terms are weighted `(1 + log10 tf) * log10(N / df)`, document terms
    /// `1 + log10 tf`.
    pub fn cosine(&self, query: &QueryVector, doc_id: DocId) -> f64 {
        let doc_terms: HashMap<&str, u32> = self.doc_terms(doc_id).iter().copied().collect();
        let union: BTreeSet<&str> = query.iter().map(|(t, _)| t).chain(doc_terms.keys().copied()).collect();

        let (mut dot, mut q_norm, mut d_norm) = (0.0, 0.0, 0.0);
        for term in union {
            let q = self.query_tf_idf(term, query.tf(term));
            let d = log_tf(doc_terms.get(term).copied().unwrap_or(0));
            dot += q * d;
            q_norm += q * q;
            d_norm += d * d;
        }
        let denom = q_norm.sqrt() * d_norm.sqrt();
        if denom > 0.0 {
            finite(dot / denom).unwrap_or(0.0)
        } else {
            0.0
        }
    }

    pub fn jaccard(&self, query: &QueryVector, doc_id: DocId) -> f64 {
        let q: BTreeSet<&str> = query.iter().map(|(t, _)| t).collect();
        let d: BTreeSet<&str> = self.doc_terms(doc_id).iter().map(|(t, _)| *t).collect();
        jaccard_similarity(&q, &d)
    }

    /// Rank every document with a non-zero similarity to the query.
    pub fn rank_by_similarity(&self, query: &QueryVector, similarity: Similarity, k: usize) -> Vec<RankedDocument> {
        let scores = self.index.docs.keys().filter_map(|&doc_id| {
            let s = match similarity {
                Similarity::Cosine => self.cosine(query, doc_id),
                Similarity::Jaccard => self.jaccard(query, doc_id),
            };
            (s > 0.0).then_some((doc_id, s))
        });
        self.ranked(top_k(scores, k))
    }

    fn doc_terms(&self, doc_id: DocId) -> &[(&'a str, u32)] {
        self.forward.get(&doc_id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn query_tf_idf(&self, term: &str, tf: u32) -> f64 {
        let df = self.index.dictionary.get(term).map_or(0, |p| p.doc_freq);
        if df == 0 || self.n == 0 {
            return 0.0;
        }
        log_tf(tf) * (f64::from(self.n) / f64::from(df)).log10()
    }

    fn ranked(&self, top: Vec<(DocId, f64)>) -> Vec<RankedDocument> {
        top.into_iter()
            .enumerate()
            .map(|(i, (doc_id, score))| RankedDocument {
                rank: i + 1,
                score,
                doc_id,
                headline: self.index.doc(doc_id).and_then(|d| d.headline.clone()),
            })
            .collect()
    }
}

#[inline]
fn log_tf(tf: u32) -> f64 {
    if tf == 0 {
        0.0
    } else {
        1.0 + f64::from(tf).log10()
    }
}

/// `|a ∩ b| / |a ∪ b|`, or 0.0 for two empty sets.
pub fn jaccard_similarity<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Highest `k` scores, descending; equal scores are ordered by ascending doc id.
pub fn top_k(scores: impl IntoIterator<Item = (DocId, f64)>, k: usize) -> Vec<(DocId, f64)> {
    let mut scored: Vec<(DocId, f64)> = scores.into_iter().collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.truncate(k);
    scored
}
