//! Query expansion with metric clusters.
//!
//! Surface terms are grouped by their normalised form (usually the stem). The
//! correlation of two stems `u` and `v` is
//!
//! ```text
//! c(u, v) = sum over forms s of u, t of v, shared documents d,
//!           positions p of s in d and q of t in d:  1 / |p - q|
//! ```
//!
//! normalised by `|forms(u)| * |forms(v)|`. A query stem is expanded with the stems
//! most correlated with it, other query stems excluded.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::index::TermPositions;

/// Neighbours added per query stem by default.
pub const EXPANSION_TERMS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expansion {
    pub stem: String,
    /// Correlated stems with their normalised correlation, strongest first.
    pub neighbours: Vec<(String, f64)>,
}

pub struct MetricClusters<'a> {
    positions: &'a TermPositions,
    forms: BTreeMap<String, Vec<&'a str>>,
}

impl<'a> MetricClusters<'a> {
    pub fn new(positions: &'a TermPositions, normalize: impl Fn(&str) -> String) -> Self {
        let mut forms: BTreeMap<String, Vec<&'a str>> = BTreeMap::new();
        for term in positions.terms() {
            forms.entry(normalize(term)).or_default().push(term);
        }
        Self { positions, forms }
    }

    pub fn num_stems(&self) -> usize {
        self.forms.len()
    }

    /// Surface forms of `stem` in term order.
    pub fn forms(&self, stem: &str) -> &[&'a str] {
        self.forms.get(stem).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Unnormalised `c(u, v)`.
    pub fn correlation(&self, u: &str, v: &str) -> f64 {
        let mut total = 0.0;
        for s in self.forms(u) {
            for t in self.forms(v) {
                total += self.form_correlation(s, t);
            }
        }
        total
    }

    pub fn normalized_correlation(&self, u: &str, v: &str) -> f64 {
        let size = self.forms(u).len() * self.forms(v).len();
        if size == 0 {
            return 0.0;
        }
        self.correlation(u, v) / size as f64
    }

    /// For every distinct query stem, in query order, the `n` stems with the highest
    /// positive normalised correlation. Ties are broken by stem order.
    pub fn expand<I, S>(&self, query_stems: I, n: usize) -> Vec<Expansion>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = BTreeSet::new();
        let stems: Vec<String> = query_stems
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .filter(|s| seen.insert(s.clone()))
            .collect();

        stems
            .iter()
            .map(|u| {
                let mut scored: Vec<(String, f64)> = if self.forms.contains_key(u) {
                    self.forms
                        .keys()
                        .filter(|v| !seen.contains(*v))
                        .filter_map(|v| {
                            let c = self.normalized_correlation(u, v);
                            (c > 0.0).then(|| (v.clone(), c))
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
                scored.truncate(n);
                tracing::debug!(stem = u.as_str(), neighbours = scored.len(), "query stem expanded");
                Expansion { stem: u.clone(), neighbours: scored }
            })
            .collect()
    }

    fn form_correlation(&self, s: &str, t: &str) -> f64 {
        let (Some(a), Some(b)) = (self.positions.get(s), self.positions.get(t)) else {
            return 0.0;
        };
        let mut total = 0.0;
        for (doc_id, ps) in a {
            let Some(qs) = b.get(doc_id) else {
                continue;
            };
            for &p in ps {
                for &q in qs {
                    if p != q {
                        total += 1.0 / f64::from(p.abs_diff(q));
                    }
                }
            }
        }
        total
    }
}
