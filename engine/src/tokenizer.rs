use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

use crate::error::Result;

lazy_static! {
    static ref SGML_TAG: Regex = Regex::new(r"<[^>]*>").expect("valid regex");
    static ref TITLE: Regex = Regex::new(r"(?is)<title>(.*?)</title>").expect("valid regex");
    static ref DIGITS: Regex = Regex::new(r"\d+").expect("valid regex");
    static ref SPECIAL: Regex = Regex::new(r"[+^:,?;=%#&~`$!@*_)/(}{\\.\[\]<>|◊]").expect("valid regex");
    static ref POSSESSIVE: Regex = Regex::new(r"'s\b").expect("valid regex");
    static ref SPLITTERS: Regex = Regex::new(r#"['"-]"#).expect("valid regex");
    static ref QUERY_LABEL: Regex = Regex::new(r"(?m)^\s*Q\d+:").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref DEFAULT_STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could",
            "did","do","does","doing","down","during",
            "each","few","for","from","further",
            "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","it","its","itself",
            "me","more","most","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","should","so","some","such",
            "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","very",
            "was","we","were","what","when","where","which","while","who","whom","why","with","would",
            "you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Which form of each token goes into a dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Normalization {
    /// The normalised surface form.
    Raw,
    /// English Snowball stem of the surface form.
    Stemmed,
}

impl Normalization {
    pub fn apply(self, token: &str) -> String {
        match self {
            Normalization::Raw => token.to_string(),
            Normalization::Stemmed => stem(token),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    /// One word per line; blank lines are ignored.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::from_words(text.lines()))
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    pub fn english() -> Self {
        Self::from_words(DEFAULT_STOPWORDS.iter())
    }

    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Strip SGML tags, digits and punctuation, drop possessive `'s`, split on hyphens
/// and apostrophes, lowercase and NFKC-normalise.
pub fn normalize(text: &str) -> String {
    let text = text.nfkc().collect::<String>().to_lowercase();
    let text = SGML_TAG.replace_all(&text, " ");
    let text = DIGITS.replace_all(&text, "");
    let text = SPECIAL.replace_all(&text, "");
    let text = POSSESSIVE.replace_all(&text, "");
    let text = SPLITTERS.replace_all(&text, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalised, non-stopword tokens of `text` in reading order.
pub fn tokenize(text: &str, stopwords: &Stopwords) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| !t.is_empty() && !stopwords.contains(t))
        .map(str::to_string)
        .collect()
}

pub fn stem(token: &str) -> String {
    STEMMER.stem(token).into_owned()
}

/// Text of the first `<TITLE>` element with whitespace collapsed.
pub fn extract_headline(text: &str) -> Option<String> {
    let caps = TITLE.captures(text)?;
    let title = caps.get(1)?.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
    (!title.is_empty()).then_some(title)
}

/// Split a query file of `Q1: ...` / `Q2: ...` entries into query texts. A query may
/// continue over several lines; text before the first label is ignored.
pub fn parse_queries(text: &str) -> Vec<String> {
    QUERY_LABEL
        .split(text)
        .skip(1)
        .map(|q| q.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|q| !q.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_digits_and_punctuation() {
        let text = "<DOC><TITLE>Flow past a U.S. body</TITLE> 1996-97 sheriff's data, (approx.)</DOC>";
        assert_eq!(normalize(text), "flow past a us body sheriff data approx");
    }

    #[test]
    fn splits_hyphens_and_apostrophes() {
        assert_eq!(normalize("middle-class rock'n roll"), "middle class rock n roll");
    }

    #[test]
    fn drops_stopwords() {
        let stop = Stopwords::from_words(["the", "a"]);
        assert_eq!(tokenize("The cat sat on a mat", &stop), vec!["cat", "sat", "on", "mat"]);
    }

    #[test]
    fn stems_inflections() {
        assert_eq!(Normalization::Stemmed.apply("running"), "run");
        assert_eq!(Normalization::Raw.apply("running"), "running");
    }

    #[test]
    fn headline_is_extracted() {
        let text = "<DOC>\n<TITLE>\nexperimental investigation\nof the aerodynamics\n</TITLE>\n</DOC>";
        assert_eq!(extract_headline(text).as_deref(), Some("experimental investigation of the aerodynamics"));
        assert_eq!(extract_headline("<DOC>no title</DOC>"), None);
    }

    #[test]
    fn queries_are_split_on_labels() {
        let text = "Q1: what similarity laws must be obeyed\nwhen constructing models\n\nQ2:\nheat transfer 2d\n";
        assert_eq!(
            parse_queries(text),
            vec!["what similarity laws must be obeyed when constructing models", "heat transfer 2d"]
        );
    }

    #[test]
    fn default_list_has_common_words() {
        let stop = Stopwords::english();
        assert!(stop.contains("the"));
        assert!(!stop.contains("nasa"));
    }
}
