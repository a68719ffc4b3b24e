//! Inverted-index construction, Elias gamma/delta postings compression with blocked
//! and front-coded dictionaries, W1/W2 ranked retrieval and metric-cluster query
//! expansion.

pub mod bits;
pub mod codec;
pub mod compress;
pub mod config;
pub mod error;
pub mod expansion;
pub mod index;
pub mod persist;
pub mod scoring;
pub mod stats;
pub mod tokenizer;

pub use bits::{BitReader, BitWriter};
pub use codec::{delta_decode, delta_encode, gamma_decode, gamma_encode, Codec};
pub use compress::{compress, decode_entries, decompress, CompressedIndex, DecodedPosting, Layout, TermEntry};
pub use config::IndexConfig;
pub use error::{Error, Result};
pub use index::{Dictionary, DocId, DocumentStats, IndexBuilder, InvertedIndex, Posting, TermPositions, TermProperties};
pub use scoring::{QueryScores, QueryVector, RankedDocument, Scorer, Similarity, Weighting};
