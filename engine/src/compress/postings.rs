use std::collections::BTreeMap;

use crate::bits::{BitReader, BitWriter};
use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::index::{DocId, DocumentStats, TermProperties};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedPosting {
    pub doc_id: DocId,
    pub tf: u32,
    pub doc_len: u32,
    pub max_tf: u32,
}

/// Write `df` and every posting of one term.
///
/// The first gap is measured from a virtual document -1, i.e. it is written as
/// `doc_id + 1`, so that document 0 stays encodable. Later gaps are >= 1.
pub(super) fn encode_group(
    codec: Codec,
    props: &TermProperties,
    docs: &BTreeMap<DocId, DocumentStats>,
    out: &mut BitWriter,
) -> Result<()> {
    if props.doc_freq as usize != props.postings.len() {
        return Err(Error::invalid(format!(
            "doc_freq {} disagrees with {} postings",
            props.doc_freq,
            props.postings.len()
        )));
    }
    codec.encode(props.doc_freq, out)?;

    let mut prev: Option<DocId> = None;
    for (&doc_id, &tf) in &props.postings {
        let gap = match prev {
            None => i64::from(doc_id) + 1,
            Some(p) if doc_id > p => i64::from(doc_id - p),
            Some(p) => {
                return Err(Error::invalid(format!("doc ids not strictly increasing: {doc_id} after {p}")));
            }
        };
        let stats = docs
            .get(&doc_id)
            .ok_or_else(|| Error::invalid(format!("no stats for document {doc_id}")))?;
        codec.encode_signed(gap, out)?;
        codec.encode(tf, out)?;
        codec.encode(stats.length, out)?;
        codec.encode(stats.max_tf, out)?;
        prev = Some(doc_id);
    }
    Ok(())
}

pub(super) fn decode_group(codec: Codec, input: &mut BitReader<'_>) -> Result<Vec<DecodedPosting>> {
    let df = codec.decode(input)?;
    // df is untrusted here; the bit stream bounds the real count.
    let mut postings = Vec::with_capacity((df as usize).min(input.remaining() / 4 + 1));
    let mut prev: Option<DocId> = None;
    for _ in 0..df {
        let gap = codec.decode(input)?;
        let doc_id = match prev {
            None => gap - 1,
            Some(p) => p
                .checked_add(gap)
                .ok_or_else(|| Error::corrupt(format!("doc id overflow after {p} + {gap}")))?,
        };
        let tf = codec.decode(input)?;
        let doc_len = codec.decode(input)?;
        let max_tf = codec.decode(input)?;
        if tf > max_tf || max_tf > doc_len {
            return Err(Error::corrupt(format!(
                "document {doc_id}: tf {tf}, max_tf {max_tf}, doclen {doc_len} are inconsistent"
            )));
        }
        postings.push(DecodedPosting { doc_id, tf, doc_len, max_tf });
        prev = Some(doc_id);
    }
    Ok(postings)
}
