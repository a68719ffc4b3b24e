use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::compress::{compress, decompress, CompressedIndex, Layout};
use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::index::{InvertedIndex, TermPositions};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantMeta {
    pub name: String,
    pub layout: Layout,
    pub num_terms: usize,
    pub uncompressed_bytes: u64,
    pub compressed_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
    /// Settings the compressed streams were written with; decoding needs the same ones.
    pub config: IndexConfig,
    pub variants: Vec<VariantMeta>,
}

impl MetaFile {
    pub fn new(num_docs: u32, config: IndexConfig) -> Self {
        Self { num_docs, created_at: now_rfc3339(), version: FORMAT_VERSION, config, variants: Vec::new() }
    }

    pub fn variant(&self, name: &str) -> Option<&VariantMeta> {
        self.variants.iter().find(|v| v.name == name)
    }
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn uncompressed(&self, variant: &str) -> PathBuf { self.root.join(format!("{variant}.uncompressed")) }
    pub fn compressed(&self, variant: &str) -> PathBuf { self.root.join(format!("{variant}.compressed")) }
    pub fn dictionary(&self, variant: &str) -> PathBuf { self.root.join(format!("{variant}.dictionary")) }
    pub fn positions(&self, variant: &str) -> PathBuf { self.root.join(format!("{variant}.positions")) }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<u64> {
    let mut f = File::create(path)?;
    f.write_all(bytes)?;
    Ok(bytes.len() as u64)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Writes the bincode form of `index`; returns the number of bytes written.
pub fn save_uncompressed(paths: &IndexPaths, variant: &str, index: &InvertedIndex) -> Result<u64> {
    create_dir_all(&paths.root)?;
    let bytes = bincode::serialize(index)?;
    write_file(&paths.uncompressed(variant), &bytes)
}

pub fn load_uncompressed(paths: &IndexPaths, variant: &str) -> Result<InvertedIndex> {
    let buf = read_file(&paths.uncompressed(variant))?;
    let index: InvertedIndex = bincode::deserialize(&buf)?;
    index.validate()?;
    Ok(index)
}

pub fn save_positions(paths: &IndexPaths, variant: &str, positions: &TermPositions) -> Result<u64> {
    create_dir_all(&paths.root)?;
    let bytes = bincode::serialize(positions)?;
    write_file(&paths.positions(variant), &bytes)
}

pub fn load_positions(paths: &IndexPaths, variant: &str) -> Result<TermPositions> {
    let buf = read_file(&paths.positions(variant))?;
    Ok(bincode::deserialize(&buf)?)
}

/// Writes the dictionary and postings streams; returns their combined size in bytes.
pub fn save_compressed(paths: &IndexPaths, variant: &str, compressed: &CompressedIndex) -> Result<u64> {
    create_dir_all(&paths.root)?;
    let dict = write_file(&paths.dictionary(variant), compressed.dictionary.as_bytes())?;
    let postings = write_file(&paths.compressed(variant), &compressed.postings)?;
    Ok(dict + postings)
}

pub fn load_compressed_streams(paths: &IndexPaths, variant: &str, layout: Layout) -> Result<CompressedIndex> {
    let dictionary = String::from_utf8(read_file(&paths.dictionary(variant))?)
        .map_err(|e| Error::corrupt(format!("{variant} dictionary is not UTF-8: {e}")))?;
    let postings = read_file(&paths.compressed(variant))?;
    Ok(CompressedIndex { layout, dictionary, postings })
}

/// Compresses `index` with `layout` and writes both the uncompressed and compressed
/// forms under `variant`.
pub fn write_variant(
    paths: &IndexPaths,
    variant: &str,
    index: &InvertedIndex,
    layout: Layout,
    config: &IndexConfig,
) -> Result<VariantMeta> {
    let uncompressed_bytes = save_uncompressed(paths, variant, index)?;
    let compressed = compress(index, layout, config)?;
    let compressed_bytes = save_compressed(paths, variant, &compressed)?;
    tracing::info!(variant, layout = layout.name(), uncompressed_bytes, compressed_bytes, "variant written");
    Ok(VariantMeta {
        name: variant.to_string(),
        layout,
        num_terms: index.dictionary.len(),
        uncompressed_bytes,
        compressed_bytes,
    })
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    write_file(&paths.meta(), json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Decode a compressed variant back into an index, using the layout and settings
/// recorded in `meta.json`. Headlines are not part of the compressed form.
pub fn load_compressed(paths: &IndexPaths, variant: &str) -> Result<InvertedIndex> {
    let meta = load_meta(paths)?;
    let entry = meta
        .variant(variant)
        .ok_or_else(|| Error::invalid(format!("no variant named {variant:?} in {}", paths.meta().display())))?;
    let streams = load_compressed_streams(paths, variant, entry.layout)?;
    let index = decompress(&streams, &meta.config)?;
    if index.dictionary.len() != entry.num_terms {
        return Err(Error::corrupt(format!(
            "{variant}: decoded {} terms, meta.json records {}",
            index.dictionary.len(),
            entry.num_terms
        )));
    }
    Ok(index)
}
