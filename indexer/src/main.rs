use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use engine::expansion::{MetricClusters, EXPANSION_TERMS};
use engine::persist::{
    load_compressed, load_meta, load_positions, load_uncompressed, save_meta, save_positions, write_variant, IndexPaths,
    MetaFile,
};
use engine::tokenizer::{extract_headline, parse_queries, stem, tokenize, Normalization, Stopwords};
use engine::{stats, DocId, IndexBuilder, IndexConfig, InvertedIndex, Layout, QueryVector, Scorer, Similarity, Weighting};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs;
use std::path::{Path, PathBuf};

/// Raw (inflected) terms, blocked dictionary with gamma postings.
const RAW_VARIANT: &str = "v1";
/// Stemmed terms, front-coded dictionary with delta postings.
const STEMMED_VARIANT: &str = "v2";
/// Length of the most-frequent-terms list printed by `stats`.
const MOST_FREQUENT: usize = 30;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build, compress and query gamma/delta-coded inverted indexes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    Raw,
    Stemmed,
}

impl VariantArg {
    fn name(self) -> &'static str {
        match self {
            VariantArg::Raw => RAW_VARIANT,
            VariantArg::Stemmed => STEMMED_VARIANT,
        }
    }

    fn normalization(self) -> Normalization {
        match self {
            VariantArg::Raw => Normalization::Raw,
            VariantArg::Stemmed => Normalization::Stemmed,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Index every file under a directory and write both compressed variants
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
        /// Stopword list, one word per line (built-in English list if omitted)
        #[arg(long)]
        stopwords: Option<PathBuf>,
        /// JSON file overriding block size, chunk size and top-k
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Rank documents for each query in a `Q1: ...` query file
    Search {
        #[arg(long)]
        index: PathBuf,
        #[arg(long)]
        queries: PathBuf,
        #[arg(long)]
        stopwords: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = VariantArg::Stemmed)]
        variant: VariantArg,
        /// Number of results per query (defaults to the index's top_k)
        #[arg(long)]
        k: Option<usize>,
        /// Also rank by cosine and Jaccard similarity
        #[arg(long, default_value_t = false)]
        similarity: bool,
        /// Add the most correlated stems (metric clusters) to each query
        #[arg(long, default_value_t = false)]
        expand: bool,
    },
    /// Decode every compressed variant and compare it with its uncompressed form
    Verify {
        #[arg(long)]
        index: PathBuf,
    },
    /// Print collection statistics for one variant
    Stats {
        #[arg(long)]
        index: PathBuf,
        #[arg(long, value_enum, default_value_t = VariantArg::Raw)]
        variant: VariantArg,
        /// Terms to summarise (normalised the same way as the variant)
        #[arg(long, value_delimiter = ',')]
        terms: Vec<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, stopwords, config } => build_index(&input, &output, stopwords.as_deref(), config.as_deref()),
        Commands::Search { index, queries, stopwords, variant, k, similarity, expand } => {
            search(&index, &queries, stopwords.as_deref(), variant, k, SearchOptions { similarity, expand })
        }
        Commands::Verify { index } => verify(&index),
        Commands::Stats { index, variant, terms } => print_stats(&index, variant, &terms),
    }
}

fn load_stopwords(path: Option<&Path>) -> Result<Stopwords> {
    match path {
        Some(p) => Stopwords::load(p).with_context(|| format!("reading stopwords from {}", p.display())),
        None => Ok(Stopwords::english()),
    }
}

/// Digits in the file name give the document id (`cranfield0042` -> 42).
fn doc_id_from_name(path: &Path) -> Option<DocId> {
    let stem = path.file_stem()?.to_str()?;
    let digits: String = stem.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn collect_files(input: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            if entry.path().is_file() {
                files.push(entry.path().to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input {} does not exist", input.display());
    }
    Ok(files)
}

/// Assign ids in ascending order. File-name numbers are used when every file has a
/// distinct one; otherwise files are numbered 1.. in path order.
fn assign_doc_ids(mut files: Vec<PathBuf>) -> Vec<(DocId, PathBuf)> {
    files.sort();
    let named: Option<Vec<DocId>> = files.iter().map(|f| doc_id_from_name(f)).collect();
    let mut docs: Vec<(DocId, PathBuf)> = match named {
        Some(ids) if all_distinct(&ids) => ids.into_iter().zip(files).collect(),
        _ => (1..).zip(files).collect(),
    };
    docs.sort_by_key(|(id, _)| *id);
    docs
}

fn all_distinct(ids: &[DocId]) -> bool {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len() == ids.len()
}

fn build_index(input: &Path, output: &Path, stopwords: Option<&Path>, config: Option<&Path>) -> Result<()> {
    let config = match config {
        Some(p) => IndexConfig::load(p).with_context(|| format!("loading config {}", p.display()))?,
        None => IndexConfig::default(),
    };
    let stopwords = load_stopwords(stopwords)?;
    let docs = assign_doc_ids(collect_files(input)?);
    let paths = IndexPaths::new(output);

    // Both normalisations are built in one pass over the corpus.
    let mut raw = IndexBuilder::with_positions();
    let mut stemmed = IndexBuilder::new();
    for (doc_id, file) in &docs {
        let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
        let text = String::from_utf8_lossy(&bytes);
        let headline = extract_headline(&text);
        let tokens = tokenize(&text, &stopwords);

        raw.begin_document(*doc_id, headline.clone())?;
        stemmed.begin_document(*doc_id, headline)?;
        for token in &tokens {
            raw.add_term(token)?;
            stemmed.add_term(&Normalization::Stemmed.apply(token))?;
        }
        raw.end_document()?;
        stemmed.end_document()?;
    }
    let (raw, positions) = raw.finish_with_positions()?;
    let stemmed = stemmed.finish()?;
    tracing::info!(
        num_docs = raw.num_docs(),
        raw_terms = raw.dictionary.len(),
        stemmed_terms = stemmed.dictionary.len(),
        "ingested documents"
    );

    let mut meta = MetaFile::new(raw.num_docs(), config.clone());
    meta.variants.push(write_variant(&paths, RAW_VARIANT, &raw, Layout::Blocked, &config)?);
    meta.variants.push(write_variant(&paths, STEMMED_VARIANT, &stemmed, Layout::FrontCoded, &config)?);
    save_positions(&paths, RAW_VARIANT, &positions)?;
    save_meta(&paths, &meta)?;

    println!("{:<8} {:<12} {:>8} {:>14} {:>14}", "variant", "layout", "terms", "uncompressed", "compressed");
    for v in &meta.variants {
        println!(
            "{:<8} {:<12} {:>8} {:>14} {:>14}",
            v.name,
            v.layout.name(),
            v.num_terms,
            v.uncompressed_bytes,
            v.compressed_bytes
        );
    }
    tracing::info!(output = %output.display(), "index build complete");
    Ok(())
}

fn load_variant(paths: &IndexPaths, variant: VariantArg) -> Result<InvertedIndex> {
    load_uncompressed(paths, variant.name())
        .with_context(|| format!("loading {} index from {}", variant.name(), paths.root.display()))
}

struct SearchOptions {
    similarity: bool,
    expand: bool,
}

fn search(
    index_dir: &Path,
    queries: &Path,
    stopwords: Option<&Path>,
    variant: VariantArg,
    k: Option<usize>,
    options: SearchOptions,
) -> Result<()> {
    let paths = IndexPaths::new(index_dir);
    let meta = load_meta(&paths)?;
    let index = load_variant(&paths, variant)?;
    let stopwords = load_stopwords(stopwords)?;
    let k = k.unwrap_or(meta.config.top_k);
    let text = fs::read_to_string(queries).with_context(|| format!("reading {}", queries.display()))?;
    let scorer = Scorer::new(&index);
    let positions = if options.expand {
        load_positions(&paths, RAW_VARIANT).with_context(|| format!("loading positions from {}", index_dir.display()))?
    } else {
        Default::default()
    };
    let clusters = MetricClusters::new(&positions, stem);

    for (i, query_text) in parse_queries(&text).iter().enumerate() {
        let norm = variant.normalization();
        let tokens = tokenize(query_text, &stopwords);
        let mut terms: Vec<String> = tokens.iter().map(|t| norm.apply(t)).collect();
        println!("\nQ{}: {}", i + 1, query_text);

        if options.expand {
            let stems: Vec<String> = tokens.iter().map(|t| stem(t)).collect();
            for e in clusters.expand(&stems, EXPANSION_TERMS) {
                let shown: Vec<String> = e.neighbours.iter().map(|(s, c)| format!("{s}={c:.4}")).collect();
                println!("  expand {} -> {}", e.stem, shown.join(" "));
                for (neighbour, _) in &e.neighbours {
                    match variant {
                        VariantArg::Stemmed => terms.push(neighbour.clone()),
                        VariantArg::Raw => terms.extend(clusters.forms(neighbour).iter().map(|f| f.to_string())),
                    }
                }
            }
        }

        let query = QueryVector::from_terms(&terms);
        if query.is_empty() {
            println!("  (no index terms)");
            continue;
        }

        for scheme in [Weighting::W1, Weighting::W2] {
            let scores = scorer.score(&query, scheme);
            let weights = scorer.query_weights(&query, scheme);
            println!("  {scheme:?} query vector: {}", format_vector(&weights));
            println!("  {:>4} {:>10} {:>8}  headline", "rank", "score", "doc");
            for row in scorer.rank(&query, scheme, k) {
                println!(
                    "  {:>4} {:>10.6} {:>8}  {}",
                    row.rank,
                    row.score,
                    row.doc_id,
                    row.headline.as_deref().unwrap_or("-")
                );
                if let Some(contrib) = scores.contributions.get(&row.doc_id) {
                    println!("  {:>24}  {}", "", format_vector(contrib));
                }
            }
        }

        if options.similarity {
            for sim in [Similarity::Cosine, Similarity::Jaccard] {
                println!("  {sim:?}");
                for row in scorer.rank_by_similarity(&query, sim, k) {
                    println!("  {:>4} {:>10.6} {:>8}", row.rank, row.score, row.doc_id);
                }
            }
        }
    }
    Ok(())
}

fn format_vector<'a>(weights: impl IntoIterator<Item = (&'a String, &'a f64)>) -> String {
    weights.into_iter().map(|(t, w)| format!("{t}={w:.4}")).collect::<Vec<_>>().join(" ")
}

fn verify(index_dir: &Path) -> Result<()> {
    let paths = IndexPaths::new(index_dir);
    let meta = load_meta(&paths)?;
    for v in &meta.variants {
        let decoded = load_compressed(&paths, &v.name).with_context(|| format!("decoding variant {}", v.name))?;
        let original = load_uncompressed(&paths, &v.name)?;
        if decoded.dictionary != original.dictionary {
            bail!("variant {} decodes to a different dictionary", v.name);
        }
        for (doc_id, stats) in &decoded.docs {
            match original.doc(*doc_id) {
                Some(o) if o.length == stats.length && o.max_tf == stats.max_tf => {}
                _ => bail!("variant {}: document {} stats differ after decoding", v.name, doc_id),
            }
        }
        println!("{}: {} terms, {} bytes compressed, ok", v.name, v.num_terms, v.compressed_bytes);
    }
    Ok(())
}

fn print_stats(index_dir: &Path, variant: VariantArg, terms: &[String]) -> Result<()> {
    let paths = IndexPaths::new(index_dir);
    let index = load_variant(&paths, variant)?;
    let dict = &index.dictionary;

    println!("documents: {}", index.num_docs());
    println!("terms: {}", dict.len());
    println!("average document length: {:.2}", index.average_doc_length());
    println!("uncompressed postings size: {} bytes", stats::uncompressed_bytes(dict));
    if let Some(e) = stats::terms_with_largest_df(dict) {
        println!("largest df ({}): {}", e.value, e.keys.join(", "));
    }
    if let Some(e) = stats::terms_with_smallest_df(dict) {
        println!("smallest df ({}): {} term(s)", e.value, e.keys.len());
    }
    println!("terms occurring once: {}", stats::terms_occurring_once(dict).len());
    let top = stats::most_frequent_terms(dict, MOST_FREQUENT);
    if !top.is_empty() {
        let shown: Vec<String> = top.iter().map(|(t, tf)| format!("{t}({tf})")).collect();
        println!("{} most frequent: {}", top.len(), shown.join(" "));
    }
    if let Some(e) = stats::docs_with_largest_max_tf(&index) {
        println!("largest max_tf ({}): docs {:?}", e.value, e.keys);
    }
    if let Some(e) = stats::docs_with_largest_length(&index) {
        println!("largest doclen ({}): docs {:?}", e.value, e.keys);
    }

    let norm = variant.normalization();
    let wanted: Vec<String> = terms.iter().map(|t| norm.apply(&t.to_lowercase())).collect();
    let summaries = stats::term_summaries(dict, wanted.iter().map(String::as_str));
    if !summaries.is_empty() {
        println!("\n{:<20} {:>8} {:>6} {:>10}", "term", "tf", "df", "bytes");
        for s in &summaries {
            println!("{:<20} {:>8} {:>6} {:>10}", s.term, s.total_tf, s.doc_freq, s.list_bytes);
        }
    }
    for s in &summaries {
        println!("\nfirst postings of {:?}:", s.term);
        for p in stats::first_postings(&index, &s.term, 3) {
            println!("  doc {:>6}  tf {:>4}  max_tf {:>4}  doclen {:>6}", p.doc_id, p.tf, p.max_tf, p.doc_len);
        }
    }
    Ok(())
}
