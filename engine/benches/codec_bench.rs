use criterion::{black_box, criterion_group, criterion_main, Criterion};
use engine::tokenizer::{tokenize, Stopwords};
use engine::{compress, decompress, BitReader, BitWriter, Codec, IndexBuilder, IndexConfig, InvertedIndex, Layout};

fn bench_codecs(c: &mut Criterion) {
    for codec in [Codec::Gamma, Codec::Delta] {
        let mut w = BitWriter::new();
        for n in 1..=10_000u32 {
            codec.encode(n, &mut w).unwrap();
        }
        let bytes = w.finish();

        c.bench_function(&format!("{codec:?}_encode_10k"), |b| {
            b.iter(|| {
                let mut w = BitWriter::new();
                for n in 1..=10_000u32 {
                    codec.encode(black_box(n), &mut w).unwrap();
                }
                w.finish()
            })
        });
        c.bench_function(&format!("{codec:?}_decode_10k"), |b| {
            b.iter(|| {
                let mut r = BitReader::new(black_box(&bytes));
                (0..10_000).map(|_| codec.decode(&mut r).unwrap()).sum::<u32>()
            })
        });
    }
}

const WORDS: &[&str] = &[
    "boundary", "layer", "laminar", "turbulent", "flow", "flows", "flowing", "shock", "wave", "pressure",
    "heat", "transfer", "supersonic", "subsonic", "wing", "wings", "body", "drag", "lift", "nozzle",
];

fn corpus() -> InvertedIndex {
    let stop = Stopwords::english();
    let mut b = IndexBuilder::new();
    for doc_id in 1..=1_000u32 {
        let text: Vec<&str> = (0..60u32).map(|i| WORDS[((doc_id * 7 + i * i) % WORDS.len() as u32) as usize]).collect();
        b.add_document(doc_id, None, tokenize(&text.join(" "), &stop)).unwrap();
    }
    b.finish().unwrap()
}

fn bench_layouts(c: &mut Criterion) {
    let index = corpus();
    let config = IndexConfig::default();
    for layout in [Layout::Blocked, Layout::FrontCoded] {
        let packed = compress(&index, layout, &config).unwrap();
        c.bench_function(&format!("compress_{}", layout.name()), |b| {
            b.iter(|| compress(black_box(&index), layout, &config).unwrap())
        });
        c.bench_function(&format!("decompress_{}", layout.name()), |b| {
            b.iter(|| decompress(black_box(&packed), &config).unwrap())
        });
    }
}

criterion_group!(benches, bench_codecs, bench_layouts);
criterion_main!(benches);
