//! Benchmarks for the hot paths of vector search: raw cosine similarity
//! and a full index scan across many resident chunks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use code_search_core::domain::types::{ChunkType, Embedding, ChunkRecord, Language};
use code_search_core::vector_index::InMemoryVectorIndex;
use code_search_core::vector_index::simd::cosine_similarity;

fn sample_vector(dims: usize, seed: usize) -> Vec<f32> {
    (0..dims).map(|i| ((i + seed) as f32 * 0.618_034).sin()).collect()
}

fn bench_cosine_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("cosine_similarity");
    for dims in [128, 384, 1536] {
        let a = sample_vector(dims, 1);
        let b = sample_vector(dims, 2);
        group.bench_with_input(BenchmarkId::from_parameter(dims), &dims, |bencher, _| {
            bencher.iter(|| cosine_similarity(black_box(&a), black_box(&b)));
        });
    }
    group.finish();
}

fn bench_index_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_search");
    for resident in [1_000usize, 10_000] {
        let index = InMemoryVectorIndex::new(u64::MAX);
        for i in 0..resident {
            let chunk = ChunkRecord {
                id: format!("c{i}"),
                project: "bench".to_string(),
                file_path: format!("f{i}.rs"),
                start_line: 1,
                end_line: 10,
                content: "fn bench() {}".to_string(),
                language: Language::Rust,
                chunk_type: ChunkType::Function,
                text_hash: format!("hash{i}"),
            };
            index.insert(chunk, Embedding::new(sample_vector(384, i)));
        }
        let query = Embedding::new(sample_vector(384, 0));

        group.bench_with_input(BenchmarkId::from_parameter(resident), &resident, |bencher, _| {
            bencher.iter(|| index.search(None, black_box(&query), black_box(10)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cosine_similarity, bench_index_search);
criterion_main!(benches);
