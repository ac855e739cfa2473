//! Benchmarks for core mapcons functions.
//!
//! Run with: `cargo bench`
//! View reports in: `target/criterion/report/index.html`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use mapcons_consensus::{
    AlignedRead, CancellationToken, ConflictResolution, ConsensusOptions, ConsensusRun,
    InMemoryMapping, Strand, parse_cigar,
};
use mapcons_dna::{reverse_complement, union_code};

const BASES: &[u8] = b"ACGT";

/// Deterministic pseudo-random reference of `len` bases.
fn reference(len: usize) -> Vec<u8> {
    let mut state = 0x2545_f491_u64;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            BASES[(state % 4) as usize]
        })
        .collect()
}

/// Reads tiled along the reference every `step` bases, every tenth one with a mismatch.
fn tiled_mapping(reference: &[u8], read_len: usize, step: usize, depth: usize) -> InMemoryMapping {
    let ops = parse_cigar(&format!("{read_len}M")).unwrap();
    let mut reads = Vec::new();
    for start in (0..=reference.len() - read_len).step_by(step) {
        for copy in 0..depth {
            let mut bases = reference[start..start + read_len].to_vec();
            if copy % 10 == 0 {
                bases[read_len / 2] = if bases[read_len / 2] == b'A' { b'C' } else { b'A' };
            }
            let strand = if copy % 2 == 0 { Strand::Forward } else { Strand::Reverse };
            let read = AlignedRead::new(
                format!("r{start}_{copy}"),
                bases,
                Some(vec![35; read_len]),
                start as i64,
                &ops,
                strand,
            )
            .unwrap();
            reads.push(read);
        }
    }
    InMemoryMapping::new("bench", reference.len(), false, reads, Vec::new())
}

/// Benchmark DNA helpers
fn bench_dna_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("dna_operations");
    let sequence = reference(1_000);

    group.throughput(Throughput::Bytes(sequence.len() as u64));
    group.bench_function("reverse_complement_1kb", |b| {
        b.iter(|| black_box(reverse_complement(black_box(&sequence))));
    });
    group.bench_function("union_code", |b| {
        b.iter(|| black_box(union_code(black_box([b'A', b'G', b'T']))));
    });

    group.finish();
}

/// Benchmark CIGAR parsing
fn bench_cigar_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("cigar_parsing");

    for cigar in ["150M", "5S40M2I30M3D73M", "10H20S50M1I20M1D30M19S"] {
        group.bench_with_input(BenchmarkId::from_parameter(cigar), cigar, |b, cigar| {
            b.iter(|| black_box(parse_cigar(black_box(cigar))));
        });
    }

    group.finish();
}

/// Benchmark a full consensus run at several depths
fn bench_consensus_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("consensus_run");
    group.sample_size(20);
    let reference = reference(5_000);
    let token = CancellationToken::new();

    for depth in [10_usize, 50] {
        let mapping = tiled_mapping(&reference, 150, 50, depth);
        group.throughput(Throughput::Elements(reference.len() as u64));

        for (label, resolution) in
            [("vote", ConflictResolution::Vote), ("iupac", ConflictResolution::Iupac)]
        {
            let options = ConsensusOptions {
                min_coverage: 10,
                conflict_resolution: resolution,
                ..ConsensusOptions::default()
            };
            let run = ConsensusRun::new(options).unwrap();
            group.bench_with_input(
                BenchmarkId::new(label, depth),
                &mapping,
                |b, mapping| {
                    b.iter(|| black_box(run.run(mapping, None, &token).unwrap()));
                },
            );
        }
    }

    group.finish();
}

/// Benchmark a consensus run with breakpoint detection and the quality filter
fn bench_consensus_run_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("consensus_run_filters");
    group.sample_size(20);
    let reference = reference(5_000);
    let mapping = tiled_mapping(&reference, 150, 50, 30);
    let token = CancellationToken::new();

    let options = ConsensusOptions {
        min_coverage: 10,
        indel_resolution: true,
        quality_filter: Some(Default::default()),
        ..ConsensusOptions::default()
    };
    let run = ConsensusRun::new(options).unwrap();
    group.bench_function("breakpoints_and_quality", |b| {
        b.iter(|| black_box(run.run(&mapping, None, &token).unwrap()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_dna_operations,
    bench_cigar_parsing,
    bench_consensus_run,
    bench_consensus_run_filters
);
criterion_main!(benches);
