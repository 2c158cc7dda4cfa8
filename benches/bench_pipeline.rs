//! Table compiler sub-phase benchmarks.
//!
//! Benchmarks each stage of the pipeline independently:
//! 1. Full compilation (spec -> encoded tables)
//! 2. NFA construction (Thompson's construction)
//! 3. Alphabet partitioning (equivalence classes)
//! 4. Subset construction (NFA -> DFA)
//! 5. DFA minimization (Hopcroft's algorithm)
//! 6. Table encoding (DFA -> RLE streams)
//! 7. Scaling with synthetic specs
//! 8. Scanning throughput over compiled tables

mod bench_specs;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use lextab::automata::minimize::minimize_dfa;
use lextab::automata::nfa::build_nfa;
use lextab::automata::partition::compute_equivalence_classes;
use lextab::automata::subset::subset_construction;
use lextab::compile;
use lextab::scanner::{Scanner, ScannerTables};
use lextab::tables::encode_automaton;

use bench_specs::{medium_spec, minimal_spec, prepare, small_spec, synthetic_spec};

fn bench_full_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/full_compile");
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(200);

    let specs = [
        ("minimal", minimal_spec()),
        ("small", small_spec()),
        ("medium", medium_spec()),
    ];

    for (name, spec) in &specs {
        group.bench_with_input(BenchmarkId::from_parameter(name), spec, |b, spec| {
            b.iter(|| compile(spec));
        });
    }

    group.finish();
}

fn bench_build_nfa(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/build_nfa");
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(200);

    let specs = [
        ("minimal", minimal_spec()),
        ("small", small_spec()),
        ("medium", medium_spec()),
    ];

    for (name, spec) in &specs {
        let prepared = prepare(spec);
        group.bench_with_input(BenchmarkId::from_parameter(name), &prepared, |b, prepared| {
            b.iter(|| build_nfa(&prepared.rules));
        });
    }

    group.finish();
}

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/partition");
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(200);

    let specs = [
        ("minimal", minimal_spec()),
        ("small", small_spec()),
        ("medium", medium_spec()),
    ];

    for (name, spec) in &specs {
        let prepared = prepare(spec);
        group.bench_with_input(BenchmarkId::from_parameter(name), &prepared, |b, prepared| {
            b.iter(|| compute_equivalence_classes(&prepared.nfa));
        });
    }

    group.finish();
}

fn bench_subset_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/subset_construction");
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(200);

    let specs = [
        ("minimal", minimal_spec()),
        ("small", small_spec()),
        ("medium", medium_spec()),
    ];

    for (name, spec) in &specs {
        let prepared = prepare(spec);
        group.bench_with_input(BenchmarkId::from_parameter(name), &prepared, |b, prepared| {
            b.iter(|| subset_construction(&prepared.nfa, &prepared.partition));
        });
    }

    group.finish();
}

fn bench_minimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/minimize");
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(200);

    let specs = [
        ("minimal", minimal_spec()),
        ("small", small_spec()),
        ("medium", medium_spec()),
    ];

    for (name, spec) in &specs {
        let prepared = prepare(spec);
        group.bench_with_input(BenchmarkId::from_parameter(name), &prepared, |b, prepared| {
            b.iter(|| minimize_dfa(&prepared.dfa));
        });
    }

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/encode");
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(200);

    let specs = [
        ("minimal", minimal_spec()),
        ("small", small_spec()),
        ("medium", medium_spec()),
    ];

    for (name, spec) in &specs {
        let prepared = prepare(spec);
        group.bench_with_input(BenchmarkId::from_parameter(name), &prepared, |b, prepared| {
            b.iter(|| encode_automaton("YYINITIAL", &prepared.min_dfa, &prepared.partition));
        });
    }

    group.finish();
}

fn bench_compile_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/scaling");
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(200);

    for n in [5, 10, 20, 50, 100] {
        let spec = synthetic_spec(n);
        group.throughput(Throughput::Elements(spec.rules.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &spec, |b, spec| {
            b.iter(|| compile(spec));
        });
    }

    group.finish();
}

fn bench_scan_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan/throughput");
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(200);

    let output = compile(&small_spec());
    let compiled = output.scanner.expect("benchmark spec compiles cleanly");
    let tables = ScannerTables::decode(&compiled).expect("benchmark tables decode");

    let line = "while total <= 9000 { total = total + x1 } // accumulate\n";
    for copies in [16usize, 256, 4096] {
        let input = line.repeat(copies);
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(copies), &input, |b, input| {
            b.iter(|| Scanner::new(&tables, input).tokens().unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_full_compile,
    bench_build_nfa,
    bench_partition,
    bench_subset_construction,
    bench_minimize,
    bench_encode,
    bench_compile_scaling,
    bench_scan_throughput
);
criterion_main!(benches);
