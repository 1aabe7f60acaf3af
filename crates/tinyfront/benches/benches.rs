use std::{env, path::PathBuf};

use criterion::{criterion_group, criterion_main, Criterion};
use tinyfront::{
    grammar::Grammar,
    lexicon::Lexicon,
    lr1::Config,
    scan::{ScanConfig, Scanner},
    table::ParseTable,
};

criterion_main!(benches);
criterion_group!(benches, bench_lexicon, bench_table, bench_scan);

fn fixture(name: &str) -> PathBuf {
    let project_root = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .expect("missing environment variable: `CARGO_MANIFEST_DIR'");
    project_root.join("tests").join(name)
}

fn bench_lexicon(c: &mut Criterion) {
    let lexicon = Lexicon::from_file(fixture("calc.lex")).unwrap();
    c.bench_function("build_automaton", |b| {
        b.iter(|| lexicon.build_automaton());
    });
}

fn bench_table(c: &mut Criterion) {
    let grammar = Grammar::from_file(fixture("calc.grammar")).unwrap();

    let mut group = c.benchmark_group("calc");
    group.bench_function("Canonical", |b| {
        b.iter(|| ParseTable::generate_with_config(&grammar, Config::new().use_canonical()));
    });
    group.bench_function("LALR", |b| {
        b.iter(|| ParseTable::generate_with_config(&grammar, Config::new().use_lalr()));
    });
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let lexicon = Lexicon::from_file(fixture("calc.lex")).unwrap();
    let mut config = ScanConfig::new();
    config.skip("WS");
    let scanner = Scanner::new(&lexicon, &config);

    let source = "let x = 1;\nx + 2 * (3 + y);\n".repeat(256);
    c.bench_function("scan", |b| {
        b.iter(|| scanner.scan(&source));
    });
}
