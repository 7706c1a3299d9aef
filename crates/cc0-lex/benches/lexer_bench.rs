//! Lexer benchmarks.
//!
//! Run with: `cargo bench --package cc0-lex`

use cc0_lex::tokenize;
use cc0_util::Handler;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn token_count(source: &str) -> usize {
    let handler = Handler::new();
    tokenize(source, &handler).map(|s| s.len()).unwrap_or(0)
}

fn bench_lexer_statements(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");

    let source = "int main() { int x = 42; while (x > 0) { x = x - 1; } return x; }";
    group.throughput(Throughput::Bytes(source.len() as u64));

    group.bench_function("declaration", |b| {
        b.iter(|| token_count(black_box("int x = 42;")))
    });

    group.bench_function("function_with_loop", |b| {
        b.iter(|| token_count(black_box(source)))
    });

    group.finish();
}

fn bench_lexer_literals(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_literals");

    group.bench_function("integer", |b| {
        b.iter(|| token_count(black_box("int x = 123456;")))
    });

    group.bench_function("double", |b| {
        b.iter(|| token_count(black_box("double x = 3.14159e-2;")))
    });

    group.bench_function("hex", |b| {
        b.iter(|| token_count(black_box("int x = 0x7FFFFFFF;")))
    });

    group.bench_function("string", |b| {
        b.iter(|| token_count(black_box("print(\"a reasonably long message\\n\");")))
    });

    group.finish();
}

fn bench_lexer_comments(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_comments");

    let source = r#"
        // factorial, the classic way
        int fact(int n) {
            /* the base case
               ends the recursion */
            if (n <= 1) { return 1; }
            return n * fact(n - 1);
        }
        int main() { print(fact(10)); return 0; }
    "#;

    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("commented_source", |b| {
        b.iter(|| token_count(black_box(source)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_lexer_statements,
    bench_lexer_literals,
    bench_lexer_comments
);
criterion_main!(benches);
