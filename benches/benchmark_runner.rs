/// Benchmarks for the closure compiler.
///
/// Each workload runs once with type specialization and once on the dynamic path,
/// so the two can be compared directly.

extern crate closure_js;

use closure_js::parser::JsParser;
use closure_js::runner::api::Engine;
use closure_js::runner::compiler::{compile_program, CompileOptions};
use closure_js::runner::config::EngineConfig;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

const LOOP_SUM: &str = "
    function sum(n) {
        var total = 0;
        for (var i = 0; i < n; i++) { total = total + i; }
        return total;
    }
    sum(10000);
";

const FIBONACCI: &str = "
    function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }
    fib(18);
";

const CLOSURES: &str = "
    function counter() {
        var count = 0;
        return function () { count += 1; return count; };
    }
    var next = counter();
    for (var i = 0; i < 5000; i++) { next(); }
    next();
";

const STRINGS: &str = "
    function build(n) {
        var s = '';
        for (var i = 0; i < n; i++) { s = s + i; }
        return s.length;
    }
    build(2000);
";

const WORKLOADS: [(&str, &str); 4] = [
    ("loop_sum", LOOP_SUM),
    ("fibonacci", FIBONACCI),
    ("closures", CLOSURES),
    ("strings", STRINGS),
];

fn bench_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("run");
    for (name, source) in WORKLOADS.iter() {
        let program = JsParser::parse_to_ast_from_str(source).unwrap();
        for specialize in [true, false] {
            let config = EngineConfig {
                specialize,
                ..EngineConfig::default()
            };
            let engine = Engine::with_config(&config);
            let compiled = engine.compile(&program).unwrap();
            let label = if specialize { "specialized" } else { "dynamic" };
            group.bench_with_input(BenchmarkId::new(*name, label), &compiled, |b, compiled| {
                b.iter(|| black_box(engine.run(compiled).unwrap()))
            });
        }
    }
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let program = JsParser::parse_to_ast_from_str(CLOSURES).unwrap();
    let options = CompileOptions::default();
    c.bench_function("compile closures", |b| {
        b.iter(|| compile_program(black_box(&program), &options).unwrap())
    });
}

criterion_group!(benches, bench_run, bench_compile);
criterion_main!(benches);
