//! Benchmarks for the built-in stylesheet minifier and gzip encoder.

use assetflow::stages::{gzip, minify_css};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn stylesheet(rules: usize) -> String {
    let mut css = String::from("/*! vendor bundle */\n");
    for i in 0..rules {
        css.push_str(&format!(
            "/* rule {i} */\n.col-md-{i} > .row ,\n.btn-{i}:hover {{\n  margin : 0 auto ;\n  content: \"{i}  ;  \";\n}}\n\n"
        ));
    }
    css
}

fn minify_benchmark(c: &mut Criterion) {
    let small = stylesheet(50);
    let large = stylesheet(5_000);

    c.bench_function("minify_css_small", |b| b.iter(|| minify_css(black_box(&small))));
    c.bench_function("minify_css_large", |b| b.iter(|| minify_css(black_box(&large))));

    let minified = minify_css(&large);
    c.bench_function("gzip_minified", |b| {
        b.iter(|| gzip(black_box(minified.as_bytes())))
    });
}

criterion_group!(benches, minify_benchmark);
criterion_main!(benches);
