// benches/rewrite_bench.rs
//! Rewriter and codec throughput

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use modmock_engine::{MetadataCodec, MockRegistry, MockingInfos, SourceRewriter};
use serde_json::json;

fn sample_source(imports: usize) -> String {
    let mut source = String::new();
    for i in 0..imports {
        source.push_str(&format!("import dep{i}, {{ a{i}, b{i} as c{i} }} from \"./deps/dep{i}.js\";\n"));
    }
    source.push_str("// import ignored from './ignored.js';\n");
    source.push_str("export function run() { return 42; }\n");
    source
}

fn bench_rewrite(c: &mut Criterion) {
    let rewriter = SourceRewriter::default();
    let source = sample_source(50);
    let infos = MockingInfos {
        token: "01HZX0000000000000000000".to_string(),
        module_identifier: "file:///project/src/target.js".to_string(),
        dependency_identifiers: (0..50)
            .step_by(2)
            .map(|i| format!("file:///project/src/deps/dep{}.js", i))
            .collect(),
    };

    c.bench_function("rewrite_50_imports", |b| {
        b.iter(|| rewriter.rewrite(black_box(&source), black_box(&infos)).unwrap())
    });
}

fn bench_codec(c: &mut Criterion) {
    let codec = MetadataCodec::default();
    let registry = MockRegistry::new();

    c.bench_function("encode_decode_10_deps", |b| {
        b.iter(|| {
            let deps = (0..10).map(|i| (format!("./dep{}.js", i), json!({ "default": i })));
            let specifier = codec
                .encode(&registry, "./target.js", "file:///project/test/suite.js", deps)
                .unwrap();
            let infos = codec.decode(black_box(&specifier)).unwrap();
            registry.remove_token(&infos.token);
        })
    });
}

criterion_group!(benches, bench_rewrite, bench_codec);
criterion_main!(benches);
