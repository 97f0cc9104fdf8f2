//! Variable resolution and install pipeline benchmarks
//!
//! Run with: cargo bench --bench resolve

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::runtime::Runtime;

use plugsmith::config::InstallConfig;
use plugsmith::engine::DryRunEngineClient;
use plugsmith::plugins::{resolve, PluginManager};

fn variables() -> Map<String, Value> {
    let mut vars = Map::new();
    vars.insert("region".into(), json!("eu-west-1"));
    vars.insert("replicas".into(), json!(3));
    vars.insert("owner".into(), json!({"team": "platform"}));
    vars
}

fn record(i: usize) -> Value {
    json!({
        "name": format!("record-{}", i),
        "region": "{{region}}",
        "replicas": "{{replicas}}",
        "owner": "{{owner}}",
        "label": "{{region}}/{{replicas}}",
        "tags": ["seed", "{{region}}"],
    })
}

fn benchmark_resolve(c: &mut Criterion) {
    let vars = variables();
    let single = record(0);
    let batch = Value::Array((0..100).map(record).collect());

    let mut group = c.benchmark_group("resolve");

    group.throughput(Throughput::Elements(1));
    group.bench_function("single_record", |b| {
        b.iter(|| resolve(black_box(&single), &vars, false).unwrap());
    });

    group.throughput(Throughput::Elements(100));
    group.bench_function("array_of_100", |b| {
        b.iter(|| resolve(black_box(&batch), &vars, true).unwrap());
    });

    group.finish();
}

fn plugin_tree(groups: usize, records_per_file: usize) -> TempDir {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("plugin.json"),
        json!({"id": "bench", "name": "Bench", "version": "1.0.0", "variables": variables()})
            .to_string(),
    )
    .unwrap();

    for g in 0..groups {
        let dir = tmp.path().join(format!("group{}", g));
        std::fs::create_dir_all(&dir).unwrap();
        let deps: Vec<String> = (0..g).map(|d| format!("group{}", d)).collect();
        std::fs::write(
            dir.join("manifest.json"),
            json!({"target": format!("group{}", g), "dependencies": deps}).to_string(),
        )
        .unwrap();
        let records: Vec<Value> = (0..records_per_file).map(record).collect();
        std::fs::write(dir.join("seed.json"), Value::Array(records).to_string()).unwrap();
    }
    tmp
}

fn benchmark_install(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let tmp = plugin_tree(10, 50);

    let mut group = c.benchmark_group("install");
    group.throughput(Throughput::Elements(10 * 50 + 1));

    group.bench_function("dry_run_10x50", |b| {
        b.to_async(&rt).iter(|| async {
            let client = Arc::new(DryRunEngineClient::new());
            let manager = PluginManager::new(client, InstallConfig::default());
            let report = manager.install(black_box(tmp.path())).await.unwrap();
            assert!(report.is_success());
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_resolve, benchmark_install);
criterion_main!(benches);
