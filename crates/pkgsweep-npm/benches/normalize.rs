use pkgsweep_core::FetchOutcome;
use pkgsweep_npm::normalize;
use serde_json::{Value, json};

/// One registry document per line: `{"name": ..., "doc": {...}}`
fn load_docs(filename: &str) -> Vec<(String, FetchOutcome<Value>)> {
    let dir = std::env::var("BENCH_DATA_DIR")
        .expect("set BENCH_DATA_DIR to directory with sample data files");
    let path = std::path::Path::new(&dir).join(filename);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("{}: {e}", path.display()))
        .lines()
        .filter(|l| !l.is_empty())
        .map(|line| {
            let mut entry: Value = serde_json::from_str(line).unwrap();
            let name = entry["name"].as_str().unwrap().to_string();
            (name, FetchOutcome::Success(entry["doc"].take()))
        })
        .collect()
}

fn synthetic_doc(versions: usize) -> Value {
    let versions: serde_json::Map<String, Value> = (0..versions)
        .map(|i| {
            let manifest = json!({
                "dependencies": {"dep-a": "^1.0.0", "dep-b": "~2.1.0", "fsevents": "*"},
                "optionalDependencies": {"fsevents": "*"},
                "dist": {"shasum": format!("{i:040x}"), "integrity": "sha512-AAAA"}
            });
            (format!("1.0.{i}"), manifest)
        })
        .collect();
    json!({"name": "synthetic", "versions": versions})
}

#[divan::bench(args = [10, 100, 1000])]
fn normalize_synthetic(bencher: divan::Bencher, versions: usize) {
    let outcome = FetchOutcome::Success(synthetic_doc(versions));
    bencher.bench(|| normalize("synthetic", &outcome));
}

#[divan::bench]
fn normalize_sample(bencher: divan::Bencher) {
    let docs = load_docs("npm_docs.jsonl");
    bencher.bench(|| {
        for (name, outcome) in &docs {
            divan::black_box(normalize(name, outcome));
        }
    });
}

fn main() {
    divan::main();
}
