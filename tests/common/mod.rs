//! Shared fixtures: on-disk bundles and a recording result sink.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;

use nizk_mobile_bench::{BenchmarkKind, ResultSink};

/// Write both artifacts of `kind` into `dir`, with contents derived from the slug.
pub fn write_bundle(dir: &Path, kind: BenchmarkKind) {
    let pair = kind.artifacts();
    std::fs::write(dir.join(pair.circuit.as_str()), format!("r1cs:{}", kind.slug())).unwrap();
    std::fs::write(dir.join(pair.witness.as_str()), format!("wtns:{}", kind.slug())).unwrap();
}

#[derive(Default)]
pub struct RecordingSink {
    pub results: Mutex<Vec<(BenchmarkKind, String, std::thread::ThreadId)>>,
    pub notices: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn total(&self) -> usize {
        self.results.lock().unwrap().len() + self.notices.lock().unwrap().len()
    }

    pub fn result_for(&self, kind: BenchmarkKind) -> Option<String> {
        self.results
            .lock()
            .unwrap()
            .iter()
            .find(|(k, _, _)| *k == kind)
            .map(|(_, text, _)| text.clone())
    }
}

impl ResultSink for RecordingSink {
    fn show_result(&self, kind: BenchmarkKind, text: &str) {
        self.results
            .lock()
            .unwrap()
            .push((kind, text.to_string(), std::thread::current().id()));
    }

    fn show_notice(&self, text: &str) {
        self.notices.lock().unwrap().push(text.to_string());
    }
}
