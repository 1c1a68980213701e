#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use refsplit_core::{Notice, Reporter};
use tracing::info;

pub fn init_tracing() {
    // should be run once, fail otherwise, we skip that error
    let _ = tracing_subscriber::fmt()
        .pretty()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    info!("Tracing initialized");
}

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn output_dir(name: &str) -> PathBuf {
    Path::new(env!("CARGO_TARGET_TMPDIR"))
        .join("refsplit")
        .join(name)
}

pub async fn read(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(error) => panic!("fail to read {}: {error}", path.display()),
    }
}

/// Lists files under `root`, relative and sorted.
pub fn list_files(root: &Path) -> Vec<String> {
    fn visit(root: &Path, dir: &Path, files: &mut Vec<String>) {
        let entries = std::fs::read_dir(dir).expect("readable directory");
        for entry in entries {
            let path = entry.expect("readable entry").path();
            if path.is_dir() {
                visit(root, &path, files);
            } else {
                let relative = path.strip_prefix(root).expect("a file under root");
                files.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }

    let mut files = Vec::new();
    visit(root, root, &mut files);
    files.sort();
    files
}

#[derive(Debug, Clone, Default)]
pub struct RecordingReporter(Arc<Mutex<Vec<Notice>>>);

impl RecordingReporter {
    pub fn notices(&self) -> Vec<Notice> {
        self.0.lock().expect("reporter lock").clone()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, notice: &Notice) {
        self.0.lock().expect("reporter lock").push(notice.clone());
    }
}
