//! Sinks for responses with an unexpected status

use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// Records the URL of a response that was neither 200 nor 404
pub trait DebugSink: Send + Sync {
    fn record(&self, status: u16, url: &str);
}

/// Writes one marker file per status code, `error <status>`, holding the
/// last URL that produced it
#[derive(Debug, Clone)]
pub struct FileDebugSink {
    dir: PathBuf,
}

impl FileDebugSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn marker_path(&self, status: u16) -> PathBuf {
        self.dir.join(format!("error {}", status))
    }
}

impl DebugSink for FileDebugSink {
    fn record(&self, status: u16, url: &str) {
        let path = self.marker_path(status);
        let result = fs::create_dir_all(&self.dir).and_then(|_| fs::write(&path, url));
        if let Err(e) = result {
            warn!("Failed to write debug marker {}: {}", path.display(), e);
        }
    }
}

/// Discards every record
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDebugSink;

impl DebugSink for NullDebugSink {
    fn record(&self, _status: u16, _url: &str) {}
}
