//! Filesystem delivery sink.
//!
//! CLI counterpart of the browser save/open boundary: artifacts are
//! written into the configured download directory, and the fallback path
//! surfaces the original share link instead of opening a browser tab.

use crate::delivery::{DeliverySink, DownloadableArtifact};
use std::fs;
use std::path::PathBuf;

/// Sink writing artifacts under a download directory.
#[derive(Debug, Clone)]
pub struct FsSink {
    download_dir: PathBuf,
}

impl FsSink {
    pub fn new(download_dir: PathBuf) -> Self {
        Self { download_dir }
    }

    /// Full path an artifact with the given filename would be written to.
    pub fn artifact_path(&self, filename: &str) -> PathBuf {
        self.download_dir.join(filename)
    }
}

impl DeliverySink for FsSink {
    fn save_artifact(&self, artifact: &DownloadableArtifact) -> std::io::Result<()> {
        fs::create_dir_all(&self.download_dir)?;
        let path = self.artifact_path(&artifact.filename);
        fs::write(&path, &artifact.bytes)?;
        tracing::info!(path = %path.display(), size = artifact.bytes.len(), "Saved artifact");
        Ok(())
    }

    fn open_fallback(&self, share_url: &str) {
        // No browsing context to open from a CLI; surfacing the link is
        // the degraded-success analogue.
        println!("Download the original file directly: {}", share_url);
        tracing::info!(share_url = %share_url, "Surfaced original link as fallback");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_artifact_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path().to_path_buf());
        let artifact = DownloadableArtifact {
            bytes: b"%PDF-fake".to_vec(),
            filename: "Paper_2023_CrackBATU.pdf".to_string(),
        };

        sink.save_artifact(&artifact).unwrap();

        let written = fs::read(dir.path().join("Paper_2023_CrackBATU.pdf")).unwrap();
        assert_eq!(written, b"%PDF-fake");
    }

    #[test]
    fn test_save_artifact_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("downloads").join("pyqs");
        let sink = FsSink::new(nested.clone());
        let artifact = DownloadableArtifact {
            bytes: vec![1, 2, 3],
            filename: "x.pdf".to_string(),
        };

        sink.save_artifact(&artifact).unwrap();

        assert!(nested.join("x.pdf").exists());
    }

    #[test]
    fn test_artifact_path() {
        let sink = FsSink::new(PathBuf::from("/tmp/downloads"));
        assert_eq!(
            sink.artifact_path("a.pdf"),
            PathBuf::from("/tmp/downloads/a.pdf")
        );
    }
}
