// Configuration module

use crate::fetcher::FetcherConfig;
use crate::stamper::WatermarkSpec;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration, loaded from YAML. Every field has a default so
/// running without a config file yields a fully working setup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub watermark: WatermarkSpec,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Network settings for the document fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum document size in MB before the fetch is rejected (default: 100)
    #[serde(default = "default_max_document_mb")]
    pub max_document_mb: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_document_mb() -> u64 {
    100
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_document_mb: default_max_document_mb(),
        }
    }
}

impl FetchConfig {
    /// Convert into the fetcher's runtime configuration.
    pub fn to_fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            max_document_bytes: (self.max_document_mb as usize) * 1024 * 1024,
        }
    }
}

/// Where finished artifacts land.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Output directory for watermarked PDFs (default: "downloads")
    #[serde(default = "default_download_dir")]
    pub dir: PathBuf,
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            dir: default_download_dir(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.watermark.text, "Crack BATU");
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.fetch.max_document_mb, 100);
        assert_eq!(config.download.dir, PathBuf::from("downloads"));
    }

    #[test]
    fn test_from_file_with_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "watermark:\n  text: Sample Text\n  center_font_size: 36\nfetch:\n  timeout_secs: 5\ndownload:\n  dir: /tmp/papers\n"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.watermark.text, "Sample Text");
        assert_eq!(config.watermark.center_font_size, 36);
        // Untouched fields keep their defaults.
        assert_eq!(config.watermark.corner_font_size, 12);
        assert_eq!(config.fetch.timeout_secs, 5);
        assert_eq!(config.download.dir, PathBuf::from("/tmp/papers"));
    }

    #[test]
    fn test_from_file_empty_sections_use_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "fetch:\n  timeout_secs: 10\n").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.fetch.timeout_secs, 10);
        assert_eq!(config.watermark.text, "Crack BATU");
    }

    #[test]
    fn test_from_file_missing_is_error() {
        assert!(Config::from_file(Path::new("/nonexistent/config.yaml")).is_err());
    }

    #[test]
    fn test_to_fetcher_config() {
        let fetch = FetchConfig {
            timeout_secs: 10,
            max_document_mb: 2,
        };
        let fetcher = fetch.to_fetcher_config();
        assert_eq!(fetcher.timeout, Duration::from_secs(10));
        assert_eq!(fetcher.max_document_bytes, 2 * 1024 * 1024);
    }
}
