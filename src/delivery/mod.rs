//! Delivery orchestration.
//!
//! Runs the full pipeline for one download request:
//! Resolving → Fetching → Stamping → Packaging → Saved. A failure at any
//! stage after Resolving transitions to Fallback, which hands the original
//! share URL to the sink exactly once. Fallback is a designed degrade
//! path, not an error: `deliver` never raises, and every request ends in
//! a terminal state.
//!
//! The document source, artifact sink, and status notifier are trait
//! seams so the adapter runs unchanged against the real fetcher and
//! filesystem sink or against in-memory test doubles.

use crate::constants::FILENAME_BRAND_SUFFIX;
use crate::error::PipelineError;
use crate::fetcher::DocumentSource;
use crate::resolver;
use crate::stamper::{self, WatermarkSpec};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Catalog entry handed in when the user triggers a download.
#[derive(Debug, Clone)]
pub struct DocumentReference {
    /// Share link as stored in the catalog (not directly fetchable).
    pub share_url: String,
    /// Display title of the paper.
    pub title: String,
    /// Year label of the paper.
    pub year: String,
}

/// Terminal artifact handed to the sink.
#[derive(Debug, Clone)]
pub struct DownloadableArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
}

/// Stages a request moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Resolving,
    Fetching,
    Stamping,
    Packaging,
    Saved,
    Fallback,
}

impl DeliveryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryState::Resolving => "resolving",
            DeliveryState::Fetching => "fetching",
            DeliveryState::Stamping => "stamping",
            DeliveryState::Packaging => "packaging",
            DeliveryState::Saved => "saved",
            DeliveryState::Fallback => "fallback",
        }
    }
}

/// Terminal outcome of a delivery request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The watermarked artifact was saved under the given filename.
    Saved(String),
    /// The pipeline failed and the original share URL was opened instead.
    Fallback,
    /// A request for the same document was already in flight; nothing ran.
    AlreadyInFlight,
}

/// User-facing status events emitted as the request progresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryEvent {
    /// Watermarking started for the given title.
    Processing { title: String },
    /// The watermarked PDF was saved.
    Saved { filename: String },
    /// The pipeline failed; the original link was opened instead.
    FallbackUsed { share_url: String },
}

/// Receiver for status events (toast layer in the original front end).
pub trait StatusNotifier: Send + Sync {
    fn notify(&self, event: DeliveryEvent);
}

/// Notifier that forwards events to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl StatusNotifier for LogNotifier {
    fn notify(&self, event: DeliveryEvent) {
        match event {
            DeliveryEvent::Processing { title } => {
                tracing::info!(title = %title, "Adding watermark to PDF");
            }
            DeliveryEvent::Saved { filename } => {
                tracing::info!(filename = %filename, "PDF downloaded with watermark");
            }
            DeliveryEvent::FallbackUsed { share_url } => {
                tracing::warn!(share_url = %share_url, "Falling back to direct link");
            }
        }
    }
}

/// Destination for finished artifacts and fallback links (the browser
/// save/open boundary in the original front end).
pub trait DeliverySink: Send + Sync {
    /// Persist the artifact. An I/O failure here counts as a Packaging
    /// failure and triggers the fallback path.
    fn save_artifact(&self, artifact: &DownloadableArtifact) -> std::io::Result<()>;

    /// Open the original, unwatermarked share URL.
    fn open_fallback(&self, share_url: &str);
}

/// Tracks which documents currently have a download in flight, so a front
/// end can disable the triggering control per document while leaving
/// requests for other documents independent.
#[derive(Clone, Default)]
pub struct InFlightRegistry {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as in flight. Returns `None` while another request for
    /// the same key holds a guard.
    pub fn try_begin(&self, key: &str) -> Option<InFlightGuard> {
        let mut set = self.inner.lock();
        if !set.insert(key.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            registry: Arc::clone(&self.inner),
            key: key.to_string(),
        })
    }

    /// Whether a request for `key` is currently in flight.
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.inner.lock().contains(key)
    }
}

/// RAII marker; dropping it releases the key.
pub struct InFlightGuard {
    registry: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.key);
    }
}

/// Build the download filename from title and year.
///
/// Non-alphanumeric characters are normalized to underscores so the name
/// is safe on every filesystem.
pub fn safe_filename(title: &str, year: &str) -> String {
    let sanitize = |value: &str| -> String {
        value
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    };
    format!(
        "{}_{}_{}.pdf",
        sanitize(title),
        sanitize(year),
        FILENAME_BRAND_SUFFIX
    )
}

/// Orchestrates one download request end to end.
pub struct DeliveryAdapter {
    source: Arc<dyn DocumentSource>,
    sink: Arc<dyn DeliverySink>,
    notifier: Arc<dyn StatusNotifier>,
    spec: WatermarkSpec,
    in_flight: InFlightRegistry,
}

impl DeliveryAdapter {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        sink: Arc<dyn DeliverySink>,
        notifier: Arc<dyn StatusNotifier>,
        spec: WatermarkSpec,
    ) -> Self {
        Self {
            source,
            sink,
            notifier,
            spec,
            in_flight: InFlightRegistry::new(),
        }
    }

    /// Run the pipeline for one document. Never raises: every request
    /// terminates in `Saved`, `Fallback`, or the in-flight skip.
    pub async fn deliver(&self, doc_ref: &DocumentReference) -> DeliveryOutcome {
        let _guard = match self.in_flight.try_begin(&doc_ref.share_url) {
            Some(guard) => guard,
            None => {
                tracing::debug!(share_url = %doc_ref.share_url, "Download already in flight");
                return DeliveryOutcome::AlreadyInFlight;
            }
        };

        self.notifier.notify(DeliveryEvent::Processing {
            title: doc_ref.title.clone(),
        });

        match self.run_pipeline(doc_ref).await {
            Ok(filename) => {
                self.transition(doc_ref, DeliveryState::Saved);
                self.notifier.notify(DeliveryEvent::Saved {
                    filename: filename.clone(),
                });
                DeliveryOutcome::Saved(filename)
            }
            Err(error) => {
                tracing::warn!(
                    share_url = %doc_ref.share_url,
                    error = %error,
                    "Pipeline failed; opening original link"
                );
                self.transition(doc_ref, DeliveryState::Fallback);
                self.sink.open_fallback(&doc_ref.share_url);
                self.notifier.notify(DeliveryEvent::FallbackUsed {
                    share_url: doc_ref.share_url.clone(),
                });
                DeliveryOutcome::Fallback
            }
        }
    }

    async fn run_pipeline(&self, doc_ref: &DocumentReference) -> Result<String, PipelineError> {
        self.transition(doc_ref, DeliveryState::Resolving);
        let direct_url = resolver::resolve_direct_url(&doc_ref.share_url);

        self.transition(doc_ref, DeliveryState::Fetching);
        let raw = self.source.fetch(&direct_url).await?;

        self.transition(doc_ref, DeliveryState::Stamping);
        let stamped = stamper::stamp(&raw, &self.spec)?;

        self.transition(doc_ref, DeliveryState::Packaging);
        let artifact = DownloadableArtifact {
            bytes: stamped,
            filename: safe_filename(&doc_ref.title, &doc_ref.year),
        };
        self.sink
            .save_artifact(&artifact)
            .map_err(|e| PipelineError::Render(format!("failed to persist artifact: {}", e)))?;

        Ok(artifact.filename)
    }

    fn transition(&self, doc_ref: &DocumentReference, state: DeliveryState) {
        tracing::debug!(
            share_url = %doc_ref.share_url,
            state = state.as_str(),
            "Delivery state transition"
        );
    }
}
