//! Result types produced by the transformer and the orchestrator.

use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An image discovered while transforming a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    /// Resolved origin URL the bytes are downloaded from.
    pub remote_url: String,
    /// `{slug}-{index}.{ext}`, unique within the document.
    pub filename: String,
}

/// Output of [`crate::pipeline::transform::transform_html`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformedContent {
    /// Markdown/MDX body, trimmed, without front-matter.
    pub body: String,
    /// Images in order of first appearance.
    pub images: Vec<ImageReference>,
}

/// What happened to one discovered image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub image: ImageReference,
    /// Bytes written, `None` when the download failed or was skipped.
    pub bytes: Option<u64>,
    pub error: Option<FetchError>,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        self.bytes.is_some()
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Per-document result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    pub slug: String,
    /// Where `page.mdx` was written.
    pub artifact_path: PathBuf,
    /// One entry per discovered image, in discovery order.
    pub images: Vec<FetchOutcome>,
}

/// Aggregate statistics for a migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStats {
    pub documents: usize,
    pub images_found: usize,
    pub images_fetched: usize,
    pub images_failed: usize,
    /// Images not attempted because downloads were disabled.
    pub images_skipped: usize,
    pub total_duration_ms: u64,
}

/// Everything a migration run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationOutput {
    pub documents: Vec<DocumentResult>,
    pub stats: MigrationStats,
}

impl MigrationOutput {
    /// Every failed image across all documents, as `(slug, outcome)`.
    pub fn failed_images(&self) -> impl Iterator<Item = (&str, &FetchOutcome)> {
        self.documents.iter().flat_map(|d| {
            d.images
                .iter()
                .filter(|o| o.is_failure())
                .map(move |o| (d.slug.as_str(), o))
        })
    }
}
