//! Progress-callback trait for per-document and per-image migration events.
//!
//! Inject an [`Arc<dyn MigrationProgressCallback>`] via
//! [`crate::config::MigrationConfigBuilder::progress_callback`] to receive
//! events as the orchestrator works through the manifest. The CLI uses it to
//! drive a terminal progress bar; library callers can forward events anywhere.
//!
//! # Example
//!
//! ```rust
//! use substack2mdx::{MigrationConfig, MigrationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FailedImages {
//!     count: AtomicUsize,
//! }
//!
//! impl MigrationProgressCallback for FailedImages {
//!     fn on_image_error(&self, slug: &str, filename: &str, error: &str) {
//!         self.count.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{slug}: {filename} failed: {error}");
//!     }
//! }
//!
//! let config = MigrationConfig::builder()
//!     .progress_callback(Arc::new(FailedImages { count: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes each document and image.
///
/// Implementations must be `Send + Sync`; with `image_concurrency > 1` the
/// image events of one document may arrive from concurrently running futures.
/// All methods have default no-op implementations.
pub trait MigrationProgressCallback: Send + Sync {
    /// Called once before the first document is read.
    fn on_migration_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called after a document has been transformed, before its images are fetched.
    ///
    /// # Arguments
    /// * `index`        — 1-indexed position in the manifest
    /// * `total`        — number of documents in the manifest
    /// * `slug`         — the document's slug
    /// * `image_count`  — images discovered in the document
    fn on_document_start(&self, index: usize, total: usize, slug: &str, image_count: usize) {
        let _ = (index, total, slug, image_count);
    }

    /// Called when an image has been written to disk.
    fn on_image_complete(&self, slug: &str, filename: &str, bytes: u64) {
        let _ = (slug, filename, bytes);
    }

    /// Called when an image download failed. The batch continues.
    fn on_image_error(&self, slug: &str, filename: &str, error: &str) {
        let _ = (slug, filename, error);
    }

    /// Called once the artifact for a document has been written.
    fn on_document_complete(&self, index: usize, total: usize, slug: &str) {
        let _ = (index, total, slug);
    }

    /// Called once after every document has been written.
    ///
    /// # Arguments
    /// * `total_documents` — documents written
    /// * `failed_images`   — images that could not be downloaded
    fn on_migration_complete(&self, total_documents: usize, failed_images: usize) {
        let _ = (total_documents, failed_images);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl MigrationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::MigrationConfig`].
pub type ProgressCallback = Arc<dyn MigrationProgressCallback>;
