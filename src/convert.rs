//! Batch orchestration: manifest in, `page.mdx` files and images out.
//!
//! Documents are processed strictly one at a time: read, transform, fetch
//! every image in discovery order, assemble, write. A missing image is
//! recorded and the batch moves on; a source that cannot be read or an
//! artifact that cannot be written stops the run, since every later document
//! would most likely hit the same problem.

use crate::config::MigrationConfig;
use crate::error::{FetchError, MigrateError};
use crate::manifest::{Manifest, SourceDocument};
use crate::output::{DocumentResult, FetchOutcome, ImageReference, MigrationOutput, MigrationStats};
use crate::pipeline::fetch::{self, FetchOptions};
use crate::pipeline::{assemble, transform};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Migrate every document in `manifest`.
///
/// # Returns
/// `Ok(MigrationOutput)` once every artifact is written, even if some images
/// failed (check `output.stats.images_failed`).
///
/// # Errors
/// Returns `Err(MigrateError)` only for fatal errors: an unreadable source
/// document, an unwritable output path, or an HTTP client that cannot be built.
pub async fn migrate(
    manifest: &Manifest,
    config: &MigrationConfig,
) -> Result<MigrationOutput, MigrateError> {
    let total_start = Instant::now();
    let total = manifest.posts.len();
    info!("Converting {} posts to MDX", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_migration_start(total);
    }

    let client = fetch::build_client(config.download_timeout_secs)?;
    let mut documents = Vec::with_capacity(total);

    for (i, doc) in manifest.posts.iter().enumerate() {
        let result = convert_document(&client, doc, config, i + 1, total).await?;
        documents.push(result);
    }

    let mut stats = MigrationStats {
        documents: documents.len(),
        ..MigrationStats::default()
    };
    for outcome in documents.iter().flat_map(|d| d.images.iter()) {
        stats.images_found += 1;
        if outcome.is_success() {
            stats.images_fetched += 1;
        } else if outcome.is_failure() {
            stats.images_failed += 1;
        } else {
            stats.images_skipped += 1;
        }
    }
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Done: {} posts, {}/{} images downloaded, {}ms total",
        stats.documents, stats.images_fetched, stats.images_found, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_migration_complete(stats.documents, stats.images_failed);
    }

    Ok(MigrationOutput { documents, stats })
}

/// Load the manifest at `manifest_path`, then [`migrate`] it.
pub async fn migrate_manifest_file(
    manifest_path: impl AsRef<Path>,
    config: &MigrationConfig,
) -> Result<MigrationOutput, MigrateError> {
    let manifest = Manifest::load(manifest_path).await?;
    migrate(&manifest, config).await
}

/// Synchronous wrapper around [`migrate`].
///
/// Creates a temporary tokio runtime internally.
pub fn migrate_sync(
    manifest: &Manifest,
    config: &MigrationConfig,
) -> Result<MigrationOutput, MigrateError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| MigrateError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(migrate(manifest, config))
}

/// Convert one document: read, transform, fetch images, write `page.mdx`.
///
/// `index` (1-based) and `total` are only used for progress events.
pub async fn convert_document(
    client: &Client,
    doc: &SourceDocument,
    config: &MigrationConfig,
    index: usize,
    total: usize,
) -> Result<DocumentResult, MigrateError> {
    info!("Converting: {}", doc.title);

    // ── Step 1: Read source ──────────────────────────────────────────────
    let html_path = config.source_dir.join(&doc.file);
    let html = tokio::fs::read_to_string(&html_path)
        .await
        .map_err(|source| MigrateError::SourceReadFailed {
            path: html_path.clone(),
            source,
        })?;

    // ── Step 2: Transform ────────────────────────────────────────────────
    let content =
        transform::transform_html_with_prefix(&html, &doc.slug, &config.image_url_prefix);
    debug!(
        "{}: {} chars of markdown, {} images",
        doc.slug,
        content.body.len(),
        content.images.len()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_document_start(index, total, &doc.slug, content.images.len());
    }

    // ── Step 3: Fetch images ─────────────────────────────────────────────
    let images = fetch_images(client, &doc.slug, &content.images, config).await;

    // ── Step 4: Assemble and write ───────────────────────────────────────
    let mdx = assemble::assemble_artifact(doc, &content.body);
    let artifact_path = config.artifact_path(&doc.slug);
    write_artifact(&artifact_path, &mdx).await?;
    info!("Created: {}", artifact_path.display());

    if let Some(ref cb) = config.progress_callback {
        cb.on_document_complete(index, total, &doc.slug);
    }

    Ok(DocumentResult {
        slug: doc.slug.clone(),
        artifact_path,
        images,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Fetch every image of one document.
///
/// `buffered` keeps outcomes in discovery order whatever the concurrency, and
/// filenames were fixed by the transformer before anything was dispatched.
async fn fetch_images(
    client: &Client,
    slug: &str,
    images: &[ImageReference],
    config: &MigrationConfig,
) -> Vec<FetchOutcome> {
    if !config.download_images {
        debug!("{}: skipping {} image downloads", slug, images.len());
        return images
            .iter()
            .map(|image| FetchOutcome {
                image: image.clone(),
                bytes: None,
                error: None,
            })
            .collect();
    }

    let options = FetchOptions {
        max_redirects: config.max_redirects,
        timeout_secs: config.download_timeout_secs,
    };

    stream::iter(
        images
            .iter()
            .map(|image| fetch_one(client, slug, image, config, options)),
    )
    .buffered(config.image_concurrency)
    .collect()
    .await
}

async fn fetch_one(
    client: &Client,
    slug: &str,
    image: &ImageReference,
    config: &MigrationConfig,
    options: FetchOptions,
) -> FetchOutcome {
    let dest = config.images_dir.join(&image.filename);
    info!("  Downloading: {}", image.filename);

    let result = if fetch::is_url(&image.remote_url) {
        fetch::fetch_image(client, &image.remote_url, &dest, &options).await
    } else {
        Err(FetchError::InvalidUrl {
            url: image.remote_url.clone(),
            detail: "not an http(s) URL".into(),
        })
    };

    match result {
        Ok(bytes) => {
            debug!("  Wrote {} ({} bytes)", dest.display(), bytes);
            if let Some(ref cb) = config.progress_callback {
                cb.on_image_complete(slug, &image.filename, bytes);
            }
            FetchOutcome {
                image: image.clone(),
                bytes: Some(bytes),
                error: None,
            }
        }
        Err(e) => {
            warn!("  Failed to download {}: {}", image.remote_url, e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_image_error(slug, &image.filename, &e.to_string());
            }
            FetchOutcome {
                image: image.clone(),
                bytes: None,
                error: Some(e),
            }
        }
    }
}

/// Atomic write: temp file beside the target, then rename.
async fn write_artifact(path: &Path, content: &str) -> Result<(), MigrateError> {
    let write_failed = |source: std::io::Error| MigrateError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("mdx.tmp");
    tokio::fs::write(&tmp_path, content)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(file: &str, slug: &str) -> SourceDocument {
        SourceDocument {
            file: file.into(),
            slug: slug.into(),
            title: "A \"Quoted\" Title".into(),
            date: "2024-03-26".into(),
            subtitle: String::new(),
        }
    }

    fn offline_config(root: &Path) -> MigrationConfig {
        MigrationConfig::builder()
            .source_dir(root.join("src"))
            .output_dir(root.join("out"))
            .images_dir(root.join("img"))
            .download_images(false)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn writes_artifact_without_downloading() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(
            dir.path().join("src/1.post.html"),
            r#"<p>Hello <em>world</em></p><img src="https://h/a.png">"#,
        )
        .unwrap();

        let manifest = Manifest {
            posts: vec![doc("1.post.html", "post")],
        };
        let config = offline_config(dir.path());
        let out = migrate(&manifest, &config).await.unwrap();

        assert_eq!(out.stats.documents, 1);
        assert_eq!(out.stats.images_found, 1);
        assert_eq!(out.stats.images_skipped, 1);
        assert_eq!(out.stats.images_failed, 0);
        assert!(!dir.path().join("img").exists());

        let mdx = std::fs::read_to_string(dir.path().join("out/post/page.mdx")).unwrap();
        assert!(mdx.starts_with("export const metadata = {\n  title: \"A \\\"Quoted\\\" Title\","));
        assert!(mdx.contains("# A \"Quoted\" Title\n\nHello *world*\n\n![](/images/posts/post-0.png)\n"));
    }

    #[tokio::test]
    async fn rerun_overwrites_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.html"), "<p>same</p>").unwrap();

        let manifest = Manifest {
            posts: vec![doc("a.html", "a")],
        };
        let config = offline_config(dir.path());
        migrate(&manifest, &config).await.unwrap();
        let first = std::fs::read_to_string(config.artifact_path("a")).unwrap();
        migrate(&manifest, &config).await.unwrap();
        let second = std::fs::read_to_string(config.artifact_path("a")).unwrap();

        assert_eq!(first, second);
        assert!(!config.artifact_path("a").with_extension("mdx.tmp").exists());
    }

    #[tokio::test]
    async fn missing_source_aborts_batch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/b.html"), "<p>b</p>").unwrap();

        let manifest = Manifest {
            posts: vec![doc("missing.html", "a"), doc("b.html", "b")],
        };
        let config = offline_config(dir.path());
        let err = migrate(&manifest, &config).await.unwrap_err();

        assert!(matches!(err, MigrateError::SourceReadFailed { .. }));
        assert!(!config.artifact_path("b").exists(), "later documents must not run");
    }

    #[tokio::test]
    async fn non_http_image_is_recorded_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(
            dir.path().join("src/c.html"),
            r#"<img src="data:image/png;base64,AAAA"><p>text</p>"#,
        )
        .unwrap();

        let manifest = Manifest {
            posts: vec![doc("c.html", "c")],
        };
        let config = MigrationConfig::builder()
            .source_dir(dir.path().join("src"))
            .output_dir(dir.path().join("out"))
            .images_dir(dir.path().join("img"))
            .build()
            .unwrap();
        let out = migrate(&manifest, &config).await.unwrap();

        assert_eq!(out.stats.images_failed, 1);
        let failed: Vec<_> = out.failed_images().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "c");
        assert!(matches!(
            failed[0].1.error,
            Some(FetchError::InvalidUrl { .. })
        ));
        assert!(config.artifact_path("c").exists());
    }
}
