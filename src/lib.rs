//! # substack2mdx
//!
//! Migrate an exported Substack archive to MDX blog posts, and validate that
//! the resulting posts carry the SEO metadata the site expects.
//!
//! ## Pipeline Overview
//!
//! ```text
//! posts.toml + export/posts/*.html
//!  │
//!  ├─ 1. Manifest   load and check slugs, dates, file names
//!  ├─ 2. Transform  HTML → Markdown, collect images as {slug}-{n}.{ext}
//!  ├─ 3. Fetch      download each image (301/302 followed) to public/images/posts
//!  ├─ 4. Assemble   `export const metadata = {…}` + `# Title` + body
//!  └─ 5. Write      app/posts/{slug}/page.mdx
//!
//! app/posts/*/page.mdx ──▶ Validate  title/date/description, canonical,
//!                                     openGraph.images, <PostSchema> props
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use substack2mdx::{migrate_manifest_file, validate_posts, MigrationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MigrationConfig::default();
//!     let output = migrate_manifest_file("posts.toml", &config).await?;
//!     eprintln!("{} posts, {} images failed",
//!         output.stats.documents,
//!         output.stats.images_failed);
//!
//!     let report = validate_posts("app/posts").await?;
//!     eprintln!("{} error(s)", report.error_count());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `substack2mdx` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod validate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{MigrationConfig, MigrationConfigBuilder, CONTENT_FILE_NAME};
pub use convert::{convert_document, migrate, migrate_manifest_file, migrate_sync};
pub use error::{FetchError, MigrateError, ValidationIssue};
pub use manifest::{Manifest, SourceDocument};
pub use output::{
    DocumentResult, FetchOutcome, ImageReference, MigrationOutput, MigrationStats,
    TransformedContent,
};
pub use pipeline::assemble::assemble_artifact;
pub use pipeline::fetch::{fetch_image, FetchOptions};
pub use pipeline::transform::{transform_html, transform_html_with_prefix};
pub use progress::{MigrationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use validate::{validate_post, validate_posts, PostReport, ValidationReport};
