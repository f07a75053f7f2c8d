//! The list of articles to migrate, loaded from a TOML manifest.
//!
//! ```toml
//! [[posts]]
//! file = "137157899.waist.html"
//! slug = "waist"
//! title = "W.A.I.S.T."
//! date = "2023-09-18"
//! subtitle = ""
//! ```

use crate::error::MigrateError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// One article to migrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Export file name, relative to the configured source directory.
    pub file: String,
    /// URL-safe identifier; names the output directory and image files.
    pub slug: String,
    pub title: String,
    /// Publication date, `YYYY-MM-DD`.
    pub date: String,
    #[serde(default)]
    pub subtitle: String,
}

/// Every article of one archive, in migration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub posts: Vec<SourceDocument>,
}

static RE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

impl Manifest {
    /// Parse and validate a manifest from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, MigrateError> {
        let manifest: Self = toml::from_str(content)
            .map_err(|e| MigrateError::InvalidManifest(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load, parse and validate a manifest file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, MigrateError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MigrateError::ManifestNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                MigrateError::SourceReadFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let manifest: Self =
            toml::from_str(&content).map_err(|source| MigrateError::ManifestParse {
                path: path.to_path_buf(),
                source,
            })?;
        manifest.validate()?;

        debug!(
            "Loaded manifest {} with {} posts",
            path.display(),
            manifest.posts.len()
        );
        Ok(manifest)
    }

    /// Check the invariants the orchestrator relies on.
    ///
    /// Slugs become directory names and filename stems, so they must be
    /// non-empty, URL-safe and unique; one artifact exists per slug.
    pub fn validate(&self) -> Result<(), MigrateError> {
        if self.posts.is_empty() {
            return Err(MigrateError::InvalidManifest(
                "manifest lists no posts".into(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.posts.len());
        for post in &self.posts {
            if !is_valid_slug(&post.slug) {
                return Err(MigrateError::InvalidManifest(format!(
                    "slug '{}' must be non-empty and contain only ASCII letters, digits, '-' or '_'",
                    post.slug
                )));
            }
            if !seen.insert(post.slug.as_str()) {
                return Err(MigrateError::InvalidManifest(format!(
                    "duplicate slug '{}'",
                    post.slug
                )));
            }
            if post.file.trim().is_empty() {
                return Err(MigrateError::InvalidManifest(format!(
                    "post '{}' has an empty file name",
                    post.slug
                )));
            }
            if post.title.contains(['\n', '\r']) {
                return Err(MigrateError::InvalidManifest(format!(
                    "post '{}' has a line break in its title",
                    post.slug
                )));
            }
            if !RE_DATE.is_match(&post.date) {
                return Err(MigrateError::InvalidManifest(format!(
                    "post '{}' has date '{}', expected YYYY-MM-DD",
                    post.slug, post.date
                )));
            }
        }
        Ok(())
    }
}

/// A slug is usable as a path segment and a filename stem.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
