//! Configuration types for an archive migration run.
//!
//! All run behaviour is controlled through [`MigrationConfig`], built via its
//! [`MigrationConfigBuilder`]. The list of articles to migrate lives in a
//! separate [`crate::manifest::Manifest`] so the same config can drive any
//! archive.

use crate::error::MigrateError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Name of the content file written into each post directory.
pub const CONTENT_FILE_NAME: &str = "page.mdx";

/// Configuration for a migration run.
///
/// Built via [`MigrationConfig::builder()`] or using
/// [`MigrationConfig::default()`].
///
/// # Example
/// ```rust
/// use substack2mdx::MigrationConfig;
///
/// let config = MigrationConfig::builder()
///     .source_dir("export/posts")
///     .output_dir("app/posts")
///     .download_images(false)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct MigrationConfig {
    /// Directory holding the exported `<id>.<slug>.html` files. Default: `export/posts`.
    pub source_dir: PathBuf,

    /// Root under which `{slug}/page.mdx` is written. Default: `app/posts`.
    pub output_dir: PathBuf,

    /// Directory receiving downloaded images. Default: `public/images/posts`.
    pub images_dir: PathBuf,

    /// Public URL prefix used for image links in the body. Default: `/images/posts`.
    ///
    /// Must match wherever the site serves `images_dir` from; the transformer
    /// emits `![]({prefix}/{filename})`.
    pub image_url_prefix: String,

    /// Download discovered images. Default: true.
    ///
    /// Disable to regenerate article text without touching the network; image
    /// references are still assigned and counted as skipped.
    pub download_images: bool,

    /// How many images of one document may be in flight at once. Default: 1.
    ///
    /// Filenames are assigned by the transformer before any download starts,
    /// so raising this never changes output names, only wall-clock time.
    pub image_concurrency: usize,

    /// Per-request timeout for image downloads in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Maximum number of 301/302 hops followed per image. Default: 10.
    pub max_redirects: u32,

    /// Optional per-document / per-image progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("export/posts"),
            output_dir: PathBuf::from("app/posts"),
            images_dir: PathBuf::from("public/images/posts"),
            image_url_prefix: "/images/posts".to_string(),
            download_images: true,
            image_concurrency: 1,
            download_timeout_secs: 120,
            max_redirects: 10,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for MigrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationConfig")
            .field("source_dir", &self.source_dir)
            .field("output_dir", &self.output_dir)
            .field("images_dir", &self.images_dir)
            .field("image_url_prefix", &self.image_url_prefix)
            .field("download_images", &self.download_images)
            .field("image_concurrency", &self.image_concurrency)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("max_redirects", &self.max_redirects)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn MigrationProgressCallback>"),
            )
            .finish()
    }
}

impl MigrationConfig {
    /// Create a new builder for `MigrationConfig`.
    pub fn builder() -> MigrationConfigBuilder {
        MigrationConfigBuilder {
            config: Self::default(),
        }
    }

    /// Path of the artifact written for `slug`.
    pub fn artifact_path(&self, slug: &str) -> PathBuf {
        self.output_dir.join(slug).join(CONTENT_FILE_NAME)
    }
}

/// Builder for [`MigrationConfig`].
#[derive(Debug)]
pub struct MigrationConfigBuilder {
    config: MigrationConfig,
}

impl MigrationConfigBuilder {
    pub fn source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.source_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.images_dir = dir.into();
        self
    }

    pub fn image_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        self.config.image_url_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    pub fn download_images(mut self, v: bool) -> Self {
        self.config.download_images = v;
        self
    }

    pub fn image_concurrency(mut self, n: usize) -> Self {
        self.config.image_concurrency = n.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_redirects(mut self, hops: u32) -> Self {
        self.config.max_redirects = hops;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<MigrationConfig, MigrateError> {
        let c = &self.config;
        if c.image_concurrency == 0 {
            return Err(MigrateError::InvalidConfig(
                "Image concurrency must be ≥ 1".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(MigrateError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if !c.image_url_prefix.is_empty() && !c.image_url_prefix.starts_with('/') {
            return Err(MigrateError::InvalidConfig(format!(
                "Image URL prefix must be an absolute path, got '{}'",
                c.image_url_prefix
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_site_layout() {
        let c = MigrationConfig::default();
        assert_eq!(c.output_dir, PathBuf::from("app/posts"));
        assert_eq!(c.images_dir, PathBuf::from("public/images/posts"));
        assert_eq!(c.image_url_prefix, "/images/posts");
        assert_eq!(c.image_concurrency, 1);
        assert!(c.download_images);
    }

    #[test]
    fn artifact_path_is_keyed_by_slug() {
        let c = MigrationConfig::builder()
            .output_dir("/tmp/out")
            .build()
            .unwrap();
        assert_eq!(
            c.artifact_path("waist"),
            PathBuf::from("/tmp/out/waist/page.mdx")
        );
    }

    #[test]
    fn prefix_trailing_slash_is_trimmed() {
        let c = MigrationConfig::builder()
            .image_url_prefix("/img/")
            .build()
            .unwrap();
        assert_eq!(c.image_url_prefix, "/img");
    }

    #[test]
    fn relative_prefix_is_rejected() {
        let err = MigrationConfig::builder()
            .image_url_prefix("images")
            .build()
            .unwrap_err();
        assert!(matches!(err, MigrateError::InvalidConfig(_)));
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        let c = MigrationConfig::builder()
            .image_concurrency(0)
            .build()
            .unwrap();
        assert_eq!(c.image_concurrency, 1);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(MigrationConfig::builder()
            .download_timeout_secs(0)
            .build()
            .is_err());
    }
}
