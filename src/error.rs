//! Error types for the substack2mdx library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`MigrateError`] — **Fatal**: the run cannot proceed (manifest missing or
//!   invalid, a source document unreadable, an artifact could not be written).
//!   Returned as `Err(MigrateError)` from [`crate::migrate`] and friends.
//!
//! * [`FetchError`] — **Non-fatal**: a single image could not be downloaded.
//!   Stored inside [`crate::output::FetchOutcome`]; the article is still
//!   written, only that image is missing from the output tree.
//!
//! * [`ValidationIssue`] — a finding about one post file. Its `Display` is the
//!   exact line printed by `substack2mdx validate`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the substack2mdx library.
#[derive(Debug, Error)]
pub enum MigrateError {
    // ── Manifest errors ───────────────────────────────────────────────────
    /// Manifest file was not found at the given path.
    #[error("Manifest not found: '{path}'\nCheck the path exists and is readable.")]
    ManifestNotFound { path: PathBuf },

    /// Manifest is not valid TOML or does not match the expected shape.
    #[error("Failed to parse manifest '{path}': {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Manifest parsed but its contents break an invariant.
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// A source HTML document could not be read.
    #[error("Failed to read source document '{path}': {source}")]
    SourceReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write an output artifact or directory.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The posts directory to validate could not be listed.
    #[error("Failed to read posts directory '{path}': {source}")]
    PostsDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image download.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FetchError {
    /// The URL (or a redirect target) could not be parsed.
    #[error("Invalid URL '{url}': {detail}")]
    InvalidUrl { url: String, detail: String },

    /// Transport-level failure (DNS, TLS, connection reset, body read).
    #[error("Request to '{url}' failed: {detail}")]
    RequestFailed { url: String, detail: String },

    /// The request exceeded the configured timeout.
    #[error("Request to '{url}' timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// Server answered with a status that is neither success nor a followed redirect.
    #[error("HTTP {status} for '{url}'")]
    HttpStatus { url: String, status: u16 },

    /// A 301/302 response had no usable `Location` header.
    #[error("Redirect from '{url}' has no Location header")]
    MissingLocation { url: String },

    /// The redirect chain exceeded the hop limit.
    #[error("Too many redirects ({hops}) starting at '{url}'")]
    TooManyRedirects { url: String, hops: u32 },

    /// The image bytes could not be written to disk.
    #[error("Failed to write '{path}': {detail}")]
    WriteFailed { path: PathBuf, detail: String },
}

/// One problem found in a post by [`crate::validate::validate_posts`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// The post directory has no content file.
    #[error("{file} not found")]
    ContentFileMissing { file: String },

    /// The content file exists but could not be read.
    #[error("{file} could not be read: {detail}")]
    ContentFileUnreadable { file: String, detail: String },

    /// No `export const metadata = { … }` block could be located.
    #[error("no metadata export found")]
    NoMetadataExport,

    /// A required top-level metadata key is absent.
    #[error("missing metadata.{field}")]
    MissingField { field: String },

    #[error("missing alternates.canonical")]
    MissingCanonical,

    #[error("missing openGraph")]
    MissingOpenGraph,

    #[error("missing openGraph.images")]
    MissingOpenGraphImages,

    /// The body does not contain the structured-data component.
    #[error("missing <{component}> component")]
    MissingSchemaComponent { component: String },

    /// A structured-data prop differs from the metadata value it restates.
    #[error("{component} {prop} \"{found}\" does not match metadata {prop} \"{expected}\"")]
    SchemaMismatch {
        component: String,
        prop: String,
        found: String,
        expected: String,
    },

    /// The structured-data slug differs from the post directory name.
    #[error("{component} slug \"{found}\" does not match directory \"{expected}\"")]
    SlugMismatch {
        component: String,
        found: String,
        expected: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_display() {
        let e = ValidationIssue::MissingField {
            field: "date".into(),
        };
        assert_eq!(e.to_string(), "missing metadata.date");
    }

    #[test]
    fn schema_mismatch_display() {
        let e = ValidationIssue::SchemaMismatch {
            component: "PostSchema".into(),
            prop: "title".into(),
            found: "Old".into(),
            expected: "New".into(),
        };
        assert_eq!(
            e.to_string(),
            "PostSchema title \"Old\" does not match metadata title \"New\""
        );
    }

    #[test]
    fn slug_mismatch_display() {
        let e = ValidationIssue::SlugMismatch {
            component: "PostSchema".into(),
            found: "waist-old".into(),
            expected: "waist".into(),
        };
        assert!(e.to_string().contains("does not match directory \"waist\""));
    }

    #[test]
    fn fetch_error_display() {
        let e = FetchError::HttpStatus {
            url: "https://example.org/a.png".into(),
            status: 404,
        };
        assert!(e.to_string().contains("404"));

        let e = FetchError::TooManyRedirects {
            url: "http://x/".into(),
            hops: 10,
        };
        assert!(e.to_string().contains("(10)"));
    }

    #[test]
    fn content_file_missing_display() {
        let e = ValidationIssue::ContentFileMissing {
            file: "page.mdx".into(),
        };
        assert_eq!(e.to_string(), "page.mdx not found");
    }

    #[test]
    fn content_file_unreadable_display() {
        let e = ValidationIssue::ContentFileUnreadable {
            file: "page.mdx".into(),
            detail: "Permission denied".into(),
        };
        assert_eq!(e.to_string(), "page.mdx could not be read: Permission denied");
    }
}
