//! Post validation: check every `page.mdx` carries the SEO metadata the site needs.
//!
//! Posts are hand-edited after migration (descriptions, canonical URLs,
//! Open Graph images, the `<PostSchema>` structured-data component), so this
//! runs independently of [`crate::migrate`] over whatever is on disk.
//!
//! Every check for a post runs and all issues are collected; only the two
//! cases that leave nothing to inspect (no content file, no metadata export)
//! stop checking that post early.

use crate::config::CONTENT_FILE_NAME;
use crate::error::{MigrateError, ValidationIssue};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Structured-data component expected in every post body.
pub const SCHEMA_COMPONENT: &str = "PostSchema";

/// Top-level metadata keys every post must declare.
pub const REQUIRED_FIELDS: [&str; 3] = ["title", "date", "description"];

const METADATA_MARKER: &str = "export const metadata";

/// Findings for one post directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostReport {
    pub slug: String,
    pub issues: Vec<ValidationIssue>,
}

impl PostReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Findings for a whole posts directory, sorted by slug.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub posts: Vec<PostReport>,
}

impl ValidationReport {
    /// Total number of issues across all posts.
    pub fn error_count(&self) -> usize {
        self.posts.iter().map(|p| p.issues.len()).sum()
    }

    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    pub fn failed_posts(&self) -> impl Iterator<Item = &PostReport> {
        self.posts.iter().filter(|p| !p.is_ok())
    }
}

/// Validate every post under `posts_dir`.
///
/// Candidates are immediate subdirectories whose name does not start with `.`
/// and does not contain `..`.
///
/// # Errors
/// Only if `posts_dir` itself cannot be listed; per-post problems are
/// reported in the returned [`ValidationReport`].
pub async fn validate_posts(posts_dir: impl AsRef<Path>) -> Result<ValidationReport, MigrateError> {
    let posts_dir = posts_dir.as_ref();
    let unreadable = |source: std::io::Error| MigrateError::PostsDirUnreadable {
        path: posts_dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(posts_dir).await.map_err(unreadable)?;
    let mut slugs = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        let is_dir = entry
            .file_type()
            .await
            .map(|t| t.is_dir())
            .unwrap_or(false);
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_dir && !name.starts_with('.') && !name.contains("..") {
            slugs.push(name);
        }
    }
    slugs.sort();

    let mut posts = Vec::with_capacity(slugs.len());
    for slug in slugs {
        let path = posts_dir.join(&slug).join(CONTENT_FILE_NAME);
        // Hand edits can leave stray bytes; checks only look at ASCII keys.
        let issues = match tokio::fs::read(&path).await {
            Ok(bytes) => validate_post(&slug, &String::from_utf8_lossy(&bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{}: {}", path.display(), e);
                vec![ValidationIssue::ContentFileMissing {
                    file: CONTENT_FILE_NAME.to_string(),
                }]
            }
            Err(e) => {
                debug!("{}: {}", path.display(), e);
                vec![ValidationIssue::ContentFileUnreadable {
                    file: CONTENT_FILE_NAME.to_string(),
                    detail: e.to_string(),
                }]
            }
        };
        posts.push(PostReport { slug, issues });
    }

    Ok(ValidationReport { posts })
}

/// Validate the text of one post; `slug` is its directory name.
pub fn validate_post(slug: &str, content: &str) -> Vec<ValidationIssue> {
    let Some((start, end)) = find_metadata_block(content) else {
        return vec![ValidationIssue::NoMetadataExport];
    };
    let block = &content[start..end];
    let body = &content[end..];
    let mut issues = Vec::new();

    // ── Required top-level fields ────────────────────────────────────────
    for field in REQUIRED_FIELDS {
        if !has_key(block, field) {
            issues.push(ValidationIssue::MissingField {
                field: field.to_string(),
            });
        }
    }

    // ── alternates.canonical ─────────────────────────────────────────────
    if !block.contains("alternates") || !block.contains("canonical") {
        issues.push(ValidationIssue::MissingCanonical);
    }

    // ── openGraph.images ─────────────────────────────────────────────────
    if !block.contains("openGraph") {
        issues.push(ValidationIssue::MissingOpenGraph);
    } else if !block.contains("images") {
        issues.push(ValidationIssue::MissingOpenGraphImages);
    }

    // ── Structured-data component ────────────────────────────────────────
    if !body.contains(&format!("<{SCHEMA_COMPONENT}")) {
        issues.push(ValidationIssue::MissingSchemaComponent {
            component: SCHEMA_COMPONENT.to_string(),
        });
        return issues;
    }

    for prop in ["title", "date"] {
        let expected = string_value(block, prop);
        let found = schema_prop(body, prop);
        if let (Some(expected), Some(found)) = (expected, found) {
            if expected != found {
                issues.push(ValidationIssue::SchemaMismatch {
                    component: SCHEMA_COMPONENT.to_string(),
                    prop: prop.to_string(),
                    found,
                    expected,
                });
            }
        }
    }

    if let Some(found) = schema_prop(body, "slug") {
        if found != slug {
            issues.push(ValidationIssue::SlugMismatch {
                component: SCHEMA_COMPONENT.to_string(),
                found,
                expected: slug.to_string(),
            });
        }
    }

    issues
}

/// Byte range of the `{ … }` following `export const metadata`.
///
/// Brace depth is counted so nested objects (`openGraph: { images: [...] }`)
/// do not end the block early. Returns `None` if the marker, the opening brace
/// or a balanced closing brace is missing.
pub fn find_metadata_block(content: &str) -> Option<(usize, usize)> {
    let marker = content.find(METADATA_MARKER)?;
    let open = marker + content[marker..].find('{')?;

    let mut depth = 0usize;
    for (i, b) in content.as_bytes()[open..].iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((open, open + i + 1));
                }
            }
            _ => {}
        }
    }
    None
}

static RE_TITLE_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\btitle\s*:").unwrap());
static RE_DATE_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bdate\s*:").unwrap());
static RE_DESCRIPTION_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bdescription\s*:").unwrap());

fn has_key(block: &str, key: &str) -> bool {
    match key {
        "title" => RE_TITLE_KEY.is_match(block),
        "date" => RE_DATE_KEY.is_match(block),
        "description" => RE_DESCRIPTION_KEY.is_match(block),
        other => block.contains(&format!("{other}:")),
    }
}

static RE_TITLE_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\btitle\s*:\s*(?:"([^"]+)"|'([^']+)')"#).unwrap());
static RE_DATE_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bdate\s*:\s*(?:"([^"]+)"|'([^']+)')"#).unwrap());

/// First `key: "value"` or `key: 'value'` in the metadata block.
///
/// Double quotes are preferred; single quotes let titles contain apostrophes.
fn string_value(block: &str, key: &str) -> Option<String> {
    let re = match key {
        "title" => &RE_TITLE_VALUE,
        "date" => &RE_DATE_VALUE,
        _ => return None,
    };
    let mut single = None;
    for caps in re.captures_iter(block) {
        if let Some(m) = caps.get(1) {
            return Some(m.as_str().to_string());
        }
        if single.is_none() {
            single = caps.get(2).map(|m| m.as_str().to_string());
        }
    }
    single
}

static RE_SCHEMA_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<PostSchema[^>]*\btitle\s*=\s*"([^"]+)""#).unwrap());
static RE_SCHEMA_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<PostSchema[^>]*\bdate\s*=\s*"([^"]+)""#).unwrap());
static RE_SCHEMA_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<PostSchema[^>]*\bslug\s*=\s*"([^"]+)""#).unwrap());

/// Double-quoted prop value on the `<PostSchema … />` tag.
fn schema_prop(body: &str, prop: &str) -> Option<String> {
    let re = match prop {
        "title" => &RE_SCHEMA_TITLE,
        "date" => &RE_SCHEMA_DATE,
        "slug" => &RE_SCHEMA_SLUG,
        _ => return None,
    };
    re.captures(body).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"import { PostSchema } from '@/app/components/JsonLd'

export const metadata = {
  title: "Leaders Don't Lie",
  date: "2023-09-18",
  description: "Why honesty is the job.",
  alternates: { canonical: "/posts/leaders-dont-lie" },
  openGraph: {
    title: "Leaders Don't Lie",
    images: [{ url: "/og/leaders-dont-lie.png" }],
  },
};

<PostSchema title="Leaders Don't Lie" date="2023-09-18" slug="leaders-dont-lie" />

# Leaders Don't Lie
"#;

    #[test]
    fn test_valid_post_has_no_issues() {
        assert_eq!(validate_post("leaders-dont-lie", GOOD), vec![]);
    }

    #[test]
    fn test_block_spans_nested_braces() {
        let (start, end) = find_metadata_block(GOOD).unwrap();
        let block = &GOOD[start..end];
        assert!(block.starts_with('{'));
        assert!(block.ends_with('}'));
        assert!(block.contains("images: [{ url"));
        assert!(GOOD[end..].starts_with(";\n\n<PostSchema"));
    }

    #[test]
    fn test_unbalanced_block_is_none() {
        assert_eq!(find_metadata_block("export const metadata = { title: {"), None);
        assert_eq!(find_metadata_block("export default {}"), None);
        assert_eq!(find_metadata_block("export const metadata = 1"), None);
    }

    #[test]
    fn test_missing_date_is_single_issue() {
        let content = GOOD.replace("  date: \"2023-09-18\",\n", "");
        let issues = validate_post("leaders-dont-lie", &content);
        assert_eq!(
            issues,
            vec![ValidationIssue::MissingField {
                field: "date".into()
            }]
        );
        assert_eq!(issues[0].to_string(), "missing metadata.date");
    }

    #[test]
    fn test_title_mismatch_does_not_short_circuit() {
        let content = GOOD
            .replace(
                "<PostSchema title=\"Leaders Don't Lie\"",
                "<PostSchema title=\"Leaders Never Lie\"",
            )
            .replace("slug=\"leaders-dont-lie\"", "slug=\"old-slug\"")
            .replace("  description: \"Why honesty is the job.\",\n", "");
        let issues = validate_post("leaders-dont-lie", &content);

        assert_eq!(issues.len(), 3, "got: {issues:?}");
        assert!(issues.contains(&ValidationIssue::MissingField {
            field: "description".into()
        }));
        assert!(issues.contains(&ValidationIssue::SchemaMismatch {
            component: "PostSchema".into(),
            prop: "title".into(),
            found: "Leaders Never Lie".into(),
            expected: "Leaders Don't Lie".into(),
        }));
        assert!(issues.contains(&ValidationIssue::SlugMismatch {
            component: "PostSchema".into(),
            found: "old-slug".into(),
            expected: "leaders-dont-lie".into(),
        }));
    }

    #[test]
    fn test_date_mismatch() {
        let content = GOOD.replace("date=\"2023-09-18\"", "date=\"2023-09-19\"");
        let issues = validate_post("leaders-dont-lie", &content);
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].to_string(),
            "PostSchema date \"2023-09-19\" does not match metadata date \"2023-09-18\""
        );
    }

    #[test]
    fn test_single_quoted_metadata_value() {
        let content = GOOD.replace(
            "  title: \"Leaders Don't Lie\",\n  date",
            "  title: 'Leaders Lie',\n  date",
        );
        let issues = validate_post("leaders-dont-lie", &content);
        // The nested openGraph title is still double-quoted and wins.
        assert!(issues.is_empty(), "got: {issues:?}");
        assert_eq!(
            string_value("{ title: 'Leaders Lie' }", "title").as_deref(),
            Some("Leaders Lie")
        );
    }

    #[test]
    fn test_missing_schema_component() {
        let content = GOOD.replace(
            "<PostSchema title=\"Leaders Don't Lie\" date=\"2023-09-18\" slug=\"leaders-dont-lie\" />",
            "",
        );
        let issues = validate_post("leaders-dont-lie", &content);
        assert_eq!(
            issues,
            vec![ValidationIssue::MissingSchemaComponent {
                component: "PostSchema".into()
            }]
        );
    }

    #[test]
    fn test_schema_import_in_header_does_not_count() {
        // Only the body after the metadata block is searched.
        let content = "import { PostSchema } from 'x'\n// <PostSchema\nexport const metadata = { title: 'a', date: 'b', description: 'c', alternates: { canonical: '/' }, openGraph: { images: [] } };\n";
        let issues = validate_post("a", content);
        assert_eq!(issues.len(), 1);
        assert!(matches!(
            issues[0],
            ValidationIssue::MissingSchemaComponent { .. }
        ));
    }

    #[test]
    fn test_open_graph_without_images() {
        let content = GOOD.replace("    images: [{ url: \"/og/leaders-dont-lie.png\" }],\n", "");
        let issues = validate_post("leaders-dont-lie", &content);
        assert_eq!(issues, vec![ValidationIssue::MissingOpenGraphImages]);
    }

    #[test]
    fn test_migrated_artifact_reports_seo_gaps() {
        let content = "export const metadata = {\n  title: \"Waist\",\n  date: \"2023-09-18\",\n  subtitle: \"\"\n};\n\n# Waist\n\nBody\n";
        let issues: Vec<String> = validate_post("waist", content)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            issues,
            vec![
                "missing metadata.description",
                "missing alternates.canonical",
                "missing openGraph",
                "missing <PostSchema> component",
            ]
        );
    }

    #[test]
    fn test_no_metadata_export() {
        assert_eq!(
            validate_post("x", "# Just markdown\n"),
            vec![ValidationIssue::NoMetadataExport]
        );
    }

    #[tokio::test]
    async fn test_validate_posts_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for slug in ["leaders-dont-lie", "b-missing-file", ".hidden"] {
            std::fs::create_dir_all(root.join(slug)).unwrap();
        }
        std::fs::write(root.join("leaders-dont-lie/page.mdx"), GOOD).unwrap();
        std::fs::write(root.join("stray.mdx"), "not a dir").unwrap();

        let report = validate_posts(root).await.unwrap();
        let slugs: Vec<&str> = report.posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["b-missing-file", "leaders-dont-lie"]);
        assert_eq!(report.error_count(), 1);
        assert!(!report.is_ok());
        assert_eq!(
            report.posts[0].issues[0].to_string(),
            "page.mdx not found"
        );
        assert!(report.posts[1].is_ok());
        assert_eq!(report.failed_posts().count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_utf8_content_is_still_checked() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("leaders-dont-lie")).unwrap();
        let mut bytes = GOOD.as_bytes().to_vec();
        bytes.extend_from_slice(b"\nstray byte: \xff\xfe\n");
        std::fs::write(dir.path().join("leaders-dont-lie/page.mdx"), bytes).unwrap();

        let report = validate_posts(dir.path()).await.unwrap();
        assert!(report.is_ok(), "got: {:?}", report.posts[0].issues);
    }

    #[tokio::test]
    async fn test_unreadable_content_file_is_not_reported_missing() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the content file should be: present but unreadable.
        std::fs::create_dir_all(dir.path().join("odd/page.mdx")).unwrap();

        let report = validate_posts(dir.path()).await.unwrap();
        assert_eq!(report.error_count(), 1);
        assert!(matches!(
            report.posts[0].issues[0],
            ValidationIssue::ContentFileUnreadable { .. }
        ));
        assert!(report.posts[0].issues[0]
            .to_string()
            .starts_with("page.mdx could not be read: "));
    }

    #[tokio::test]
    async fn test_unreadable_posts_dir() {
        let err = validate_posts("/definitely/not/a/posts/dir").await.unwrap_err();
        assert!(matches!(err, MigrateError::PostsDirUnreadable { .. }));
    }
}
