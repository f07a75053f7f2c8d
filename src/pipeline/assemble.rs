//! Artifact assembly: metadata export + title heading + converted body.
//!
//! The site's page loader imports `metadata` from each `page.mdx`, and the
//! sitemap / structured-data generators read the same fields, so the field
//! names and quoting here must stay stable.

use crate::manifest::SourceDocument;

/// Render the complete `page.mdx` for one document.
pub fn assemble_artifact(doc: &SourceDocument, body: &str) -> String {
    format!(
        "export const metadata = {{\n  title: \"{}\",\n  date: \"{}\",\n  subtitle: \"{}\"\n}};\n\n# {}\n\n{}\n",
        escape_js_string(&doc.title),
        escape_js_string(&doc.date),
        escape_js_string(&doc.subtitle),
        doc.title,
        body,
    )
}

/// Escape a value for a double-quoted JS string literal.
///
/// Line breaks are escaped too; a raw one would leave the literal unterminated.
fn escape_js_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(title: &str, subtitle: &str) -> SourceDocument {
        SourceDocument {
            file: "1.x.html".into(),
            slug: "x".into(),
            title: title.into(),
            date: "2023-09-18".into(),
            subtitle: subtitle.into(),
        }
    }

    #[test]
    fn test_layout() {
        let out = assemble_artifact(&doc("Leaders Don't Lie", ""), "Body text.");
        assert_eq!(
            out,
            "export const metadata = {\n  title: \"Leaders Don't Lie\",\n  date: \"2023-09-18\",\n  subtitle: \"\"\n};\n\n# Leaders Don't Lie\n\nBody text.\n"
        );
    }

    #[test]
    fn test_quotes_escaped_in_metadata_only() {
        let out = assemble_artifact(&doc("The \"Ideal\" Engineer", "a \"b\""), "");
        assert!(out.contains("title: \"The \\\"Ideal\\\" Engineer\""));
        assert!(out.contains("subtitle: \"a \\\"b\\\"\""));
        assert!(out.contains("# The \"Ideal\" Engineer\n"));
    }

    #[test]
    fn test_line_breaks_escaped_in_metadata() {
        let out = assemble_artifact(&doc("T", "line one\nline two\r\nthree"), "");
        assert!(out.contains("subtitle: \"line one\\nline two\\r\\nthree\"\n};"));
        let header = out.split("};").next().unwrap();
        assert_eq!(header.lines().count(), 4);
    }

    #[test]
    fn test_backslash_escaped() {
        assert_eq!(escape_js_string(r"a\b"), r"a\\b");
    }
}
