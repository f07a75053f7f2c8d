//! HTML → Markdown/MDX conversion for exported newsletter posts.
//!
//! The export is machine-generated and regular, so a fixed sequence of
//! regex substitutions covers it without a DOM. Each rule is a pure
//! `&str → String` pass; unrecognised markup falls through untouched and the
//! transformer never fails.
//!
//! ## Rule Order
//!
//! Later rules assume earlier ones have already normalised structure:
//! call-to-action blocks go before image unwrapping (they contain links),
//! captioned wrappers collapse to a bare `<img>` before image extraction,
//! images become Markdown before links (so an image link can collapse to the
//! image), blockquotes and lists are converted before bare `<p>` tags, and
//! entities are decoded last so decoded `<`/`>` can never be mistaken for tags.

use crate::output::{ImageReference, TransformedContent};
use crate::pipeline::images::{classify_extension, image_filename, resolve_origin};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Public path images are linked under when no prefix is configured.
pub const DEFAULT_IMAGE_URL_PREFIX: &str = "/images/posts";

/// Convert one exported HTML document to Markdown, collecting its images.
///
/// Image links in the body point at [`DEFAULT_IMAGE_URL_PREFIX`].
pub fn transform_html(html: &str, slug: &str) -> TransformedContent {
    transform_html_with_prefix(html, slug, DEFAULT_IMAGE_URL_PREFIX)
}

/// Like [`transform_html`], linking images under `image_url_prefix`.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip subscribe call-to-action blocks
/// 3. Unwrap captioned-image containers down to the inner `<img>`
/// 4. Extract images, assigning `{slug}-{index}.{ext}` in order of appearance
/// 5. Convert headings, emphasis, blockquotes, links, lists (innermost
///    first, nested items indented), paragraphs,
///    breaks and rules; strip container tags
/// 6. Decode the common HTML entities
/// 7. Collapse 3+ consecutive newlines to 2 and trim
pub fn transform_html_with_prefix(
    html: &str,
    slug: &str,
    image_url_prefix: &str,
) -> TransformedContent {
    let s = normalise_line_endings(html);
    let s = strip_subscribe_buttons(&s);
    let s = unwrap_captioned_images(&s);
    let (s, images) = extract_images(&s, slug, image_url_prefix);
    let s = convert_structure(&s);
    let s = decode_entities(&s);
    let body = collapse_blank_lines(&s).trim().to_string();

    TransformedContent { body, images }
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip subscribe buttons ──────────────────────────────────────────

static RE_SUBSCRIBE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<p class="button-wrapper"[^>]*>.*?</p>"#).unwrap());

fn strip_subscribe_buttons(input: &str) -> String {
    RE_SUBSCRIBE.replace_all(input, "").into_owned()
}

// ── Rule 3: Unwrap captioned images ──────────────────────────────────────────

static RE_CAPTIONED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<div class="captioned-image-container">.*?<img[^>]*?\ssrc="([^"]+)"[^>]*>.*?</div></a></figure></div>"#,
    )
    .unwrap()
});

fn unwrap_captioned_images(input: &str) -> String {
    RE_CAPTIONED
        .replace_all(input, r#"<img src="$1" />"#)
        .into_owned()
}

// ── Rule 4: Extract images ───────────────────────────────────────────────────

static RE_IMG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<img[^>]*?\ssrc="([^"]+)"[^>]*>"#).unwrap());

/// Replace every `<img src>` with a local Markdown image on its own line.
///
/// The index counter lives in this call, so identical input always yields
/// identical filenames.
fn extract_images(
    input: &str,
    slug: &str,
    image_url_prefix: &str,
) -> (String, Vec<ImageReference>) {
    let mut images = Vec::new();
    let out = RE_IMG
        .replace_all(input, |caps: &Captures<'_>| {
            let remote_url = resolve_origin(&caps[1]);
            let ext = classify_extension(&remote_url);
            let filename = image_filename(slug, images.len(), ext);
            let link = format!("\n![]({image_url_prefix}/{filename})\n");
            images.push(ImageReference {
                remote_url,
                filename,
            });
            link
        })
        .into_owned();
    (out, images)
}

// ── Rule 5: Structural conversion ────────────────────────────────────────────

static RE_H1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<h1(?:\s[^>]*)?>(.*?)</h1>").unwrap());
static RE_H2: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<h2(?:\s[^>]*)?>(.*?)</h2>").unwrap());
static RE_H3: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<h3(?:\s[^>]*)?>(.*?)</h3>").unwrap());

static RE_BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<(?:strong|b)(?:\s[^>]*)?>(.*?)</(?:strong|b)>").unwrap());
static RE_ITALIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<(?:em|i)(?:\s[^>]*)?>(.*?)</(?:em|i)>").unwrap());

static RE_BLOCKQUOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<blockquote(?:\s[^>]*)?>(.*?)</blockquote>").unwrap());

static RE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<a\s[^>]*?href="([^"]*)"[^>]*>(.*?)</a>"#).unwrap());
static RE_LONE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^!\[[^\]]*\]\([^)\s]*\)$").unwrap());

static RE_P: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<p(?:\s[^>]*)?>(.*?)</p>").unwrap());
static RE_BR: Lazy<Regex> = Lazy::new(|| Regex::new(r"<br\s*/?>").unwrap());
static RE_DIV_HR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<div>\s*<hr\s*/?>\s*</div>").unwrap());
static RE_HR: Lazy<Regex> = Lazy::new(|| Regex::new(r"<hr\b[^>]*>").unwrap());

/// A list with no list tag in its body, i.e. an innermost one.
static RE_INNER_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)<(ul|ol)(?:\s[^>]*)?>((?:[^<]|<[^uo/]|</[^uo]|<[uo][^l]|</[uo][^l])*)</(?:ul|ol)>",
    )
    .unwrap()
});
static RE_LI: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<li(?:\s[^>]*)?>(.*?)</li>").unwrap());
/// A line already rendered as a (possibly indented) list item.
static RE_ITEM_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:-|\d+\.) ").unwrap());
static RE_LIST_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?(?:ul|ol)(?:\s[^>]*)?>").unwrap());

static RE_CONTAINER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"</?(?:div|span|figure|picture|source)(?:\s[^>]*)?/?>").unwrap()
});

fn convert_structure(input: &str) -> String {
    let s = RE_H1.replace_all(input, |caps: &Captures<'_>| heading("#", &caps[1]));
    let s = RE_H2.replace_all(&s, |caps: &Captures<'_>| heading("##", &caps[1]));
    let s = RE_H3.replace_all(&s, |caps: &Captures<'_>| heading("###", &caps[1]));
    let s = RE_BOLD.replace_all(&s, |caps: &Captures<'_>| emphasis("**", &caps[1]));
    let s = RE_ITALIC.replace_all(&s, |caps: &Captures<'_>| emphasis("*", &caps[1]));
    let s = convert_blockquotes(&s);
    let s = convert_links(&s);
    let s = convert_lists(&s);
    // Stray items outside any list.
    let s = RE_LI.replace_all(&s, |caps: &Captures<'_>| list_item("-", &caps[1]));
    let s = convert_paragraphs(&s);
    let s = RE_DIV_HR.replace_all(&s, "\n---\n");
    let s = RE_HR.replace_all(&s, "\n---\n");
    let s = RE_LIST_TAG.replace_all(&s, "\n");
    RE_CONTAINER.replace_all(&s, "").into_owned()
}

fn convert_paragraphs(input: &str) -> String {
    let s = RE_P.replace_all(input, "\n$1\n");
    RE_BR.replace_all(&s, "\n").into_owned()
}

/// Prefix every non-empty line of the quote with `> `.
fn convert_blockquotes(input: &str) -> String {
    RE_BLOCKQUOTE
        .replace_all(input, |caps: &Captures<'_>| {
            let inner = convert_paragraphs(&caps[1]);
            let quoted: Vec<String> = inner
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| format!("> {l}"))
                .collect();
            format!("\n{}\n", quoted.join("\n>\n"))
        })
        .into_owned()
}

fn convert_links(input: &str) -> String {
    RE_LINK
        .replace_all(input, |caps: &Captures<'_>| {
            let href = &caps[1];
            let text = caps[2].trim();
            // Image links collapse to the (already local) image itself.
            if RE_LONE_IMAGE.is_match(text) {
                format!("\n{text}\n")
            } else {
                format!("[{}]({href})", &caps[2])
            }
        })
        .into_owned()
}

/// Heading text on one line, whatever the source line breaks.
fn heading(marker: &str, inner: &str) -> String {
    let text: Vec<&str> = inner
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    format!("\n{marker} {}\n", text.join(" "))
}

/// Wrap `inner` in `marker`, keeping edge whitespace outside the markers.
fn emphasis(marker: &str, inner: &str) -> String {
    let text = inner.trim();
    if text.is_empty() {
        return inner.to_string();
    }
    let lead = &inner[..inner.len() - inner.trim_start().len()];
    let trail = &inner[inner.trim_end().len()..];
    format!("{lead}{marker}{text}{marker}{trail}")
}

/// Convert lists innermost first, so a nested list is already Markdown
/// (and gets indented) by the time its parent item is converted.
fn convert_lists(input: &str) -> String {
    let mut s = input.to_string();
    while RE_INNER_LIST.is_match(&s) {
        s = RE_INNER_LIST
            .replace_all(&s, |caps: &Captures<'_>| {
                let ordered = &caps[1] == "ol";
                // Only the items; whitespace between them is source formatting.
                let items: String = RE_LI
                    .captures_iter(&caps[2])
                    .enumerate()
                    .map(|(i, li)| {
                        if ordered {
                            list_item(&format!("{}.", i + 1), &li[1])
                        } else {
                            list_item("-", &li[1])
                        }
                    })
                    .collect();
                format!("\n{items}\n")
            })
            .into_owned();
    }
    s
}

/// One list line; paragraphs and nested items inside the item become
/// indented continuation lines.
fn list_item(marker: &str, inner: &str) -> String {
    let inner = convert_paragraphs(inner);
    let lines: Vec<&str> = inner
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            if RE_ITEM_LINE.is_match(l) {
                l.trim_end()
            } else {
                l.trim()
            }
        })
        .collect();
    format!("{marker} {}\n", lines.join("\n  "))
}

// ── Rule 6: Decode entities ──────────────────────────────────────────────────

static RE_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(nbsp|amp|lt|gt|quot|apos|#39|#x27);").unwrap());

/// Single pass, so `&amp;lt;` decodes to the literal text `&lt;`.
fn decode_entities(input: &str) -> String {
    RE_ENTITY
        .replace_all(input, |caps: &Captures<'_>| match &caps[1] {
            "nbsp" => " ",
            "amp" => "&",
            "lt" => "<",
            "gt" => ">",
            "quot" => "\"",
            _ => "'",
        })
        .into_owned()
}

// ── Rule 7: Collapse blank lines ─────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

// ── Tests ────────────────────────────────────────────────────────────────────
