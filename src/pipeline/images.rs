//! Image origin resolution and deterministic file naming.
//!
//! Substack never links the uploaded file directly. Image tags point at the
//! `substackcdn.com/image/fetch/<transforms>/<percent-encoded origin>` proxy,
//! sometimes with a `$s_!xxxx!` cache token spliced in. Downloading through
//! the proxy works but yields resized, re-encoded copies, so we unwrap the
//! proxy and fetch the S3 original instead.

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;

/// Hosts whose `/image/fetch/` URLs embed the real origin percent-encoded.
const CDN_PROXY_MARKERS: &[&str] = &["substackcdn.com/image/fetch/"];

const S3_MEDIA_HOST: &str = "substack-post-media.s3.amazonaws.com";

static RE_CACHE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$s_![^!/]*!,?").unwrap());

static RE_EMBEDDED_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)https?%3A%2F%2F[^"'\s)]+"#).unwrap());

static RE_S3_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"substack-post-media\.s3\.amazonaws\.com[^"'\s)]+"#).unwrap());

/// Resolve the URL an image should really be downloaded from.
///
/// Unknown URLs are returned unchanged apart from `&amp;` decoding, since
/// the value comes straight out of an HTML attribute.
pub fn resolve_origin(src: &str) -> String {
    let url = src.replace("&amp;", "&");
    let url = RE_CACHE_TOKEN.replace_all(&url, "").into_owned();

    if CDN_PROXY_MARKERS.iter().any(|m| url.contains(m)) {
        if let Some(m) = RE_EMBEDDED_URL.find(&url) {
            return percent_decode_str(m.as_str())
                .decode_utf8_lossy()
                .into_owned();
        }
    }

    if url.contains(S3_MEDIA_HOST) && !url.starts_with(&format!("https://{S3_MEDIA_HOST}")) {
        if let Some(m) = RE_S3_PATH.find(&url) {
            let path = percent_decode_str(m.as_str()).decode_utf8_lossy();
            return format!("https://{path}");
        }
    }

    url
}

/// Infer the file extension from the resolved URL: `png`, `gif`, else `jpg`.
pub fn classify_extension(url: &str) -> &'static str {
    let lower = url.to_ascii_lowercase();
    if lower.contains(".png") {
        "png"
    } else if lower.contains(".gif") {
        "gif"
    } else {
        "jpg"
    }
}

/// `{slug}-{index}.{ext}`
pub fn image_filename(slug: &str, index: usize, ext: &str) -> String {
    format!("{slug}-{index}.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_cdn_fetch_url() {
        let src = "https://substackcdn.com/image/fetch/w_1456,c_limit,f_auto,q_auto:good,fl_progressive:steep/https%3A%2F%2Fsubstack-post-media.s3.amazonaws.com%2Fpublic%2Fimages%2Fabc_1024x768.png";
        assert_eq!(
            resolve_origin(src),
            "https://substack-post-media.s3.amazonaws.com/public/images/abc_1024x768.png"
        );
    }

    #[test]
    fn strips_cache_token_before_unwrapping() {
        let src = "https://substackcdn.com/image/fetch/$s_!IeVk!,w_1456,c_limit/https%3A%2F%2Fsubstack-post-media.s3.amazonaws.com%2Fpublic%2Fimages%2Fx.gif";
        assert_eq!(
            resolve_origin(src),
            "https://substack-post-media.s3.amazonaws.com/public/images/x.gif"
        );
    }

    #[test]
    fn rebuilds_partially_encoded_s3_url() {
        let src = "//substack-post-media.s3.amazonaws.com%2Fpublic%2Fimages%2Fy.jpeg";
        assert_eq!(
            resolve_origin(src),
            "https://substack-post-media.s3.amazonaws.com/public/images/y.jpeg"
        );
    }

    #[test]
    fn plain_urls_pass_through() {
        let src = "https://example.org/photo.jpg?w=200&amp;h=100";
        assert_eq!(resolve_origin(src), "https://example.org/photo.jpg?w=200&h=100");
    }

    #[test]
    fn direct_s3_url_is_untouched() {
        let src = "https://substack-post-media.s3.amazonaws.com/public/images/z.png";
        assert_eq!(resolve_origin(src), src);
    }

    #[test]
    fn extension_by_substring() {
        assert_eq!(classify_extension("https://h/a.png"), "png");
        assert_eq!(classify_extension("https://h/a.PNG"), "png");
        assert_eq!(classify_extension("https://h/anim.gif?x=1"), "gif");
        assert_eq!(classify_extension("https://h/a.jpeg"), "jpg");
        assert_eq!(classify_extension("https://h/a.webp"), "jpg");
        assert_eq!(classify_extension("https://h/noext"), "jpg");
    }

    #[test]
    fn filename_format() {
        assert_eq!(image_filename("waist", 0, "png"), "waist-0.png");
        assert_eq!(image_filename("waist", 12, "jpg"), "waist-12.jpg");
    }
}
