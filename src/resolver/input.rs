//! Cleanup of user-supplied references before resolution.

use percent_encoding::percent_decode_str;
use url::Url;

/// A reference as pasted by a user, plus what was read out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveInput {
    /// Trimmed original text.
    pub original: String,
    /// Unwrapped, percent-decoded form.
    pub normalized: String,
    /// Id to probe: the `tid` query parameter if present, else `normalized`.
    pub candidate: String,
}

impl ResolveInput {
    /// Normalize `raw` and pick the candidate id.
    pub fn parse(raw: &str) -> Self {
        let normalized = normalize_input(raw);
        let candidate = extract_tid(&normalized).unwrap_or_else(|| normalized.clone());

        Self {
            original: raw.trim().to_string(),
            normalized,
            candidate,
        }
    }

    /// Page to scrape, if the input is an http(s) URL.
    pub fn page_url(&self) -> Option<&str> {
        is_http_url(&self.normalized).then_some(self.normalized.as_str())
    }
}

/// Trim, unwrap `[..]` then quotes, percent-decode, repair `%3F`/`%26`.
///
/// Decoding is all or nothing: a stray `%` or an escape that does not form
/// UTF-8 leaves the whole text undecoded.
pub fn normalize_input(raw: &str) -> String {
    let mut text = raw.trim();
    text = strip_wrapping(text, '[', ']');
    text = strip_wrapping(text, '"', '"');
    text = strip_wrapping(text, '\'', '\'');

    let decoded = if has_malformed_escape(text) {
        text.to_string()
    } else {
        match percent_decode_str(text).decode_utf8() {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => text.to_string(),
        }
    };

    decoded.replacen("%3F", "?", 1).replacen("%26", "&", 1)
}

/// Whether some `%` is not followed by two hex digits.
fn has_malformed_escape(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !bytes
                .get(i + 1..i + 3)
                .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit))
    })
}

fn strip_wrapping(text: &str, open: char, close: char) -> &str {
    if text.len() >= 2 && text.starts_with(open) && text.ends_with(close) {
        &text[open.len_utf8()..text.len() - close.len_utf8()]
    } else {
        text
    }
}

/// Non-empty `tid` query parameter of a URL.
pub fn extract_tid(text: &str) -> Option<String> {
    let url = Url::parse(text).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "tid")
        .map(|(_, value)| value.into_owned())
        .filter(|tid| !tid.is_empty())
}

/// Whether `text` parses as an http or https URL.
pub fn is_http_url(text: &str) -> bool {
    Url::parse(text)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}
