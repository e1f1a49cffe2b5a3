//! URL normalization
//!
//! Resolution of extracted references against the page they were found on,
//! fragment stripping for visited-set keys, and host extraction for scope
//! tests. Every function here is total: malformed input yields `None` or is
//! passed through, never an error.

use url::Url;

/// Resolve a possibly-relative reference against `base`.
///
/// Returns `None` when the candidate is empty, when it claims a scheme that
/// is not a valid URI scheme (`ht!tp://...`), or when either side fails to
/// parse.
pub fn resolve(candidate: &str, base: &str) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }

    if let Some(scheme) = claimed_scheme(candidate) {
        if !is_valid_scheme(scheme) {
            return None;
        }
        return Url::parse(candidate).ok().map(String::from);
    }

    let base = Url::parse(base).ok()?;
    base.join(candidate).ok().map(String::from)
}

/// Remove the fragment component. Unparseable input is returned unchanged.
pub fn strip_fragment(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.into()
        }
        Err(_) => url.to_string(),
    }
}

/// Lowercased host of `url`, without port.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(str::to_ascii_lowercase)
}

/// Whether the browser can be pointed at this URL as a crawl frame.
pub fn is_crawlable(url: &str) -> bool {
    Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// The text before the first `:` when it precedes any `/`, `?` or `#`.
fn claimed_scheme(candidate: &str) -> Option<&str> {
    let end = candidate.find([':', '/', '?', '#'])?;
    if candidate[end..].starts_with(':') {
        Some(&candidate[..end])
    } else {
        None
    }
}

// scheme = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
