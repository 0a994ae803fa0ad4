//! Relative reference resolution.
//!
//! This is plain string algebra over the base URL, not a WHATWG URL join:
//! there is no dot-segment normalization and query-only (`?x=1`) or
//! fragment-only (`#top`) references are treated like any other
//! directory-relative reference.

const SCHEME_MARKER: &str = "://";
const DEFAULT_SCHEME: &str = "https:";

/// Combines `base` and `reference` into an absolute URL.
///
/// An empty `reference` yields an empty string, which callers treat as "no
/// navigation". When `base` has no scheme marker, scheme-relative references
/// default to `https:` and every other relative reference is returned as is.
pub fn resolve(base: &str, reference: &str) -> String {
    if reference.is_empty() {
        return String::new();
    }

    if reference.contains(SCHEME_MARKER) {
        return reference.to_owned();
    }

    let marker = base.find(SCHEME_MARKER);

    if let Some(rest) = reference.strip_prefix("//") {
        let scheme = match marker {
            Some(idx) => &base[..=idx],
            None => DEFAULT_SCHEME,
        };
        return format!("{scheme}//{rest}");
    }

    let Some(marker) = marker else {
        return reference.to_owned();
    };
    let authority_start = marker + SCHEME_MARKER.len();

    if reference.starts_with('/') {
        let origin_end = base[authority_start..]
            .find('/')
            .map_or(base.len(), |offset| authority_start + offset);
        return format!("{}{reference}", &base[..origin_end]);
    }

    match base.rfind('/') {
        Some(slash) if slash >= authority_start => format!("{}{reference}", &base[..=slash]),
        _ => format!("{base}/{reference}"),
    }
}
