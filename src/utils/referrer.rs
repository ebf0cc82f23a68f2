//! Referrer and country normalisation for click classification.

use crate::domain::entities::UNKNOWN;
use url::Url;

/// Category used when a click carries no `Referer` header.
pub const DIRECT: &str = "Direct";

/// Reduces a `Referer` header to its lower-cased host with any leading
/// `www.` removed.
///
/// No header maps to [`DIRECT`]; a header that is not an absolute URL with a
/// host maps to [`UNKNOWN`].
pub fn classify_referrer(referer: Option<&str>) -> String {
    let Some(raw) = referer.map(str::trim).filter(|s| !s.is_empty()) else {
        return DIRECT.to_string();
    };

    match Url::parse(raw).ok().and_then(|u| u.host_str().map(str::to_ascii_lowercase)) {
        Some(host) => host
            .strip_prefix("www.")
            .map(str::to_string)
            .unwrap_or(host),
        None => UNKNOWN.to_string(),
    }
}

/// Normalises a country code hint to upper-case ISO 3166-1 alpha-2.
///
/// Returns `None` for anything else, including the `XX` and `T1` markers
/// edge proxies use for unknown origins and Tor exits.
pub fn normalize_country(hint: &str) -> Option<String> {
    let code = hint.trim().to_ascii_uppercase();
    if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    match code.as_str() {
        "XX" | "T1" => None,
        _ => Some(code),
    }
}
