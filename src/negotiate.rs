//! Request-side negotiation: content coding preference and freshness.

use std::time::SystemTime;

use axum::http::header::{ACCEPT_ENCODING, CACHE_CONTROL, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use axum::http::{HeaderMap, Method};

/// One parsed `Accept-Encoding` member.
#[derive(Debug, Clone, PartialEq)]
struct Coding {
    name: String,
    q: f32,
    /// Position in the header.
    index: usize,
}

/// How well a coding in the header matched an offer.
#[derive(Debug, Clone, Copy)]
struct Priority {
    q: f32,
    specificity: u8,
    order: usize,
    offer: usize,
}

fn parse_accept_encoding(header: &str) -> Vec<Coding> {
    let mut codings = Vec::new();
    let mut has_identity = false;
    let mut min_q = 1.0_f32;

    for part in header.split(',') {
        let mut params = part.split(';');
        let name = params.next().unwrap_or("").trim();
        if name.is_empty() {
            continue;
        }

        let mut q = 1.0_f32;
        for param in params {
            if let Some((key, value)) = param.split_once('=') {
                if key.trim() == "q" {
                    q = value.trim().parse().unwrap_or(1.0);
                }
            }
        }

        let coding = Coding {
            name: name.to_string(),
            q,
            index: codings.len(),
        };
        has_identity |= coding.name == "*" || coding.name.eq_ignore_ascii_case("identity");
        // An explicit q=0 does not lower the implicit identity weight.
        if q > 0.0 {
            min_q = min_q.min(q);
        }
        codings.push(coding);
    }

    // identity is acceptable unless the client said otherwise.
    if !has_identity {
        codings.push(Coding {
            name: "identity".to_string(),
            q: min_q,
            index: codings.len(),
        });
    }
    codings
}

fn priority(offer: &str, offer_index: usize, accepted: &[Coding]) -> Option<Priority> {
    let mut best: Option<Priority> = None;
    for coding in accepted {
        let specificity = if coding.name.eq_ignore_ascii_case(offer) {
            1
        } else if coding.name == "*" {
            0
        } else {
            continue;
        };

        let candidate = Priority {
            q: coding.q,
            specificity,
            order: coding.index,
            offer: offer_index,
        };
        best = match best {
            Some(current)
                if (current.specificity, current.q) >= (candidate.specificity, candidate.q) =>
            {
                Some(current)
            }
            _ => Some(candidate),
        };
    }
    best
}

/// Rank `offers` against an `Accept-Encoding` value, best first.
///
/// Offers the client refuses (no match, or `q=0`) are dropped. Ties keep the
/// header order, then the order of `offers`.
pub fn preferred_encodings<'a>(header: Option<&str>, offers: &[&'a str]) -> Vec<&'a str> {
    let accepted = parse_accept_encoding(header.unwrap_or(""));
    let mut ranked: Vec<_> = offers
        .iter()
        .enumerate()
        .filter_map(|(i, offer)| priority(offer, i, &accepted).map(|p| (p, *offer)))
        .filter(|(p, _)| p.q > 0.0)
        .collect();

    ranked.sort_by(|(a, _), (b, _)| {
        b.q.total_cmp(&a.q)
            .then(b.specificity.cmp(&a.specificity))
            .then(a.order.cmp(&b.order))
            .then(a.offer.cmp(&b.offer))
    });
    ranked.into_iter().map(|(_, offer)| offer).collect()
}

/// True when the request prefers gzip over identity.
pub fn prefers_gzip(headers: &HeaderMap) -> bool {
    let header = headers.get(ACCEPT_ENCODING).and_then(|v| v.to_str().ok());
    preferred_encodings(header, &["gzip", "identity"]).first() == Some(&"gzip")
}

/// Conditional request evaluation against the response validators.
///
/// Only `GET` and `HEAD` can be fresh. `If-None-Match` takes precedence over
/// `If-Modified-Since`; a request `Cache-Control: no-cache` forces a full
/// response.
pub fn is_fresh(method: &Method, request: &HeaderMap, etag: &str, last_modified: SystemTime) -> bool {
    if method != Method::GET && method != Method::HEAD {
        return false;
    }

    let none_match = request.get(IF_NONE_MATCH).and_then(|v| v.to_str().ok());
    let modified_since = request.get(IF_MODIFIED_SINCE).and_then(|v| v.to_str().ok());
    if none_match.is_none() && modified_since.is_none() {
        return false;
    }

    let no_cache = request
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').any(|d| d.trim().eq_ignore_ascii_case("no-cache")))
        .unwrap_or(false);
    if no_cache {
        return false;
    }

    if let Some(tags) = none_match {
        let tags = tags.trim();
        if tags == "*" {
            return true;
        }
        let ours = strip_weak(etag);
        return tags.split(',').any(|tag| strip_weak(tag.trim()) == ours);
    }

    match modified_since.and_then(|v| httpdate::parse_http_date(v).ok()) {
        Some(since) => truncate_to_secs(last_modified) <= since,
        None => false,
    }
}

fn strip_weak(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}

/// HTTP dates carry whole seconds.
fn truncate_to_secs(time: SystemTime) -> SystemTime {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(d.as_secs()),
        Err(_) => time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::time::{Duration, UNIX_EPOCH};

    fn prefs(header: Option<&str>) -> Vec<&'static str> {
        preferred_encodings(header, &["gzip", "identity"])
    }

    #[test]
    fn test_missing_header_means_identity() {
        assert_eq!(prefs(None), vec!["identity"]);
        assert_eq!(prefs(Some("")), vec!["identity"]);
    }

    #[test]
    fn test_gzip_preferred_when_listed() {
        assert_eq!(prefs(Some("gzip, deflate, br")), vec!["gzip", "identity"]);
        assert_eq!(prefs(Some("br;q=1.0, gzip;q=0.8")), vec!["gzip", "identity"]);
    }

    #[test]
    fn test_identity_can_outrank_gzip() {
        assert_eq!(prefs(Some("gzip;q=0.5, identity")), vec!["identity", "gzip"]);
    }

    #[test]
    fn test_zero_quality_excludes() {
        assert_eq!(prefs(Some("gzip;q=0")), vec!["identity"]);
        assert_eq!(prefs(Some("gzip, identity;q=0")), vec!["gzip"]);
    }

    #[test]
    fn test_wildcard_matches_everything() {
        assert_eq!(prefs(Some("*")), vec!["gzip", "identity"]);
        assert_eq!(prefs(Some("*;q=0")), Vec::<&str>::new());
    }

    #[test]
    fn test_prefers_gzip_reads_request_headers() {
        let mut headers = HeaderMap::new();
        assert!(!prefers_gzip(&headers));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        assert!(prefers_gzip(&headers));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("deflate"));
        assert!(!prefers_gzip(&headers));
    }

    fn modified() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(784_111_777)
    }

    #[test]
    fn test_fresh_on_matching_etag() {
        let mut headers = HeaderMap::new();
        headers.insert(IF_NONE_MATCH, HeaderValue::from_static("\"other\", W/\"abc\""));
        assert!(is_fresh(&Method::GET, &headers, "\"abc\"", modified()));
        assert!(is_fresh(&Method::HEAD, &headers, "\"abc\"", modified()));
        assert!(!is_fresh(&Method::POST, &headers, "\"abc\"", modified()));
        assert!(!is_fresh(&Method::GET, &headers, "\"xyz\"", modified()));
    }

    #[test]
    fn test_fresh_on_wildcard() {
        let mut headers = HeaderMap::new();
        headers.insert(IF_NONE_MATCH, HeaderValue::from_static("*"));
        assert!(is_fresh(&Method::GET, &headers, "\"abc\"", modified()));
    }

    #[test]
    fn test_fresh_on_modified_since() {
        let mut headers = HeaderMap::new();
        headers.insert(
            IF_MODIFIED_SINCE,
            HeaderValue::from_static("Sun, 06 Nov 1994 08:49:37 GMT"),
        );
        assert!(is_fresh(&Method::GET, &headers, "\"abc\"", modified()));
        assert!(is_fresh(
            &Method::GET,
            &headers,
            "\"abc\"",
            modified() + Duration::from_millis(400)
        ));
        assert!(!is_fresh(
            &Method::GET,
            &headers,
            "\"abc\"",
            modified() + Duration::from_secs(1)
        ));
    }

    #[test]
    fn test_etag_mismatch_wins_over_date() {
        let mut headers = HeaderMap::new();
        headers.insert(IF_NONE_MATCH, HeaderValue::from_static("\"stale\""));
        headers.insert(
            IF_MODIFIED_SINCE,
            HeaderValue::from_static("Sun, 06 Nov 1994 08:49:37 GMT"),
        );
        assert!(!is_fresh(&Method::GET, &headers, "\"abc\"", modified()));
    }

    #[test]
    fn test_no_cache_forces_full_response() {
        let mut headers = HeaderMap::new();
        headers.insert(IF_NONE_MATCH, HeaderValue::from_static("\"abc\""));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        assert!(!is_fresh(&Method::GET, &headers, "\"abc\"", modified()));
    }

    #[test]
    fn test_unconditional_request_is_stale() {
        assert!(!is_fresh(&Method::GET, &HeaderMap::new(), "\"abc\"", modified()));
    }
}
