//! Independent matchers over a single hop's response. Each returns an
//! optional match; [`scan_response`] composes them by fixed precedence.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use wlanauth_core::{PortalResponse, RedirectKind, RedirectTarget};

static SCRIPT_REDIRECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"window\.location\.href\s*=\s*["']([^"']+)["']"#).unwrap()
});

// Markup written from script (document.write etc.) never reaches the DOM.
static INLINE_IMG_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<img[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#).unwrap());

static SCRIPT_IMG_SRC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"img\.src\s*=\s*["']([^"']+)["']"#).unwrap());

/// Result of scanning one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageScan {
    /// Asset to fetch and discard
    pub beacon: Option<Url>,
    pub target: RedirectTarget,
}

/// Auth-failure marker carried in a redirect target's URL.
#[derive(Debug, Clone)]
pub struct FailureMarker(String);

impl FailureMarker {
    pub fn new(marker: impl Into<String>) -> Self {
        Self(marker.into())
    }

    pub fn matches(&self, url: &Url) -> bool {
        !self.0.is_empty() && url.as_str().contains(&self.0)
    }
}

impl Default for FailureMarker {
    fn default() -> Self {
        Self::new("auth=failed")
    }
}

/// `Location` of a 301/302, resolved against the URL that was requested.
pub fn header_redirect(response: &PortalResponse) -> Option<Url> {
    if !response.is_redirect() {
        return None;
    }
    let location = response.header("location")?.trim();
    if location.is_empty() {
        return None;
    }
    response.url.join(location).ok()
}

/// First image the page would load: a DOM `<img src>`, then markup inside
/// scripts, then an `img.src = ...` assignment.
pub fn image_beacon(body: &str, base: &Url) -> Option<Url> {
    dom_image(body)
        .or_else(|| first_capture(&INLINE_IMG_TAG_RE, body))
        .or_else(|| first_capture(&SCRIPT_IMG_SRC_RE, body))
        .and_then(|src| resolve_http(base, &src))
}

/// `window.location.href = "..."`, absolute or relative to `base`.
pub fn script_redirect(body: &str, base: &Url) -> Option<Url> {
    first_capture(&SCRIPT_REDIRECT_RE, body).and_then(|href| resolve_http(base, &href))
}

/// Header redirect wins; bodies are only looked at on a 200.
/// A target carrying the failure marker is reported as such, before anything
/// else can treat it as a hop to follow.
pub fn scan_response(response: &PortalResponse, base: &Url, marker: &FailureMarker) -> PageScan {
    let mut beacon = None;

    let found = if let Some(url) = header_redirect(response) {
        Some((url, RedirectKind::Http3xx))
    } else if response.status == 200 {
        beacon = image_beacon(&response.body, base);
        script_redirect(&response.body, base).map(|url| (url, RedirectKind::ScriptRedirect))
    } else {
        None
    };

    let target = match found {
        Some((url, _)) if marker.matches(&url) => {
            debug!(url = %url, "auth failure marker in redirect target");
            RedirectTarget {
                url,
                kind: RedirectKind::AuthFailureMarker,
            }
        }
        Some((url, kind)) => RedirectTarget { url, kind },
        None => RedirectTarget {
            url: response.url.clone(),
            kind: RedirectKind::Terminal,
        },
    };

    PageScan { beacon, target }
}

fn dom_image(body: &str) -> Option<String> {
    let sel = Selector::parse("img[src]").ok()?;
    let document = Html::parse_document(body);
    document
        .select(&sel)
        .filter_map(|el| el.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(str::to_string)
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn resolve_http(base: &Url, reference: &str) -> Option<Url> {
    let url = base.join(reference).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base() -> Url {
        Url::parse("https://mcwlct1s.mc2ed.sjn.osakac.ac.jp:9998").unwrap()
    }

    fn response(status: u16, location: Option<&str>, body: &str) -> PortalResponse {
        let mut headers = HashMap::new();
        if let Some(loc) = location {
            headers.insert("location".to_string(), loc.to_string());
        }
        PortalResponse {
            url: Url::parse("https://mcwlct1s.mc2ed.sjn.osakac.ac.jp:9998/login").unwrap(),
            status,
            headers,
            body: body.to_string(),
            fetched_at: chrono::Utc::now(),
            response_time_ms: 1,
        }
    }

    #[test]
    fn test_header_redirect_only_on_301_302() {
        let r = response(302, Some("http://x/next"), "");
        assert_eq!(header_redirect(&r).unwrap().as_str(), "http://x/next");

        let r = response(303, Some("http://x/next"), "");
        assert!(header_redirect(&r).is_none());

        let r = response(301, None, "");
        assert!(header_redirect(&r).is_none());
    }

    #[test]
    fn test_relative_location_resolves_against_response_url() {
        let r = response(302, Some("/user/done.jsp"), "");
        assert_eq!(
            header_redirect(&r).unwrap().as_str(),
            "https://mcwlct1s.mc2ed.sjn.osakac.ac.jp:9998/user/done.jsp"
        );
    }

    #[test]
    fn test_script_redirect_absolute_and_relative() {
        let abs = r#"<script>window.location.href="http://example.com/next?a=1";</script>"#;
        assert_eq!(
            script_redirect(abs, &base()).unwrap().as_str(),
            "http://example.com/next?a=1"
        );

        let rel = r#"<script>window.location.href = '/user/status.jsp';</script>"#;
        assert_eq!(
            script_redirect(rel, &base()).unwrap().as_str(),
            "https://mcwlct1s.mc2ed.sjn.osakac.ac.jp:9998/user/status.jsp"
        );

        assert!(script_redirect("<p>no script here</p>", &base()).is_none());
    }

    #[test]
    fn test_image_beacon_sources() {
        let tag = r#"<html><body><img alt="b" src="/beacon.gif"></body></html>"#;
        assert_eq!(
            image_beacon(tag, &base()).unwrap().as_str(),
            "https://mcwlct1s.mc2ed.sjn.osakac.ac.jp:9998/beacon.gif"
        );

        let scripted = r#"<script>var img = new Image(); img.src = "http://tracker.example/p.png";</script>"#;
        assert_eq!(
            image_beacon(scripted, &base()).unwrap().as_str(),
            "http://tracker.example/p.png"
        );

        let written = r#"<script>document.write('<img src="/w.gif">');</script>"#;
        assert_eq!(
            image_beacon(written, &base()).unwrap().as_str(),
            "https://mcwlct1s.mc2ed.sjn.osakac.ac.jp:9998/w.gif"
        );

        assert!(image_beacon(r#"<img src="data:image/gif;base64,R0lG">"#, &base()).is_none());
    }

    #[test]
    fn test_failure_marker_in_script_redirect() {
        let body = r#"<script>window.location.href="http://x/y?auth=failed"</script>"#;
        let scan = scan_response(&response(200, None, body), &base(), &FailureMarker::default());
        assert_eq!(scan.target.kind, RedirectKind::AuthFailureMarker);
        assert_eq!(scan.target.url.as_str(), "http://x/y?auth=failed");
    }

    #[test]
    fn test_failure_marker_in_location() {
        let r = response(302, Some("/user/index.jsp?auth=failed"), "");
        let scan = scan_response(&r, &base(), &FailureMarker::default());
        assert_eq!(scan.target.kind, RedirectKind::AuthFailureMarker);
    }

    #[test]
    fn test_header_takes_precedence_over_body() {
        let body = r#"<img src="/b.gif"><script>window.location.href="/other"</script>"#;
        let r = response(302, Some("http://x/from-header"), body);
        let scan = scan_response(&r, &base(), &FailureMarker::default());
        assert_eq!(scan.target.kind, RedirectKind::Http3xx);
        assert_eq!(scan.target.url.as_str(), "http://x/from-header");
        assert!(scan.beacon.is_none());
    }

    #[test]
    fn test_body_ignored_on_non_200() {
        let body = r#"<script>window.location.href="/other"</script>"#;
        let scan = scan_response(&response(500, None, body), &base(), &FailureMarker::default());
        assert!(scan.target.is_terminal());
    }

    #[test]
    fn test_plain_page_is_terminal() {
        let r = response(200, None, "<html><body>Login successful</body></html>");
        let scan = scan_response(&r, &base(), &FailureMarker::default());
        assert_eq!(scan.target.kind, RedirectKind::Terminal);
        assert_eq!(scan.target.url, r.url);
        assert!(scan.beacon.is_none());
    }

    #[test]
    fn test_scan_is_idempotent() {
        let body = r#"<img src="/b.gif"><script>window.location.href="/next"</script>"#;
        let r = response(200, None, body);
        let marker = FailureMarker::default();
        let first = scan_response(&r, &base(), &marker);
        for _ in 0..3 {
            assert_eq!(scan_response(&r, &base(), &marker), first);
        }
        assert_eq!(first.target.kind, RedirectKind::ScriptRedirect);
        assert!(first.beacon.is_some());
    }

    #[test]
    fn test_empty_marker_never_matches() {
        let url = Url::parse("http://x/y?auth=failed").unwrap();
        assert!(!FailureMarker::new("").matches(&url));
        assert!(FailureMarker::new("auth=failed").matches(&url));
    }
}
