// src/utils/url.rs

//! URL canonicalization and safety checks.

use url::Url;

use crate::models::AtsType;

/// Query keys that only carry attribution.
const TRACKING_KEYS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "gh_src",
    "lever-source",
    "lever-origin",
    "source",
    "src",
    "ref",
    "referrer",
    "fbclid",
    "gclid",
    "mc_cid",
    "mc_eid",
];

/// Greenhouse identifies embedded postings by query parameter.
const GREENHOUSE_KEPT_KEYS: &[&str] = &["gh_jid", "token"];

/// Path segments that start an authentication or application flow.
const AUTH_FLOW_SEGMENTS: &[&str] = &[
    "login",
    "log-in",
    "signin",
    "sign-in",
    "signup",
    "sign-up",
    "register",
    "oauth",
    "oauth2",
    "sso",
    "saml",
    "auth",
    "authorize",
    "apply",
    "application",
    "applications",
];

/// Canonical form of a posting URL for `source`.
///
/// Fragments are always dropped. ATS API hosts drop every query parameter,
/// Greenhouse keeps `gh_jid`/`token`, and custom sites drop only tracking
/// keys. A trailing slash is removed. Unparseable input is returned trimmed.
pub fn canonical_url(raw: &str, source: AtsType) -> String {
    let raw = raw.trim();
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };

    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| match source {
            AtsType::Greenhouse => GREENHOUSE_KEPT_KEYS.contains(&k.as_ref()),
            AtsType::Custom | AtsType::Unknown => !is_tracking_key(k),
            _ => false,
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    url.to_string()
}

fn is_tracking_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_KEYS.contains(&key.as_str())
}

/// Whether navigating to `url` would enter a login or application flow.
pub fn is_auth_flow_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    if let Some(host) = parsed.host_str() {
        let first = host.split('.').next().unwrap_or_default();
        if matches!(first, "login" | "auth" | "sso" | "accounts" | "signin") {
            return true;
        }
    }

    parsed
        .path_segments()
        .map(|mut segments| {
            segments.any(|s| AUTH_FLOW_SEGMENTS.contains(&s.to_ascii_lowercase().as_str()))
        })
        .unwrap_or(false)
}

/// Resolve a potentially relative URL against a base URL.
pub fn resolve(base: &Url, href: &str) -> Option<String> {
    base.join(href.trim()).ok().map(|u| u.to_string())
}

/// Extract the lowercase host from a URL string.
pub fn get_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}
