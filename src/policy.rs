//! Auth cookie validity and domain-matching policy.
//!
//! Pure functions shared by restore, backup filtering, migration, and the
//! request-signing lookup path. Keeping them stateless means every caller
//! applies the same notion of "this cookie counts as auth material".

use std::time::{SystemTime, UNIX_EPOCH};

use crate::cookie::CookieRecord;

/// Cookie names that carry Google session auth material.
pub const AUTH_COOKIE_NAMES: [&str; 7] = [
    "SAPISID",
    "__Secure-3PAPISID",
    "__Secure-1PAPISID",
    "SID",
    "HSID",
    "SSID",
    "APISID",
];

/// Preferred cookie for the signing secret, with its fallback.
const PRIMARY_SECRET_COOKIE: &str = "__Secure-3PAPISID";
const FALLBACK_SECRET_COOKIE: &str = "SAPISID";

/// Returns whether a record is a non-expired auth cookie at `now`.
///
/// A cookie without an expiry is always eligible; an expired cookie is never
/// treated as present, even if the jar still physically holds it.
#[must_use]
pub fn is_valid_auth_cookie(record: &CookieRecord, now: u64) -> bool {
    if !AUTH_COOKIE_NAMES.contains(&record.name.as_str()) {
        return false;
    }
    match record.expires_at {
        None => true,
        Some(expires_at) => expires_at >= now,
    }
}

/// Returns whether a cookie stored for `cookie_domain` is visible to requests
/// against `request_domain`.
///
/// Three cases match, in order: exact equality, a dotted cookie domain
/// covering its base domain and any subdomain of it, and a request that is a
/// strict subdomain of an undotted cookie domain. Comparison is
/// case-insensitive throughout.
#[must_use]
pub fn matches_domain(cookie_domain: &str, request_domain: &str) -> bool {
    let cookie_domain = cookie_domain.to_lowercase();
    let request_domain = request_domain.to_lowercase();

    if cookie_domain == request_domain {
        return true;
    }

    if let Some(base) = cookie_domain.strip_prefix('.') {
        return request_domain == base || request_domain.ends_with(&format!(".{base}"));
    }

    request_domain.ends_with(&format!(".{cookie_domain}"))
}

/// Selects the signing secret from a record set.
///
/// Prefers `__Secure-3PAPISID`, falls back to `SAPISID`. Expired cookies are
/// never selected.
#[must_use]
pub fn select_auth_secret(records: &[CookieRecord], now: u64) -> Option<&str> {
    for name in [PRIMARY_SECRET_COOKIE, FALLBACK_SECRET_COOKIE] {
        let found = records
            .iter()
            .find(|record| record.name == name && is_valid_auth_cookie(record, now));
        if let Some(record) = found {
            return Some(record.value());
        }
    }
    None
}

/// Current Unix time in seconds.
#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cookie(name: &str, expires_at: Option<u64>) -> CookieRecord {
        CookieRecord::new(
            name.to_string(),
            format!("{name}-value"),
            ".youtube.com".to_string(),
            "/".to_string(),
            expires_at,
            expires_at.is_none(),
        )
    }

    // ---- is_valid_auth_cookie ----

    #[test]
    fn test_session_cookie_always_eligible() {
        assert!(is_valid_auth_cookie(&cookie("SAPISID", None), u64::MAX));
    }

    #[test]
    fn test_expired_cookie_excluded_regardless_of_name() {
        for name in AUTH_COOKIE_NAMES {
            assert!(
                !is_valid_auth_cookie(&cookie(name, Some(999)), 1000),
                "{name} expired at 999 must not be valid at 1000"
            );
        }
    }

    #[test]
    fn test_expiry_exactly_now_is_still_valid() {
        assert!(is_valid_auth_cookie(&cookie("SID", Some(1000)), 1000));
    }

    #[test]
    fn test_non_whitelisted_name_rejected() {
        assert!(!is_valid_auth_cookie(&cookie("PREF", None), 1000));
        assert!(!is_valid_auth_cookie(&cookie("sapisid", None), 1000));
    }

    // ---- matches_domain ----

    #[test]
    fn test_matches_domain_dotted_parent() {
        assert!(matches_domain(".youtube.com", "music.youtube.com"));
    }

    #[test]
    fn test_matches_domain_undotted_parent() {
        assert!(matches_domain("youtube.com", "music.youtube.com"));
    }

    #[test]
    fn test_matches_domain_unrelated() {
        assert!(!matches_domain("example.com", "music.youtube.com"));
    }

    #[test]
    fn test_matches_domain_exact() {
        assert!(matches_domain("music.youtube.com", "music.youtube.com"));
    }

    #[test]
    fn test_matches_domain_dotted_matches_base_itself() {
        assert!(matches_domain(".youtube.com", "youtube.com"));
    }

    #[test]
    fn test_matches_domain_case_insensitive() {
        assert!(matches_domain(".YouTube.com", "Music.YOUTUBE.com"));
    }

    #[test]
    fn test_matches_domain_no_suffix_confusion() {
        // "notyoutube.com" is not a subdomain of "youtube.com".
        assert!(!matches_domain("youtube.com", "notyoutube.com"));
        assert!(!matches_domain(".youtube.com", "notyoutube.com"));
    }

    #[test]
    fn test_matches_domain_undotted_requires_strict_subdomain() {
        // Spec case (c) covers strict subdomains only; equality is case (a).
        assert!(!matches_domain("music.youtube.com", "youtube.com"));
    }

    // ---- select_auth_secret ----

    #[test]
    fn test_select_prefers_secure_3papisid() {
        let records = vec![cookie("SAPISID", None), cookie("__Secure-3PAPISID", None)];
        assert_eq!(
            select_auth_secret(&records, 1000),
            Some("__Secure-3PAPISID-value")
        );
    }

    #[test]
    fn test_select_falls_back_to_sapisid() {
        let records = vec![cookie("SID", None), cookie("SAPISID", None)];
        assert_eq!(select_auth_secret(&records, 1000), Some("SAPISID-value"));
    }

    #[test]
    fn test_select_skips_expired_primary() {
        let records = vec![
            cookie("__Secure-3PAPISID", Some(500)),
            cookie("SAPISID", None),
        ];
        assert_eq!(select_auth_secret(&records, 1000), Some("SAPISID-value"));
    }

    #[test]
    fn test_select_absent_when_both_expired() {
        let records = vec![
            cookie("__Secure-3PAPISID", Some(500)),
            cookie("SAPISID", Some(500)),
        ];
        assert_eq!(select_auth_secret(&records, 1000), None);
    }

    #[test]
    fn test_select_absent_when_no_secret_cookie() {
        let records = vec![cookie("SID", None), cookie("HSID", None)];
        assert_eq!(select_auth_secret(&records, 1000), None);
    }
}
