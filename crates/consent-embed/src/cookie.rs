//! The `cookie_preferences` cookie: the host-side mirror of consent
//! decisions made inside the banner.
//!
//! The value is the preferences object as JSON, URL-encoded, so server-side
//! code can read it too. Reading is fail-closed: anything that cannot be
//! decoded counts as "no consent" and only `necessary` is allowed.

use consent_common::EmbedError;
use serde_json::{Map, Value};
use tracing::warn;

pub const PREFERENCES_COOKIE: &str = "cookie_preferences";

/// One year.
pub const MAX_AGE_SECS: u64 = 31_536_000;

/// The only category allowed without explicit consent.
pub const NECESSARY: &str = "necessary";

/// `cookie_preferences=<encoded>; path=/; max-age=31536000; SameSite=Lax`
pub fn set_cookie_string(preferences: &Value) -> Result<String, EmbedError> {
    let json = serde_json::to_string(preferences)
        .map_err(|e| EmbedError::MessageProcessing(format!("failed to encode preferences: {e}")))?;
    Ok(format!(
        "{PREFERENCES_COOKIE}={}; path=/; max-age={MAX_AGE_SECS}; SameSite=Lax",
        urlencoding::encode(&json)
    ))
}

/// Find the raw preferences value in a `document.cookie` style string
/// (`"a=1; cookie_preferences=...; b=2"`).
pub fn find_preferences(cookies: &str) -> Option<&str> {
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name.trim() == PREFERENCES_COOKIE).then_some(value.trim())
    })
}

/// Decode a raw cookie value into the stored preferences map.
pub fn decode_preferences(raw: &str) -> Result<Map<String, Value>, EmbedError> {
    let json = urlencoding::decode(raw).map_err(|e| {
        EmbedError::MessageProcessing(format!("preferences cookie is not valid UTF-8: {e}"))
    })?;
    match serde_json::from_str::<Value>(&json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(EmbedError::MessageProcessing(format!(
            "preferences cookie holds {other}, expected an object"
        ))),
        Err(e) => Err(EmbedError::MessageProcessing(format!(
            "preferences cookie is not JSON: {e}"
        ))),
    }
}

/// Stored preferences, if a well-formed cookie is present.
pub fn stored_preferences(cookies: &str) -> Option<Map<String, Value>> {
    let raw = find_preferences(cookies)?;
    match decode_preferences(raw) {
        Ok(map) => Some(map),
        Err(e) => {
            warn!(error = %e, "ignoring unreadable preferences cookie");
            None
        }
    }
}

/// Whether `category` (case-insensitive) has been explicitly allowed.
///
/// Without a readable cookie, or when the category is not in it, only
/// `necessary` is allowed.
pub fn is_allowed(cookies: &str, category: &str) -> bool {
    let category = category.to_lowercase();
    match stored_preferences(cookies) {
        Some(preferences) => match preferences.get(&category) {
            Some(value) => *value == Value::Bool(true),
            None => category == NECESSARY,
        },
        None => category == NECESSARY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cookie_for(preferences: &Value) -> String {
        let set_cookie = set_cookie_string(preferences).unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[test]
    fn set_cookie_attributes() {
        let set_cookie = set_cookie_string(&json!({"analytics": true})).unwrap();
        assert!(set_cookie.starts_with("cookie_preferences=%7B%22analytics%22%3Atrue%7D;"));
        assert!(set_cookie.ends_with("; path=/; max-age=31536000; SameSite=Lax"));
    }

    #[test]
    fn no_cookie_allows_only_necessary() {
        assert!(is_allowed("", "necessary"));
        assert!(is_allowed("", "NECESSARY"));
        assert!(!is_allowed("", "analytics"));
        assert!(!is_allowed("session=abc; theme=dark", "marketing"));
    }

    #[test]
    fn explicit_true_required() {
        let cookies = cookie_for(&json!({
            "necessary": true,
            "analytics": false,
            "marketing": "true",
            "functional": 1,
        }));
        assert!(is_allowed(&cookies, "necessary"));
        assert!(!is_allowed(&cookies, "analytics"));
        assert!(!is_allowed(&cookies, "marketing"));
        assert!(!is_allowed(&cookies, "functional"));
        assert!(!is_allowed(&cookies, "preferences"));
    }

    #[test]
    fn category_lowercased_before_lookup() {
        let cookies = cookie_for(&json!({"marketing": true}));
        assert!(is_allowed(&cookies, "Marketing"));
        assert!(is_allowed(&cookies, "MARKETING"));
    }

    #[test]
    fn missing_key_allows_only_necessary() {
        let cookies = cookie_for(&json!({"analytics": true}));
        assert!(is_allowed(&cookies, "necessary"));
        assert!(is_allowed(&cookies, "Necessary"));
        assert!(!is_allowed(&cookies, "marketing"));
    }

    #[test]
    fn stored_cookie_can_deny_necessary() {
        let cookies = cookie_for(&json!({"necessary": false, "analytics": true}));
        assert!(!is_allowed(&cookies, "necessary"));
    }

    #[test]
    fn found_among_other_cookies() {
        let cookies = format!(
            "session=abc; {}; theme=dark",
            cookie_for(&json!({"analytics": true}))
        );
        assert!(is_allowed(&cookies, "analytics"));
    }

    #[test]
    fn similarly_named_cookie_ignored() {
        let cookies = "old_cookie_preferences=%7B%22analytics%22%3Atrue%7D";
        assert!(find_preferences(cookies).is_none());
        assert!(!is_allowed(cookies, "analytics"));
    }

    #[test]
    fn garbage_fails_closed() {
        assert!(!is_allowed("cookie_preferences=not-json", "analytics"));
        assert!(is_allowed("cookie_preferences=not-json", "necessary"));
        assert!(!is_allowed("cookie_preferences=%5Btrue%5D", "0"));
        assert!(is_allowed("cookie_preferences=%FF%FE", "necessary"));
    }

    #[test]
    fn decodes_browser_encoding() {
        // encodeURIComponent leaves ':' escaped but not '!' or '*'
        let map = decode_preferences("%7B%22analytics%22%3Atrue%2C%22x!*%22%3Afalse%7D").unwrap();
        assert_eq!(map.get("analytics"), Some(&json!(true)));
        assert_eq!(map.get("x!*"), Some(&json!(false)));
    }

    #[test]
    fn stores_exact_map() {
        let preferences = json!({"marketing": true, "necessary": true});
        let cookies = cookie_for(&preferences);
        let stored = stored_preferences(&cookies).unwrap();
        assert_eq!(Value::Object(stored), preferences);
    }
}
