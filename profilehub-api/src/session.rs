/// Recovery session cookie handling
///
/// The forgot-password flow tracks its attempt budget per browsing
/// session. The session is an opaque random identifier carried in an
/// HttpOnly cookie; the counter itself lives in the attempt store keyed by
/// that identifier.

use axum::http::HeaderMap;
use rand::RngCore;

/// Cookie carrying the recovery session identifier
pub const RECOVERY_COOKIE: &str = "recovery_session";

/// Generates a fresh opaque session identifier (128 bits, hex)
pub fn new_session_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Extracts the recovery session identifier from request headers
///
/// Accepts only well-formed hex identifiers so arbitrary client input
/// never becomes a store key.
pub fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;

    for pair in cookies.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        if parts.next() == Some(RECOVERY_COOKIE) {
            let value = parts.next().unwrap_or("");
            if value.len() == 32 && value.chars().all(|c| c.is_ascii_hexdigit()) {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Set-Cookie value establishing the recovery session
pub fn set_cookie_value(session_id: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        RECOVERY_COOKIE, session_id
    )
}

/// Set-Cookie value invalidating the recovery session
///
/// Sent after a successful password reset so the session identifier that
/// reached the reset cannot be reused.
pub fn clear_cookie_value() -> String {
    format!("{}=; Path=/; Max-Age=0; HttpOnly", RECOVERY_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    #[test]
    fn test_new_session_id_shape() {
        let id = new_session_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_session_id());
    }

    #[test]
    fn test_session_roundtrip_through_headers() {
        let id = new_session_id();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            format!("other=1; {}={}; theme=dark", RECOVERY_COOKIE, id)
                .parse()
                .unwrap(),
        );

        assert_eq!(session_from_headers(&headers), Some(id));
    }

    #[test]
    fn test_missing_cookie() {
        let headers = HeaderMap::new();
        assert_eq!(session_from_headers(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "theme=dark".parse().unwrap());
        assert_eq!(session_from_headers(&headers), None);
    }

    #[test]
    fn test_malformed_session_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            format!("{}=../../etc/passwd", RECOVERY_COOKIE).parse().unwrap(),
        );
        assert_eq!(session_from_headers(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, format!("{}=abc", RECOVERY_COOKIE).parse().unwrap());
        assert_eq!(session_from_headers(&headers), None);
    }

    #[test]
    fn test_cookie_values() {
        let set = set_cookie_value("aabbccdd");
        assert!(set.starts_with("recovery_session=aabbccdd"));
        assert!(set.contains("HttpOnly"));

        let clear = clear_cookie_value();
        assert!(clear.contains("Max-Age=0"));
    }
}
