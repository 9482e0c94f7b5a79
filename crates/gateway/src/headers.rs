use http::HeaderMap;
use http::header::{
    CACHE_CONTROL, CONTENT_LENGTH, CONTENT_SECURITY_POLICY, CONTENT_TYPE, HeaderName, HeaderValue, REFERRER_POLICY,
    X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
};

/// Policy for HTML documents. Course content relies on inline and `eval`ed
/// scripts, so those are permitted; everything else is pinned to the artifact's
/// own origin.
pub const CONTENT_SECURITY_POLICY_VALUE: &str = "default-src 'self'; \
    script-src 'self' 'unsafe-inline' 'unsafe-eval'; \
    style-src 'self' 'unsafe-inline'; \
    img-src 'self' data: blob:; \
    media-src 'self' data: blob:; \
    font-src 'self' data:; \
    connect-src 'self'; \
    frame-src 'self'; \
    frame-ancestors 'self'; \
    form-action 'none'; \
    base-uri 'self'";
pub const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");
const PERMISSIONS_POLICY_VALUE: &str = "geolocation=(), microphone=(), camera=(), payment=()";
const CACHE_CONTROL_VALUE: &str = "public, max-age=3600";

/// Headers sent with every served file.
pub fn apply_common(headers: &mut HeaderMap, mime: &'static str, length: u64) {
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(mime));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));
}

/// Extra restrictions for HTML documents only.
pub fn apply_document(headers: &mut HeaderMap) {
    headers.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static(CONTENT_SECURITY_POLICY_VALUE));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("same-origin"));
    headers.insert(PERMISSIONS_POLICY, HeaderValue::from_static(PERMISSIONS_POLICY_VALUE));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_is_single_line() {
        assert!(!CONTENT_SECURITY_POLICY_VALUE.contains('\n'));
        assert!(CONTENT_SECURITY_POLICY_VALUE.contains("; script-src 'self' 'unsafe-inline' 'unsafe-eval'; "));
        assert!(CONTENT_SECURITY_POLICY_VALUE.ends_with("base-uri 'self'"));
    }

    #[test]
    fn test_apply() {
        let mut headers = HeaderMap::new();
        apply_common(&mut headers, "text/css", 6);
        assert_eq!(headers[CONTENT_LENGTH], "6");
        assert!(!headers.contains_key(CONTENT_SECURITY_POLICY));
        apply_document(&mut headers);
        assert_eq!(headers[REFERRER_POLICY], "same-origin");
        assert!(headers.contains_key("permissions-policy"));
    }
}
