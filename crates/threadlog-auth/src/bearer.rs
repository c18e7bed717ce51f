use crate::error::{AuthError, Result};

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(authorization: Option<&str>) -> Result<String> {
    let header = authorization.ok_or(AuthError::MissingToken)?;
    let parts: Vec<&str> = header.split(' ').collect();
    let [scheme, token] = parts.as_slice() else {
        return Err(AuthError::MissingToken);
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingToken);
    }
    if token.trim().is_empty() {
        return Err(AuthError::EmptyToken);
    }
    Ok((*token).to_string())
}

/// Value of cookie `name` from a `Cookie` request header.
pub fn read_cookie(cookie_header: Option<&str>, name: &str) -> Option<String> {
    cookie_header?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Bearer header first; the access cookie is consulted only when the header
/// is absent and a cookie name is given.
pub fn resolve_access_token(
    authorization: Option<&str>,
    cookie_header: Option<&str>,
    fallback_cookie: Option<&str>,
) -> Result<String> {
    match (authorization, fallback_cookie) {
        (None, Some(name)) => read_cookie(cookie_header, name).ok_or(AuthError::MissingToken),
        _ => extract_bearer(authorization),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(Some("Bearer abc")).unwrap(), "abc");
        assert_eq!(extract_bearer(Some("bearer abc")).unwrap(), "abc");
        assert_eq!(extract_bearer(Some("BEARER abc")).unwrap(), "abc");
    }

    #[test]
    fn test_extract_bearer_failures() {
        assert!(matches!(extract_bearer(None), Err(AuthError::MissingToken)));
        assert!(matches!(extract_bearer(Some("Basic abc")), Err(AuthError::MissingToken)));
        assert!(matches!(extract_bearer(Some("Bearer")), Err(AuthError::MissingToken)));
        assert!(matches!(extract_bearer(Some("Bearer a b")), Err(AuthError::MissingToken)));
        assert!(matches!(extract_bearer(Some("Bearer ")), Err(AuthError::EmptyToken)));
    }

    #[test]
    fn test_read_cookie() {
        let header = Some("theme=dark; refresh_token=r-123; sb-access=a-9");
        assert_eq!(read_cookie(header, "refresh_token").as_deref(), Some("r-123"));
        assert_eq!(read_cookie(header, "sb-access").as_deref(), Some("a-9"));
        assert_eq!(read_cookie(header, "missing"), None);
        assert_eq!(read_cookie(Some("refresh_token="), "refresh_token"), None);
        assert_eq!(read_cookie(None, "refresh_token"), None);
    }

    #[test]
    fn test_cookie_fallback_only_without_header() {
        let cookies = Some("sb-access=from-cookie");
        assert_eq!(
            resolve_access_token(None, cookies, Some("sb-access")).unwrap(),
            "from-cookie"
        );
        assert_eq!(
            resolve_access_token(Some("Bearer from-header"), cookies, Some("sb-access")).unwrap(),
            "from-header"
        );
        assert!(resolve_access_token(Some("garbage"), cookies, Some("sb-access")).is_err());
        assert!(resolve_access_token(None, cookies, None).is_err());
    }
}
