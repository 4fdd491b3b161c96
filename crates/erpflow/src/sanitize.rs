//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Job logs are shared with operators; these functions keep login names,
//! embedded URL credentials, and sender addresses out of them.

/// Keeps the first character of a login and masks the rest.
///
/// - `estimator` → `e********`
/// - `` → `<empty>`
pub fn redact_login(login: &str) -> String {
    let mut chars = login.trim().chars();
    match chars.next() {
        Some(first) => format!("{}{}", first, "*".repeat(chars.count())),
        None => "<empty>".to_string(),
    }
}

/// Strips userinfo and the query string from a URL.
///
/// - `https://user:pw@erp.example.com/login?token=x` → `https://****@erp.example.com/login`
/// - `https://erp.example.com/login` → unchanged
pub fn redact_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);

    if let Some(scheme_end) = without_query.find("://") {
        let after_scheme = &without_query[scheme_end + 3..];
        let host_end = after_scheme.find('/').unwrap_or(after_scheme.len());
        if let Some(at_pos) = after_scheme[..host_end].rfind('@') {
            let scheme = &without_query[..scheme_end + 3];
            let after_at = &after_scheme[at_pos + 1..];
            return format!("{}****@{}", scheme, after_at);
        }
    }

    without_query.to_string()
}

/// Masks the local part of an e-mail address, keeping the domain.
pub fn redact_address(address: &str) -> String {
    match address.split_once('@') {
        Some((local, domain)) => format!("{}@{}", redact_login(local), domain),
        None => redact_login(address),
    }
}
