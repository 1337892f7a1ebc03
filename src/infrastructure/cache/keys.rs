//! Cache key namespaces and the encoding of cached link targets.

/// Value stored under `url:<code>` after a confirmed store miss.
pub const NOT_FOUND_SENTINEL: &str = "NOT_FOUND";
/// Value stored under `url:<code>` after the link was found expired.
pub const EXPIRED_SENTINEL: &str = "EXPIRED";

/// Mapping key for a short code.
pub fn url_key(short_code: &str) -> String {
    format!("url:{short_code}")
}

/// Running click counter for a short code.
pub fn clicks_key(short_code: &str) -> String {
    format!("clicks:{short_code}")
}

/// Portion of the click counter already added to the durable count.
pub fn flushed_key(short_code: &str) -> String {
    format!("clicks_flushed:{short_code}")
}

/// Every click accounting key of a short code.
pub fn click_keys(short_code: &str) -> [String; 2] {
    [clicks_key(short_code), flushed_key(short_code)]
}

/// Logout marker for a user.
pub fn session_key(user_id: &uuid::Uuid) -> String {
    format!("session:{user_id}")
}

/// Password reset token, mapped to the user it was issued to.
pub fn reset_token_key(token: &str) -> String {
    format!("reset_token:{token}")
}

/// Decoded value of a `url:<code>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedTarget {
    Url(String),
    NotFound,
    Expired,
}

impl CachedTarget {
    pub fn parse(raw: String) -> Self {
        match raw.as_str() {
            NOT_FOUND_SENTINEL => CachedTarget::NotFound,
            EXPIRED_SENTINEL => CachedTarget::Expired,
            _ => CachedTarget::Url(raw),
        }
    }

    pub fn as_value(&self) -> &str {
        match self {
            CachedTarget::Url(url) => url,
            CachedTarget::NotFound => NOT_FOUND_SENTINEL,
            CachedTarget::Expired => EXPIRED_SENTINEL,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, CachedTarget::Url(_))
    }
}
