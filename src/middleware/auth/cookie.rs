//! Session cookie format and parsing.
//!
//! The token travels in an `HttpOnly`, `SameSite=Lax` cookie whose lifetime
//! matches the token TTL.

use axum::http::{HeaderMap, header};
use cookie::{Cookie, SameSite, time::Duration};

pub const SESSION_COOKIE: &str = "access_token";

#[derive(Debug, Clone, Copy)]
pub struct SessionCookie {
    ttl_minutes: u64,
    secure: bool,
}

impl SessionCookie {
    /// `secure` adds the `Secure` attribute (HTTPS-only deployments).
    pub fn new(ttl_minutes: u64, secure: bool) -> Self {
        Self {
            ttl_minutes,
            secure,
        }
    }

    pub fn ttl_minutes(&self) -> u64 {
        self.ttl_minutes
    }

    /// `Set-Cookie` value carrying a freshly issued token.
    pub fn issue(&self, token: &str) -> String {
        let seconds = i64::try_from(self.ttl_minutes.saturating_mul(60)).unwrap_or(i64::MAX);
        self.build(token.to_owned(), Duration::seconds(seconds))
    }

    /// `Set-Cookie` value that makes the browser drop the session.
    pub fn clear(&self) -> String {
        self.build(String::new(), Duration::ZERO)
    }

    fn build(&self, value: String, max_age: Duration) -> String {
        Cookie::build((SESSION_COOKIE, value))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(max_age)
            .secure(self.secure)
            .build()
            .to_string()
    }
}

/// First non-empty value of cookie `name` across all `Cookie` headers.
pub fn read(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| Cookie::split_parse(v))
        .filter_map(Result::ok)
        .filter(|c| c.name() == name)
        .map(|c| c.value().to_owned())
        .find(|v| !v.is_empty())
}
