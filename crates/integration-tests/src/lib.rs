//! Shared helpers for Touchline integration tests.
//!
//! The tests in `tests/` drive a running portal over HTTP. See the crate
//! README for the required environment.

#![cfg_attr(not(test), forbid(unsafe_code))]

/// Base URL for the portal under test (configurable via environment).
#[must_use]
pub fn portal_base_url() -> String {
    std::env::var("PORTAL_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// An HTTP client that does not follow redirects, so tests can assert on
/// the redirect decisions the access guard makes.
///
/// # Panics
///
/// Panics if the client cannot be constructed.
#[must_use]
pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}
