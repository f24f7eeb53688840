//! Session extractors for route handlers.
//!
//! Every request re-reads the session store; there is no per-request cache to
//! go stale. `CurrentSession` never rejects; `RequireUser` runs the
//! authenticated guard and rejects with the guard's own rendering.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::guard::{GuardRejection, RouteGuard};
use crate::models::AccountUser;
use crate::session::SessionSnapshot;
use crate::state::AppState;

/// Extractor providing the current session snapshot.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentSession(session): CurrentSession) -> impl IntoResponse {
///     match session.user() {
///         Some(user) => format!("Hello, {}!", user.display_name),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct CurrentSession(pub SessionSnapshot);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(state.session().snapshot()))
    }
}

/// Extractor that requires a verified session.
///
/// Rejections render through the access guard: a loading page while the
/// session hydrates, a login redirect (carrying the requested path) when
/// there is no session.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_name)
/// }
/// ```
pub struct RequireUser(pub AccountUser);

const AUTH_GUARD: RouteGuard = RouteGuard::authenticated();

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = GuardRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = state.session().snapshot();
        let requested = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_owned(), |pq| pq.as_str().to_owned());

        AUTH_GUARD.check(&session, None, &requested).map(Self)
    }
}
