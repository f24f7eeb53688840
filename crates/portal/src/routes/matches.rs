//! Match statistics route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};

use touchline_core::Capability;

use crate::academy::MatchSummary;
use crate::error::AppError;
use crate::guard::RouteGuard;
use crate::middleware::CurrentSession;
use crate::routes::{Nav, recover_unauthorized};
use crate::session::SessionError;
use crate::state::AppState;

const GUARD: RouteGuard = RouteGuard::capability(Capability::Statistics);

/// Match statistics page template.
#[derive(Template, WebTemplate)]
#[template(path = "matches.html")]
pub struct MatchesTemplate {
    pub nav: Nav,
    pub results: Vec<MatchSummary>,
}

/// Display match results and statistics.
pub async fn matches(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Response, AppError> {
    if let Err(rejection) = GUARD.check(&session, None, "/matches") {
        return Ok(rejection.into_response());
    }
    let Some(token) = session.token() else {
        return Err(AppError::Session(SessionError::NotAuthenticated));
    };

    match state.academy().match_stats(token).await {
        Ok(results) => Ok(MatchesTemplate {
            nav: Nav::from_session(&session),
            results,
        }
        .into_response()),
        Err(error) => recover_unauthorized(&state, error),
    }
}
