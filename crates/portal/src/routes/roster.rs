//! Team roster route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use touchline_core::{Capability, Resource, TeamId};

use crate::academy::RosterEntry;
use crate::error::AppError;
use crate::guard::RouteGuard;
use crate::middleware::CurrentSession;
use crate::routes::{Nav, recover_unauthorized};
use crate::state::AppState;

const GUARD: RouteGuard = RouteGuard::capability(Capability::Roster);

/// Query parameters for the roster page.
#[derive(Debug, Deserialize)]
pub struct RosterQuery {
    /// Explicit team (admins); defaults to the signed-in user's team.
    pub team: Option<i32>,
}

/// Roster page template.
#[derive(Template, WebTemplate)]
#[template(path = "roster.html")]
pub struct RosterTemplate {
    pub nav: Nav,
    pub team_id: TeamId,
    pub entries: Vec<RosterEntry>,
}

/// Display a team roster.
pub async fn roster(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<RosterQuery>,
) -> Result<Response, AppError> {
    let requested = query
        .team
        .map_or_else(|| "/roster".to_string(), |team| format!("/roster?team={team}"));

    let team_id = query
        .team
        .map(TeamId::new)
        .or_else(|| session.user().and_then(|user| user.team_id));

    let Some(team_id) = team_id else {
        // Let the guard decide first so unauthenticated users still get the
        // login redirect rather than a bad-request page.
        return match GUARD.check(&session, None, &requested) {
            Ok(_) => Err(AppError::BadRequest("no team selected".to_string())),
            Err(rejection) => Ok(rejection.into_response()),
        };
    };

    if let Err(rejection) = GUARD.check(&session, Some(Resource::Team(team_id)), &requested) {
        return Ok(rejection.into_response());
    }
    let Some(token) = session.token() else {
        return Err(AppError::Session(crate::session::SessionError::NotAuthenticated));
    };

    match state.academy().team_roster(token, team_id).await {
        Ok(entries) => Ok(RosterTemplate {
            nav: Nav::from_session(&session),
            team_id,
            entries,
        }
        .into_response()),
        Err(error) => recover_unauthorized(&state, error),
    }
}
