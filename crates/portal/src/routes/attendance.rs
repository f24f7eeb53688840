//! Training attendance route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};

use touchline_core::{Capability, PlayerId, Resource};

use crate::academy::AttendanceRecord;
use crate::error::AppError;
use crate::guard::RouteGuard;
use crate::middleware::CurrentSession;
use crate::routes::{Nav, recover_unauthorized};
use crate::session::SessionError;
use crate::state::AppState;

const GUARD: RouteGuard = RouteGuard::capability(Capability::TrainingAttendance);

/// Attendance page template.
#[derive(Template, WebTemplate)]
#[template(path = "attendance.html")]
pub struct AttendanceTemplate {
    pub nav: Nav,
    pub player_id: PlayerId,
    pub records: Vec<AttendanceRecord>,
}

/// Display a player's training attendance.
///
/// The resource check scopes parents to their linked player; coaches pass
/// (the academy API re-validates roster scope on the call itself).
pub async fn attendance(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(player_id): Path<i32>,
) -> Result<Response, AppError> {
    let player_id = PlayerId::new(player_id);
    let requested = format!("/attendance/{player_id}");

    if let Err(rejection) = GUARD.check(&session, Some(Resource::Player(player_id)), &requested) {
        return Ok(rejection.into_response());
    }
    let Some(token) = session.token() else {
        return Err(AppError::Session(SessionError::NotAuthenticated));
    };

    match state.academy().player_attendance(token, player_id).await {
        Ok(records) => Ok(AttendanceTemplate {
            nav: Nav::from_session(&session),
            player_id,
            records,
        }
        .into_response()),
        Err(error) => recover_unauthorized(&state, error),
    }
}
