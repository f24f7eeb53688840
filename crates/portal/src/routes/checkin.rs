//! QR check-in route handlers.
//!
//! The camera and frame decoding happen on the device; by the time a request
//! reaches the portal the QR payload is just a code string. A rejected code
//! (unknown, expired, already used) re-renders the desk with the message
//! inline rather than erroring the page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use touchline_core::Capability;

use crate::academy::{ApiError, CheckinReceipt};
use crate::error::AppError;
use crate::guard::RouteGuard;
use crate::middleware::CurrentSession;
use crate::routes::{Nav, recover_unauthorized};
use crate::session::SessionError;
use crate::state::AppState;

const GUARD: RouteGuard = RouteGuard::capability(Capability::QrCheckin);

/// Check-in form data.
#[derive(Debug, Deserialize)]
pub struct CheckinForm {
    /// The decoded QR payload.
    pub code: String,
}

/// Check-in desk template.
#[derive(Template, WebTemplate)]
#[template(path = "checkin.html")]
pub struct CheckinTemplate {
    pub nav: Nav,
    pub receipt: Option<CheckinReceipt>,
    pub error: Option<String>,
}

/// Display the check-in desk.
pub async fn checkin_page(
    CurrentSession(session): CurrentSession,
) -> Result<Response, AppError> {
    if let Err(rejection) = GUARD.check(&session, None, "/checkin") {
        return Ok(rejection.into_response());
    }

    Ok(CheckinTemplate {
        nav: Nav::from_session(&session),
        receipt: None,
        error: None,
    }
    .into_response())
}

/// Record a scanned code.
pub async fn record(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Form(form): Form<CheckinForm>,
) -> Result<Response, AppError> {
    if let Err(rejection) = GUARD.check(&session, None, "/checkin") {
        return Ok(rejection.into_response());
    }
    let Some(token) = session.token() else {
        return Err(AppError::Session(SessionError::NotAuthenticated));
    };

    let nav = Nav::from_session(&session);
    match state.academy().record_checkin(token, &form.code).await {
        Ok(receipt) => {
            tracing::info!(player = %receipt.player_id, "check-in recorded");
            Ok(CheckinTemplate {
                nav,
                receipt: Some(receipt),
                error: None,
            }
            .into_response())
        }
        Err(ApiError::Rejected { message }) => Ok(CheckinTemplate {
            nav,
            receipt: None,
            error: Some(message),
        }
        .into_response()),
        Err(error) => recover_unauthorized(&state, error),
    }
}
