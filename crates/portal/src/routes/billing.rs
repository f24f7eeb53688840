//! Billing route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};

use touchline_core::Capability;

use crate::academy::Invoice;
use crate::error::AppError;
use crate::guard::RouteGuard;
use crate::middleware::CurrentSession;
use crate::routes::{Nav, recover_unauthorized};
use crate::session::SessionError;
use crate::state::AppState;

const GUARD: RouteGuard = RouteGuard::capability(Capability::Billing);

/// Billing page template.
#[derive(Template, WebTemplate)]
#[template(path = "billing.html")]
pub struct BillingTemplate {
    pub nav: Nav,
    pub invoices: Vec<Invoice>,
}

/// Display the invoices visible to this account.
///
/// The API scopes the list to the bearer token, so a parent only ever sees
/// their own family's invoices.
pub async fn billing(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Response, AppError> {
    if let Err(rejection) = GUARD.check(&session, None, "/billing") {
        return Ok(rejection.into_response());
    }
    let Some(token) = session.token() else {
        return Err(AppError::Session(SessionError::NotAuthenticated));
    };

    match state.academy().invoices(token).await {
        Ok(invoices) => Ok(BillingTemplate {
            nav: Nav::from_session(&session),
            invoices,
        }
        .into_response()),
        Err(error) => recover_unauthorized(&state, error),
    }
}
