//! HTTP route handlers for the portal.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Dashboard (requires auth)
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (session store hydrated)
//!
//! # Auth
//! GET  /auth/login              - Login page
//! POST /auth/login              - Login action
//! GET  /auth/register           - Registration page
//! POST /auth/register           - Registration action
//! POST /auth/logout             - Logout action
//!
//! # Academy views (each declares its own guard)
//! GET  /roster                  - Team roster           (capability: roster)
//! GET  /attendance/{player_id}  - Training attendance   (capability: training-attendance)
//! GET  /billing                 - Invoices              (capability: billing)
//! GET  /matches                 - Match statistics      (capability: statistics)
//! GET  /checkin                 - QR check-in desk      (capability: qr-checkin)
//! POST /checkin                 - Record a scanned code (capability: qr-checkin)
//!
//! # Account
//! GET  /profile                 - Profile form (requires auth)
//! POST /profile                 - Profile update action
//! ```

pub mod attendance;
pub mod auth;
pub mod billing;
pub mod checkin;
pub mod dashboard;
pub mod matches;
pub mod profile;
pub mod roster;

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};

use touchline_core::Capability;

use crate::academy::ApiError;
use crate::error::AppError;
use crate::session::SessionSnapshot;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create all routes for the portal.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::dashboard))
        .route("/roster", get(roster::roster))
        .route("/attendance/{player_id}", get(attendance::attendance))
        .route("/billing", get(billing::billing))
        .route("/matches", get(matches::matches))
        .route("/checkin", get(checkin::checkin_page).post(checkin::record))
        .route("/profile", get(profile::profile_page).post(profile::update))
        .nest("/auth", auth_routes())
}

/// Header/navigation context shared by every page template.
///
/// Tiles and links render off capability checks, so the navigation can never
/// offer a view its guard would deny.
pub struct Nav {
    pub signed_in: bool,
    pub display_name: String,
    pub role: String,
    pub can_roster: bool,
    pub can_attendance: bool,
    pub can_billing: bool,
    pub can_statistics: bool,
    pub can_checkin: bool,
    pub can_admin: bool,
}

impl Nav {
    /// Build the navigation context from the current session.
    #[must_use]
    pub fn from_session(session: &SessionSnapshot) -> Self {
        let user = session.user();
        Self {
            signed_in: session.is_authenticated(),
            display_name: user.map(|u| u.display_name.clone()).unwrap_or_default(),
            role: user.map(|u| u.role.to_string()).unwrap_or_default(),
            can_roster: session.can_access(Capability::Roster),
            can_attendance: session.can_access(Capability::TrainingAttendance),
            can_billing: session.can_access(Capability::Billing),
            can_statistics: session.can_access(Capability::Statistics),
            can_checkin: session.can_access(Capability::QrCheckin),
            can_admin: session.can_access(Capability::AdminPanel),
        }
    }
}

/// Handle an academy API failure from a page handler.
///
/// An unauthorized response means the session died behind our back: clear it
/// and send the user to the login view. Everything else propagates as an
/// application error.
pub(crate) fn recover_unauthorized(state: &AppState, error: ApiError) -> Result<Response, AppError> {
    if matches!(error, ApiError::Unauthorized { .. }) {
        state.session().invalidate();
        return Ok(Redirect::to("/auth/login").into_response());
    }
    Err(AppError::Academy(error))
}
