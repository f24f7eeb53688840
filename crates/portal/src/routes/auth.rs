//! Authentication route handlers.
//!
//! Login and registration submit to the session store; a failed attempt
//! re-renders the form with the failure message inline and never navigates
//! away. A successful login returns to the originally requested page when the
//! guard preserved one.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::guard::is_local_path;
use crate::middleware::CurrentSession;
use crate::models::RegistrationPayload;
use crate::routes::Nav;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    /// Checkbox: present means "keep me signed in across restarts".
    #[serde(default)]
    pub remember: Option<String>,
    #[serde(default)]
    pub return_to: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Query parameters carried into the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub return_to: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub error: Option<String>,
    pub return_to: Option<String>,
}

/// Registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub nav: Nav,
    pub error: Option<String>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    CurrentSession(session): CurrentSession,
    Query(query): Query<LoginQuery>,
) -> Response {
    if session.is_authenticated() {
        return Redirect::to("/").into_response();
    }

    LoginTemplate {
        nav: Nav::from_session(&session),
        error: None,
        return_to: query.return_to.filter(|path| is_local_path(path)),
    }
    .into_response()
}

/// Handle login form submission.
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let remember = form.remember.is_some();
    match state
        .session()
        .login(&form.username, &form.password, remember)
        .await
    {
        Ok(_) => {
            let target = form
                .return_to
                .filter(|path| is_local_path(path))
                .unwrap_or_else(|| "/".to_string());
            Redirect::to(&target).into_response()
        }
        Err(failure) => {
            tracing::warn!(user = %form.username, error = %failure, "login failed");
            LoginTemplate {
                nav: Nav::from_session(&state.session().snapshot()),
                error: Some(failure.to_string()),
                return_to: form.return_to.filter(|path| is_local_path(path)),
            }
            .into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(CurrentSession(session): CurrentSession) -> Response {
    if session.is_authenticated() {
        return Redirect::to("/").into_response();
    }

    RegisterTemplate {
        nav: Nav::from_session(&session),
        error: None,
    }
    .into_response()
}

/// Handle registration form submission.
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    let nav = |state: &AppState| Nav::from_session(&state.session().snapshot());

    // Validate locally before involving the API.
    if form.password != form.password_confirm {
        return RegisterTemplate {
            nav: nav(&state),
            error: Some("passwords do not match".to_string()),
        }
        .into_response();
    }
    if form.password.len() < 8 {
        return RegisterTemplate {
            nav: nav(&state),
            error: Some("password must be at least 8 characters".to_string()),
        }
        .into_response();
    }

    let payload = RegistrationPayload {
        username: form.username.clone(),
        secret: form.password,
        display_name: form.display_name,
        email: form.email,
    };

    match state.session().register(&payload).await {
        Ok(_) => Redirect::to("/").into_response(),
        Err(failure) => {
            tracing::warn!(user = %form.username, error = %failure, "registration failed");
            RegisterTemplate {
                nav: nav(&state),
                error: Some(failure.to_string()),
            }
            .into_response()
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
///
/// Local state is cleared before this returns; the server-side call is
/// best-effort in the background. Always lands on the login view.
pub async fn logout(State(state): State<AppState>) -> Redirect {
    state.session().logout();
    Redirect::to("/auth/login")
}
