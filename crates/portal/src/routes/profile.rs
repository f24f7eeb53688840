//! Profile route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::middleware::{CurrentSession, RequireUser};
use crate::models::ProfileUpdate;
use crate::routes::Nav;
use crate::session::SessionError;
use crate::state::AppState;

/// Profile form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub display_name: String,
    pub email: String,
}

/// Query parameters for the profile page.
#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub saved: Option<String>,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub nav: Nav,
    pub display_name: String,
    pub email: String,
    pub saved: bool,
    pub error: Option<String>,
}

/// Display the profile form.
pub async fn profile_page(
    CurrentSession(session): CurrentSession,
    RequireUser(user): RequireUser,
    Query(query): Query<ProfileQuery>,
) -> ProfileTemplate {
    ProfileTemplate {
        nav: Nav::from_session(&session),
        display_name: user.display_name,
        email: user.email.into_inner(),
        saved: query.saved.is_some(),
        error: None,
    }
}

/// Handle profile form submission.
pub async fn update(State(state): State<AppState>, Form(form): Form<ProfileForm>) -> Response {
    let changes = ProfileUpdate {
        display_name: non_empty(form.display_name),
        email: non_empty(form.email),
    };

    match state.session().update_profile(changes).await {
        Ok(_) => Redirect::to("/profile?saved=1").into_response(),
        Err(SessionError::NotAuthenticated) => Redirect::to("/auth/login").into_response(),
        Err(failure) => {
            let session = state.session().snapshot();
            let Some(user) = session.user().cloned() else {
                // The failed update invalidated the session.
                return Redirect::to("/auth/login").into_response();
            };
            ProfileTemplate {
                nav: Nav::from_session(&session),
                display_name: user.display_name,
                email: user.email.into_inner(),
                saved: false,
                error: Some(failure.to_string()),
            }
            .into_response()
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
