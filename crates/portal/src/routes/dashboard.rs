//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;

use crate::middleware::{CurrentSession, RequireUser};
use crate::routes::Nav;

/// Dashboard page template.
///
/// Tiles render off the nav capability flags, so each role sees only the
/// areas its guard would grant.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub nav: Nav,
    pub display_name: String,
    pub role: String,
    /// Deep link to the linked player's attendance, for family accounts.
    pub attendance_path: Option<String>,
}

/// Display the role-aware dashboard.
pub async fn dashboard(
    CurrentSession(session): CurrentSession,
    RequireUser(user): RequireUser,
) -> DashboardTemplate {
    let attendance_path = user
        .player_id
        .map(|player_id| format!("/attendance/{player_id}"));

    DashboardTemplate {
        nav: Nav::from_session(&session),
        display_name: user.display_name,
        role: user.role.to_string(),
        attendance_path,
    }
}
