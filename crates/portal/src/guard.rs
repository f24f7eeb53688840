//! The access guard: a declarative gate over the session.
//!
//! Each protected view declares a [`RouteGuard`]; evaluation is a pure
//! function over the guard, a [`SessionSnapshot`], and an optional
//! [`Resource`], re-run fresh on every request. Checks short-circuit in a
//! fixed order — loading, authentication, role, capability, resource — and
//! the first failing check decides the outcome.
//!
//! Authorization failure is not an error channel: a denied request renders a
//! permission panel, a missing session redirects to the login view, and an
//! unsettled session renders a neutral loading page. The guard performs no
//! I/O.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use touchline_core::{Capability, Resource, Role};

use crate::models::AccountUser;
use crate::session::{SessionPhase, SessionSnapshot};

/// Static description of what a view requires.
#[derive(Debug, Clone, Copy)]
pub struct RouteGuard {
    /// Whether a verified session is required at all.
    pub require_auth: bool,
    /// Roles allowed in; empty means any authenticated role.
    pub require_roles: &'static [Role],
    /// Capability the view is gated on, consulting the permission table.
    pub require_capability: Option<Capability>,
}

impl RouteGuard {
    /// A view open to everyone.
    #[must_use]
    pub const fn public() -> Self {
        Self {
            require_auth: false,
            require_roles: &[],
            require_capability: None,
        }
    }

    /// A view requiring any authenticated role.
    #[must_use]
    pub const fn authenticated() -> Self {
        Self {
            require_auth: true,
            require_roles: &[],
            require_capability: None,
        }
    }

    /// A view restricted to the given roles.
    #[must_use]
    pub const fn roles(roles: &'static [Role]) -> Self {
        Self {
            require_auth: true,
            require_roles: roles,
            require_capability: None,
        }
    }

    /// A view gated on a capability from the permission table.
    #[must_use]
    pub const fn capability(capability: Capability) -> Self {
        Self {
            require_auth: true,
            require_roles: &[],
            require_capability: Some(capability),
        }
    }

    /// Evaluate this guard against the current session.
    ///
    /// `requested` is the original path-and-query, preserved through the
    /// login redirect so the user lands back where they were headed.
    #[must_use]
    pub fn evaluate(
        &self,
        session: &SessionSnapshot,
        resource: Option<Resource>,
        requested: Option<&str>,
    ) -> GuardOutcome {
        // Loading wins over everything until hydration settles; deciding a
        // redirect before verification completes would flicker users who are
        // actually signed in.
        if !session.is_initialized()
            || session.is_loading()
            || matches!(session.phase(), SessionPhase::Hydrating(_))
        {
            return GuardOutcome::Loading;
        }

        let Some(user) = session.user() else {
            if self.require_auth
                || !self.require_roles.is_empty()
                || self.require_capability.is_some()
            {
                return GuardOutcome::RedirectToLogin {
                    return_to: requested.map(str::to_owned),
                };
            }
            return GuardOutcome::Granted;
        };

        if !self.require_roles.is_empty() && !self.require_roles.contains(&user.role) {
            return GuardOutcome::Denied(DenyReason::Role);
        }

        if let Some(capability) = self.require_capability
            && !capability.permits(user.role)
        {
            return GuardOutcome::Denied(DenyReason::Capability);
        }

        if let Some(resource) = resource
            && !session.can_access_resource(resource)
        {
            return GuardOutcome::Denied(DenyReason::Resource);
        }

        GuardOutcome::Granted
    }

    /// Evaluate and hand back the authenticated user, or a renderable
    /// rejection.
    ///
    /// # Errors
    ///
    /// Returns the [`GuardRejection`] to render in place of the view.
    pub fn check(
        &self,
        session: &SessionSnapshot,
        resource: Option<Resource>,
        requested: &str,
    ) -> Result<AccountUser, GuardRejection> {
        match self.evaluate(session, resource, Some(requested)) {
            GuardOutcome::Granted => match session.user() {
                Some(user) => Ok(user.clone()),
                // Public guards grant without a user; gated handlers always
                // require one.
                None => Err(GuardRejection::RedirectToLogin {
                    return_to: Some(requested.to_owned()),
                }),
            },
            GuardOutcome::Loading => Err(GuardRejection::Loading),
            GuardOutcome::RedirectToLogin { return_to } => {
                Err(GuardRejection::RedirectToLogin { return_to })
            }
            GuardOutcome::Denied(reason) => Err(GuardRejection::Denied(reason)),
        }
    }
}

/// Why a guard denied an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Role not in the required set.
    Role,
    /// Role not permitted the required capability.
    Capability,
    /// Ownership check failed for the requested resource.
    Resource,
}

impl DenyReason {
    /// The message shown on the permission panel.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Role | Self::Capability => "Your account does not have access to this area.",
            Self::Resource => "You do not have access to this player or team.",
        }
    }
}

/// The decision a guard reaches, in short-circuit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Session still hydrating; render a neutral loading page.
    Loading,
    /// No session; send the user to the login view.
    RedirectToLogin {
        /// Original path-and-query to return to after signing in.
        return_to: Option<String>,
    },
    /// Authenticated but not authorized; render the permission panel.
    Denied(DenyReason),
    /// Render the wrapped content.
    Granted,
}

/// A guard decision rendered in place of the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardRejection {
    /// Session still hydrating.
    Loading,
    /// No session.
    RedirectToLogin {
        /// Original path-and-query to return to after signing in.
        return_to: Option<String>,
    },
    /// Authenticated but not authorized.
    Denied(DenyReason),
}

/// Only same-origin paths may ride through the login redirect.
#[must_use]
pub fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//")
}

#[derive(Template, WebTemplate)]
#[template(path = "loading.html")]
struct LoadingTemplate;

#[derive(Template, WebTemplate)]
#[template(path = "denied.html")]
struct DeniedTemplate {
    message: &'static str,
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Loading => LoadingTemplate.into_response(),
            Self::RedirectToLogin { return_to } => {
                let target = return_to
                    .filter(|path| is_local_path(path))
                    .map_or_else(
                        || "/auth/login".to_string(),
                        |path| format!("/auth/login?return_to={}", urlencoding::encode(&path)),
                    );
                Redirect::to(&target).into_response()
            }
            Self::Denied(reason) => (
                StatusCode::FORBIDDEN,
                DeniedTemplate {
                    message: reason.message(),
                },
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use serde_json::json;

    use touchline_core::{PlayerId, TeamId};

    use crate::session::testing;

    fn user(role: Role, team: Option<i32>, player: Option<i32>) -> AccountUser {
        serde_json::from_value(json!({
            "id": 9,
            "username": "fixture",
            "displayName": "Fixture",
            "email": "fixture@example.com",
            "role": role,
            "teamId": team,
            "playerId": player,
        }))
        .unwrap()
    }

    #[test]
    fn loading_wins_before_initialization_regardless_of_other_conditions() {
        // Unauthenticated AND the guard wants an admin role: Loading still
        // decides while hydration has not been attempted.
        let guard = RouteGuard::roles(&[Role::Admin]);
        let session = testing::anonymous(false);
        assert_eq!(
            guard.evaluate(&session, None, Some("/roster")),
            GuardOutcome::Loading
        );
    }

    #[test]
    fn hydrating_session_is_loading_not_redirect() {
        let guard = RouteGuard::authenticated();
        let session = testing::hydrating(user(Role::Coach, Some(3), None));
        assert_eq!(guard.evaluate(&session, None, None), GuardOutcome::Loading);
    }

    #[test]
    fn unauthenticated_redirects_and_preserves_the_requested_path() {
        let guard = RouteGuard::authenticated();
        let session = testing::anonymous(true);
        assert_eq!(
            guard.evaluate(&session, None, Some("/billing?month=3")),
            GuardOutcome::RedirectToLogin {
                return_to: Some("/billing?month=3".to_string())
            }
        );
    }

    #[test]
    fn public_guard_grants_without_a_session() {
        let guard = RouteGuard::public();
        let session = testing::anonymous(true);
        assert_eq!(guard.evaluate(&session, None, None), GuardOutcome::Granted);
    }

    #[test]
    fn wrong_role_is_denied_not_redirected() {
        let guard = RouteGuard::roles(&[Role::Admin]);
        let session = testing::verified(user(Role::Parent, Some(3), Some(11)));
        assert_eq!(
            guard.evaluate(&session, None, Some("/admin")),
            GuardOutcome::Denied(DenyReason::Role)
        );
    }

    #[test]
    fn missing_capability_is_denied() {
        let guard = RouteGuard::capability(Capability::Roster);
        let session = testing::verified(user(Role::Parent, Some(3), Some(11)));
        assert_eq!(
            guard.evaluate(&session, None, None),
            GuardOutcome::Denied(DenyReason::Capability)
        );
    }

    #[test]
    fn resource_mismatch_is_denied_after_capability_passes() {
        let guard = RouteGuard::capability(Capability::TrainingAttendance);
        let session = testing::verified(user(Role::Parent, Some(3), Some(11)));
        assert_eq!(
            guard.evaluate(
                &session,
                Some(Resource::Player(PlayerId::new(12))),
                None
            ),
            GuardOutcome::Denied(DenyReason::Resource)
        );
        assert_eq!(
            guard.evaluate(
                &session,
                Some(Resource::Player(PlayerId::new(11))),
                None
            ),
            GuardOutcome::Granted
        );
    }

    #[test]
    fn role_check_short_circuits_before_resource_check() {
        let guard = RouteGuard::roles(&[Role::Admin]);
        let session = testing::verified(user(Role::Parent, Some(3), Some(11)));
        // Both role and resource would fail; the role check decides.
        assert_eq!(
            guard.evaluate(&session, Some(Resource::Team(TeamId::new(4))), None),
            GuardOutcome::Denied(DenyReason::Role)
        );
    }

    #[test]
    fn admin_passes_every_stage() {
        let guard = RouteGuard::capability(Capability::AdminPanel);
        let session = testing::verified(user(Role::Admin, None, None));
        assert_eq!(
            guard.evaluate(&session, Some(Resource::Team(TeamId::new(42))), None),
            GuardOutcome::Granted
        );
    }

    #[test]
    fn check_hands_back_the_user_on_grant() {
        let guard = RouteGuard::authenticated();
        let session = testing::verified(user(Role::Coach, Some(3), None));
        let granted = guard.check(&session, None, "/").unwrap();
        assert_eq!(granted.username, "fixture");
    }

    #[test]
    fn local_path_filter() {
        assert!(is_local_path("/billing"));
        assert!(is_local_path("/billing?month=3"));
        assert!(!is_local_path("//evil.example.com"));
        assert!(!is_local_path("https://evil.example.com"));
        assert!(!is_local_path(""));
    }
}
