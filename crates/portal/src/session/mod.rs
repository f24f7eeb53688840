//! The session store: single source of truth for "who is logged in".
//!
//! One [`SessionStore`] lives for the whole process. It hydrates once from the
//! persisted vault at boot, verifies the stored token against the academy API,
//! and thereafter is mutated only by its own operations (`login`, `logout`,
//! `register`, `refresh`, `update_profile`, `invalidate`). Everything else —
//! guards, templates, route handlers — reads through [`SessionSnapshot`].
//!
//! # State model
//!
//! The phase is explicit rather than a single loading flag:
//!
//! - `Anonymous` — no session.
//! - `Hydrating(identity)` — a persisted identity was found and is being
//!   verified; consumers may show the optimistic user but guards treat this
//!   as loading (no redirect flicker before verification settles).
//! - `Verified(identity)` — the server confirmed the token.
//!
//! [`Identity`] holds user and token together, so "token present iff user
//! present" holds by construction.
//!
//! # Failure policy
//!
//! User-initiated operations catch every failure at the operation boundary
//! and return it as a value; nothing propagates into the rendering tree.
//! Background verification failures clear the session silently — they are an
//! integrity check, not a user action.

pub mod vault;

use std::fmt;
use std::path::Path;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tokio::sync::OnceCell;

use touchline_core::{Capability, Resource, Role};

use crate::academy::{AcademyClient, ApiError, AuthGrant};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{AccountUser, ProfileUpdate, RegistrationPayload};
use vault::{FileVault, MemoryVault, SessionVault, keys};

/// Which vault tier a session is persisted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageTier {
    /// Survives restarts ("remember me").
    Durable,
    /// Dies with the process.
    Scoped,
}

/// An authenticated identity: the user record and its bearer token.
#[derive(Clone)]
pub struct Identity {
    user: AccountUser,
    token: String,
}

impl Identity {
    /// Pair a user with its token.
    #[must_use]
    pub const fn new(user: AccountUser, token: String) -> Self {
        Self { user, token }
    }

    /// The user record.
    #[must_use]
    pub const fn user(&self) -> &AccountUser {
        &self.user
    }

    /// The bearer token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Where the session currently stands.
#[derive(Debug, Clone, Default)]
pub enum SessionPhase {
    /// No session.
    #[default]
    Anonymous,
    /// Persisted identity loaded, verification in flight.
    Hydrating(Identity),
    /// Server-confirmed identity.
    Verified(Identity),
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    phase: SessionPhase,
    tier: Option<StorageTier>,
    initialized: bool,
    loading: bool,
    last_error: Option<String>,
}

/// Failure of a user-initiated session operation.
///
/// Always presentable: `Display` is the message shown next to the form.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The academy API declined the operation.
    #[error("{0}")]
    Rejected(String),

    /// The API could not be reached or answered unintelligibly.
    #[error("network error, please try again")]
    Network,

    /// The operation requires a signed-in session.
    #[error("you are not signed in")]
    NotAuthenticated,
}

/// Convert an API failure into a presentable operation failure.
///
/// `rejected_fallback` is used when the server declined without a message.
fn classify(error: &ApiError, rejected_fallback: &str) -> SessionError {
    match error {
        ApiError::Rejected { message } => SessionError::Rejected(message.clone()),
        ApiError::Unauthorized { message } => SessionError::Rejected(
            message
                .clone()
                .unwrap_or_else(|| rejected_fallback.to_string()),
        ),
        ApiError::Transport(_)
        | ApiError::Status(_)
        | ApiError::Parse(_)
        | ApiError::Malformed(_) => SessionError::Network,
    }
}

/// Process-scoped session store.
///
/// Cheaply cloneable via `Arc`; all clones share one state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    api: AcademyClient,
    durable: Box<dyn SessionVault>,
    scoped: Box<dyn SessionVault>,
    state: RwLock<SessionState>,
    hydration: OnceCell<()>,
}

impl SessionStore {
    /// Create a store with a file-backed durable tier under `state_dir`.
    #[must_use]
    pub fn open(api: AcademyClient, state_dir: &Path) -> Self {
        Self::with_vaults(
            api,
            Box::new(FileVault::open(state_dir.join("session.json"))),
            Box::new(MemoryVault::new()),
        )
    }

    /// Create a store over explicit vault tiers.
    #[must_use]
    pub fn with_vaults(
        api: AcademyClient,
        durable: Box<dyn SessionVault>,
        scoped: Box<dyn SessionVault>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                api,
                durable,
                scoped,
                state: RwLock::new(SessionState::default()),
                hydration: OnceCell::new(),
            }),
        }
    }

    fn vault(&self, tier: StorageTier) -> &dyn SessionVault {
        match tier {
            StorageTier::Durable => self.inner.durable.as_ref(),
            StorageTier::Scoped => self.inner.scoped.as_ref(),
        }
    }

    fn wipe_vaults(&self) {
        for key in keys::ALL {
            self.inner.durable.delete(key);
            self.inner.scoped.delete(key);
        }
    }

    fn read_state(&self) -> SessionState {
        self.inner
            .state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn write_state<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self
            .inner
            .state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut state)
    }

    fn begin_operation(&self) {
        self.write_state(|state| {
            state.loading = true;
            state.last_error = None;
        });
    }

    fn finish_operation(&self, error: Option<String>) {
        self.write_state(|state| {
            state.loading = false;
            state.last_error = error;
        });
    }

    /// Drop the session locally: in-memory state and both vault tiers.
    fn clear_local(&self) {
        self.write_state(|state| {
            state.phase = SessionPhase::Anonymous;
            state.tier = None;
        });
        self.wipe_vaults();
        clear_sentry_user();
    }

    /// Install a fresh grant as the verified session.
    fn install(&self, grant: AuthGrant, tier: StorageTier) -> AccountUser {
        // Stale keys in the other tier must not resurrect an old session on
        // the next boot.
        self.wipe_vaults();

        let vault = self.vault(tier);
        vault.put(keys::TOKEN, &grant.token);
        if let Some(refresh_token) = &grant.refresh_token {
            vault.put(keys::REFRESH_TOKEN, refresh_token);
        }
        if let Ok(json) = serde_json::to_string(&grant.user) {
            vault.put(keys::USER, &json);
        }

        set_sentry_user(&grant.user.id, Some(grant.user.email.as_str()));

        let user = grant.user.clone();
        self.write_state(|state| {
            state.phase = SessionPhase::Verified(Identity::new(grant.user, grant.token));
            state.tier = Some(tier);
        });
        user
    }

    // ─────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────

    /// Hydrate the session from the persisted vault, once per process.
    ///
    /// Concurrent calls collapse onto a single hydration attempt; every
    /// caller returns once it has completed. Ends with the store initialized
    /// regardless of outcome.
    pub async fn initialize(&self) {
        self.inner
            .hydration
            .get_or_init(|| async {
                self.hydrate().await;
            })
            .await;
    }

    async fn hydrate(&self) {
        let loaded = self.load_persisted();

        let Some((identity, tier)) = loaded.identity else {
            if loaded.wipe {
                self.wipe_vaults();
            }
            self.write_state(|state| {
                state.phase = SessionPhase::Anonymous;
                state.initialized = true;
                state.loading = false;
            });
            return;
        };

        // Optimistic: show the persisted identity while the token is checked.
        self.write_state(|state| {
            state.phase = SessionPhase::Hydrating(identity.clone());
            state.tier = Some(tier);
            state.loading = true;
        });

        match self.inner.api.verify(identity.token()).await {
            Ok(user) => {
                if let Ok(json) = serde_json::to_string(&user) {
                    self.vault(tier).put(keys::USER, &json);
                }
                set_sentry_user(&user.id, Some(user.email.as_str()));
                self.write_state(|state| {
                    state.phase = SessionPhase::Verified(Identity::new(user, identity.token));
                });
            }
            Err(error) => {
                // Background integrity check: clear silently, no user-facing
                // error.
                tracing::debug!(%error, "stored session failed verification, clearing");
                self.wipe_vaults();
                self.write_state(|state| {
                    state.phase = SessionPhase::Anonymous;
                    state.tier = None;
                });
            }
        }

        self.write_state(|state| {
            state.initialized = true;
            state.loading = false;
        });
    }

    /// Read the persisted identity, preferring the durable tier.
    fn load_persisted(&self) -> PersistedLoad {
        for tier in [StorageTier::Durable, StorageTier::Scoped] {
            let vault = self.vault(tier);
            match (vault.get(keys::TOKEN), vault.get(keys::USER)) {
                (None, None) => {}
                (Some(token), Some(json)) => {
                    return match serde_json::from_str::<AccountUser>(&json) {
                        Ok(user) => PersistedLoad {
                            identity: Some((Identity::new(user, token), tier)),
                            wipe: false,
                        },
                        // Unparsable user record: same as no session.
                        Err(_) => PersistedLoad {
                            identity: None,
                            wipe: true,
                        },
                    };
                }
                // Token without user (or vice versa): same as no session.
                _ => {
                    return PersistedLoad {
                        identity: None,
                        wipe: true,
                    };
                }
            }
        }
        PersistedLoad {
            identity: None,
            wipe: false,
        }
    }

    /// Authenticate with an identifier and secret.
    ///
    /// On success the session is installed and persisted to the tier chosen
    /// by `remember`. On failure the session is untouched and the failure is
    /// returned as a value; `last_error` carries the same message.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Rejected`] for declined credentials (with the
    /// server's message when present) and [`SessionError::Network`] for
    /// transport-class failures. Never panics, never propagates transport
    /// errors.
    pub async fn login(
        &self,
        identifier: &str,
        secret: &str,
        remember: bool,
    ) -> Result<AccountUser, SessionError> {
        self.begin_operation();
        match self.inner.api.login(identifier, secret).await {
            Ok(grant) => {
                let tier = if remember {
                    StorageTier::Durable
                } else {
                    StorageTier::Scoped
                };
                let user = self.install(grant, tier);
                self.finish_operation(None);
                tracing::info!(user = %user.username, role = %user.role, "signed in");
                Ok(user)
            }
            Err(error) => {
                let failure = classify(&error, "invalid username or password");
                self.finish_operation(Some(failure.to_string()));
                Err(failure)
            }
        }
    }

    /// Create an account; on success behaves exactly like [`Self::login`].
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::login`] — expected failures (duplicate email,
    /// validation) come back as [`SessionError::Rejected`] values.
    pub async fn register(
        &self,
        payload: &RegistrationPayload,
    ) -> Result<AccountUser, SessionError> {
        self.begin_operation();
        match self.inner.api.register(payload).await {
            Ok(grant) => {
                let user = self.install(grant, StorageTier::Durable);
                self.finish_operation(None);
                tracing::info!(user = %user.username, "account registered");
                Ok(user)
            }
            Err(error) => {
                let failure = classify(&error, "registration failed");
                self.finish_operation(Some(failure.to_string()));
                Err(failure)
            }
        }
    }

    /// Sign out.
    ///
    /// Local state and both vault tiers are cleared unconditionally and
    /// immediately; the server-side logout call is fired on a background task
    /// and its failure is logged, never surfaced. Navigation back to the
    /// login view is the calling handler's job.
    pub fn logout(&self) {
        let token = self.write_state(|state| {
            let token = match std::mem::take(&mut state.phase) {
                SessionPhase::Anonymous => None,
                SessionPhase::Hydrating(identity) | SessionPhase::Verified(identity) => {
                    Some(identity.token)
                }
            };
            state.tier = None;
            state.last_error = None;
            token
        });
        self.wipe_vaults();
        clear_sentry_user();

        if let Some(token) = token {
            let api = self.inner.api.clone();
            tokio::spawn(async move {
                if let Err(error) = api.logout(&token).await {
                    tracing::warn!(%error, "logout call to academy API failed");
                }
            });
        }
    }

    /// Exchange the persisted refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotAuthenticated`] without a session or
    /// refresh token. A declined refresh clears the session (the token has
    /// expired; the user signs in again).
    pub async fn refresh(&self) -> Result<(), SessionError> {
        let state = self.read_state();
        let Some(tier) = state.tier else {
            return Err(SessionError::NotAuthenticated);
        };
        let Some(refresh_token) = self.vault(tier).get(keys::REFRESH_TOKEN) else {
            return Err(SessionError::NotAuthenticated);
        };

        self.begin_operation();
        match self.inner.api.refresh(&refresh_token).await {
            Ok(access_token) => {
                self.vault(tier).put(keys::TOKEN, &access_token);
                self.write_state(|state| {
                    if let SessionPhase::Hydrating(identity) | SessionPhase::Verified(identity) =
                        &mut state.phase
                    {
                        identity.token = access_token;
                    }
                });
                self.finish_operation(None);
                Ok(())
            }
            Err(error) => {
                let failure = classify(&error, "session expired, please sign in again");
                self.clear_local();
                self.finish_operation(Some(failure.to_string()));
                Err(failure)
            }
        }
    }

    /// Update the signed-in user's profile with the server's canonical copy.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotAuthenticated`] without a verified session;
    /// an unauthorized response clears the session.
    pub async fn update_profile(
        &self,
        changes: ProfileUpdate,
    ) -> Result<AccountUser, SessionError> {
        let state = self.read_state();
        let SessionPhase::Verified(identity) = state.phase else {
            return Err(SessionError::NotAuthenticated);
        };

        self.begin_operation();
        match self.inner.api.update_profile(&identity.token, &changes).await {
            Ok(user) => {
                if let Some(tier) = state.tier
                    && let Ok(json) = serde_json::to_string(&user)
                {
                    self.vault(tier).put(keys::USER, &json);
                }
                self.write_state(|s| {
                    s.phase = SessionPhase::Verified(Identity::new(user.clone(), identity.token));
                });
                self.finish_operation(None);
                Ok(user)
            }
            Err(error @ ApiError::Unauthorized { .. }) => {
                let failure = classify(&error, "session expired, please sign in again");
                self.clear_local();
                self.finish_operation(Some(failure.to_string()));
                Err(failure)
            }
            Err(error) => {
                let failure = classify(&error, "profile update failed");
                self.finish_operation(Some(failure.to_string()));
                Err(failure)
            }
        }
    }

    /// React to an unauthorized response seen by any other academy call.
    ///
    /// Clears the session and wipes both vault tiers; the caller redirects to
    /// the login view.
    pub fn invalidate(&self) {
        tracing::info!("academy API reported an unauthorized session, clearing");
        self.clear_local();
    }

    /// An owned, consistent view of the current session.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.read_state();
        SessionSnapshot {
            phase: state.phase,
            initialized: state.initialized,
            loading: state.loading,
            last_error: state.last_error,
        }
    }
}

struct PersistedLoad {
    identity: Option<(Identity, StorageTier)>,
    wipe: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Read surface
// ─────────────────────────────────────────────────────────────────────────────

/// A point-in-time view of the session, safe to hold across rendering.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    phase: SessionPhase,
    initialized: bool,
    loading: bool,
    last_error: Option<String>,
}

impl SessionSnapshot {
    /// The current phase.
    #[must_use]
    pub const fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// Whether hydration has been attempted.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether an auth operation is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message from the most recent failed operation.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The verified user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&AccountUser> {
        match &self.phase {
            SessionPhase::Verified(identity) => Some(identity.user()),
            _ => None,
        }
    }

    /// The user including a tentatively-hydrating one (for optimistic UI).
    #[must_use]
    pub const fn optimistic_user(&self) -> Option<&AccountUser> {
        match &self.phase {
            SessionPhase::Hydrating(identity) | SessionPhase::Verified(identity) => {
                Some(identity.user())
            }
            SessionPhase::Anonymous => None,
        }
    }

    /// The verified bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        match &self.phase {
            SessionPhase::Verified(identity) => Some(identity.token()),
            _ => None,
        }
    }

    /// Whether a verified session exists.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.phase, SessionPhase::Verified(_))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Role predicates
    // ─────────────────────────────────────────────────────────────────────

    /// Whether the verified user has exactly this role.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.user().is_some_and(|user| user.role == role)
    }

    /// Whether the verified user's role is in `roles`.
    #[must_use]
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.user().is_some_and(|user| roles.contains(&user.role))
    }

    /// Convenience role checks.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Whether the verified user is a coach.
    #[must_use]
    pub fn is_coach(&self) -> bool {
        self.has_role(Role::Coach)
    }

    /// Whether the verified user is a parent.
    #[must_use]
    pub fn is_parent(&self) -> bool {
        self.has_role(Role::Parent)
    }

    /// Whether the verified user is a player.
    #[must_use]
    pub fn is_player(&self) -> bool {
        self.has_role(Role::Player)
    }

    /// Whether the verified user's role is permitted this capability.
    #[must_use]
    pub fn can_access(&self, capability: Capability) -> bool {
        self.user()
            .is_some_and(|user| capability.permits(user.role))
    }

    /// String-tag capability check, fail-closed for unknown tags.
    #[must_use]
    pub fn can_access_tag(&self, tag: &str) -> bool {
        Capability::from_tag(tag).is_some_and(|capability| self.can_access(capability))
    }

    /// Ownership check for a scoped resource.
    ///
    /// Admins always pass. Coaches pass for their own team and for player
    /// resources (the academy API re-validates roster scope on every call).
    /// Parents and players pass only for their linked player and team.
    /// Everything else is denied.
    #[must_use]
    pub fn can_access_resource(&self, resource: Resource) -> bool {
        let Some(user) = self.user() else {
            return false;
        };
        match user.role {
            Role::Admin => true,
            Role::Coach => match resource {
                Resource::Team(team_id) => user.team_id == Some(team_id),
                Resource::Player(_) => true,
            },
            Role::Parent | Role::Player => match resource {
                Resource::Team(team_id) => user.team_id == Some(team_id),
                Resource::Player(player_id) => user.player_id == Some(player_id),
            },
        }
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use url::Url;

    use touchline_core::{PlayerId, TeamId};

    fn coach_json() -> Value {
        json!({
            "id": 1,
            "username": "coach.ana",
            "displayName": "Ana Ferreira",
            "email": "ana@example.com",
            "role": "coach",
            "teamId": 3
        })
    }

    fn user_fixture(role: Role, team: Option<i32>, player: Option<i32>) -> AccountUser {
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

    async fn spawn_api(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base: &str) -> AcademyClient {
        AcademyClient::new(Url::parse(base).unwrap(), Duration::from_secs(2)).unwrap()
    }

    struct Harness {
        store: SessionStore,
        durable: Arc<MemoryVault>,
        scoped: Arc<MemoryVault>,
    }

    fn harness(base: &str, durable: MemoryVault, scoped: MemoryVault) -> Harness {
        let durable = Arc::new(durable);
        let scoped = Arc::new(scoped);
        let store = SessionStore::with_vaults(
            client(base),
            Box::new(Arc::clone(&durable)),
            Box::new(Arc::clone(&scoped)),
        );
        Harness {
            store,
            durable,
            scoped,
        }
    }

    fn seeded_durable() -> MemoryVault {
        MemoryVault::seeded([
            (keys::TOKEN, "T1"),
            (keys::USER, &coach_json().to_string()),
        ])
    }

    // ─────────────────────────────────────────────────────────────────────
    // initialize()
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn initialize_without_persisted_session_makes_no_network_call() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/auth/verify",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!({"success": true, "user": coach_json()}))
                }
            }),
        );
        let base = spawn_api(router).await;
        let h = harness(&base, MemoryVault::new(), MemoryVault::new());

        h.store.initialize().await;

        let session = h.store.snapshot();
        assert!(session.is_initialized());
        assert!(!session.is_loading());
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
        assert!(session.token().is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn initialize_replaces_user_with_canonical_record() {
        let router = Router::new().route(
            "/auth/verify",
            get(|| async {
                let mut user = coach_json();
                user["displayName"] = json!("Coach A");
                Json(json!({"success": true, "user": user}))
            }),
        );
        let base = spawn_api(router).await;
        let h = harness(&base, seeded_durable(), MemoryVault::new());

        h.store.initialize().await;

        let session = h.store.snapshot();
        assert!(session.is_authenticated());
        assert_eq!(session.user().unwrap().display_name, "Coach A");
        assert_eq!(session.token(), Some("T1"));

        // Persisted record updated to match the server's copy.
        let stored = h.durable.get(keys::USER).unwrap();
        assert!(stored.contains("Coach A"));
    }

    #[tokio::test]
    async fn concurrent_initialize_collapses_to_one_verification() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/auth/verify",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Json(json!({"success": true, "user": coach_json()}))
                }
            }),
        );
        let base = spawn_api(router).await;
        let h = harness(&base, seeded_durable(), MemoryVault::new());

        tokio::join!(h.store.initialize(), h.store.initialize(), h.store.initialize());

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(h.store.snapshot().is_authenticated());
    }

    #[tokio::test]
    async fn verification_failure_clears_session_silently() {
        let router = Router::new().route(
            "/auth/verify",
            get(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"success": false, "message": "Token expired"})),
                )
            }),
        );
        let base = spawn_api(router).await;
        let h = harness(&base, seeded_durable(), MemoryVault::new());

        h.store.initialize().await;

        let session = h.store.snapshot();
        assert!(session.is_initialized());
        assert!(!session.is_authenticated());
        // Background check: no user-visible error.
        assert_eq!(session.last_error(), None);
        assert_eq!(h.durable.get(keys::TOKEN), None);
        assert_eq!(h.durable.get(keys::USER), None);
    }

    #[tokio::test]
    async fn corrupted_user_record_reads_as_no_session() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/auth/verify",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!({"success": true, "user": coach_json()}))
                }
            }),
        );
        let base = spawn_api(router).await;
        let durable = MemoryVault::seeded([(keys::TOKEN, "abc"), (keys::USER, "not-json")]);
        let h = harness(&base, durable, MemoryVault::new());

        h.store.initialize().await;

        let session = h.store.snapshot();
        assert!(session.is_initialized());
        assert!(session.user().is_none());
        assert!(session.token().is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(h.durable.get(keys::TOKEN), None);
    }

    #[tokio::test]
    async fn token_without_user_reads_as_no_session() {
        let router = Router::new();
        let base = spawn_api(router).await;
        let durable = MemoryVault::seeded([(keys::TOKEN, "orphan")]);
        let h = harness(&base, durable, MemoryVault::new());

        h.store.initialize().await;

        assert!(!h.store.snapshot().is_authenticated());
        assert_eq!(h.durable.get(keys::TOKEN), None);
    }

    // ─────────────────────────────────────────────────────────────────────
    // login()
    // ─────────────────────────────────────────────────────────────────────

    fn login_router() -> Router {
        Router::new().route(
            "/auth/login",
            post(|Json(body): Json<Value>| async move {
                if body["identifier"] == "admin" && body["secret"] == "admin123" {
                    Json(json!({
                        "success": true,
                        "user": {
                            "id": 2,
                            "username": "admin",
                            "displayName": "Site Admin",
                            "email": "admin@example.com",
                            "role": "admin"
                        },
                        "token": "T2",
                        "refreshToken": "R2"
                    }))
                    .into_response()
                } else {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"success": false, "message": "Invalid credentials"})),
                    )
                        .into_response()
                }
            }),
        )
    }

    #[tokio::test]
    async fn login_success_persists_to_durable_tier() {
        let base = spawn_api(login_router()).await;
        let h = harness(&base, MemoryVault::new(), MemoryVault::new());

        let user = h.store.login("admin", "admin123", true).await.unwrap();
        assert_eq!(user.role, Role::Admin);

        let session = h.store.snapshot();
        assert!(session.is_authenticated());
        assert!(!session.is_loading());
        assert_eq!(session.token(), Some("T2"));
        assert_eq!(h.durable.get(keys::TOKEN), Some("T2".to_string()));
        assert_eq!(h.durable.get(keys::REFRESH_TOKEN), Some("R2".to_string()));
        assert_eq!(h.scoped.get(keys::TOKEN), None);
    }

    #[tokio::test]
    async fn login_without_remember_uses_scoped_tier() {
        let base = spawn_api(login_router()).await;
        let h = harness(&base, MemoryVault::new(), MemoryVault::new());

        h.store.login("admin", "admin123", false).await.unwrap();

        assert_eq!(h.scoped.get(keys::TOKEN), Some("T2".to_string()));
        assert_eq!(h.durable.get(keys::TOKEN), None);
    }

    #[tokio::test]
    async fn rejected_login_surfaces_server_message_and_keeps_state() {
        let base = spawn_api(login_router()).await;
        let h = harness(&base, MemoryVault::new(), MemoryVault::new());
        h.store.initialize().await;

        let failure = h.store.login("bad", "bad", true).await.unwrap_err();
        assert_eq!(
            failure,
            SessionError::Rejected("Invalid credentials".to_string())
        );

        let session = h.store.snapshot();
        assert!(!session.is_authenticated());
        assert!(!session.is_loading());
        assert_eq!(session.last_error(), Some("Invalid credentials"));
        assert_eq!(h.durable.get(keys::TOKEN), None);
    }

    #[tokio::test]
    async fn unreachable_api_becomes_network_error() {
        // Port 1 is never bound in test environments.
        let h = harness("http://127.0.0.1:1", MemoryVault::new(), MemoryVault::new());

        let failure = h.store.login("admin", "admin123", true).await.unwrap_err();
        assert_eq!(failure, SessionError::Network);
        assert_eq!(
            h.store.snapshot().last_error(),
            Some("network error, please try again")
        );
    }

    #[tokio::test]
    async fn login_replaces_prior_session_in_other_tier() {
        let base = spawn_api(login_router()).await;
        let h = harness(&base, MemoryVault::new(), MemoryVault::new());

        h.store.login("admin", "admin123", false).await.unwrap();
        h.store.login("admin", "admin123", true).await.unwrap();

        // The scoped copy from the first login must not linger.
        assert_eq!(h.scoped.get(keys::TOKEN), None);
        assert_eq!(h.durable.get(keys::TOKEN), Some("T2".to_string()));
    }

    // ─────────────────────────────────────────────────────────────────────
    // logout()
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn logout_clears_locally_even_when_api_fails() {
        let router = login_router().route(
            "/auth/logout",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let base = spawn_api(router).await;
        let h = harness(&base, MemoryVault::new(), MemoryVault::new());

        h.store.login("admin", "admin123", true).await.unwrap();
        h.store.logout();

        // Cleared synchronously, before the background call resolves.
        let session = h.store.snapshot();
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
        for key in keys::ALL {
            assert_eq!(h.durable.get(key), None);
            assert_eq!(h.scoped.get(key), None);
        }
    }

    #[tokio::test]
    async fn logout_notifies_the_api_best_effort() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = login_router().route(
            "/auth/logout",
            post(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!({"success": true}))
                }
            }),
        );
        let base = spawn_api(router).await;
        let h = harness(&base, MemoryVault::new(), MemoryVault::new());

        h.store.login("admin", "admin123", true).await.unwrap();
        h.store.logout();

        // The fire-and-forget call lands eventually.
        for _ in 0..50 {
            if hits.load(Ordering::SeqCst) == 1 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("logout endpoint was never called");
    }

    // ─────────────────────────────────────────────────────────────────────
    // register(), refresh(), update_profile(), invalidate()
    // ─────────────────────────────────────────────────────────────────────

    fn registration() -> RegistrationPayload {
        RegistrationPayload {
            username: "new.parent".to_string(),
            secret: "hunter22".to_string(),
            display_name: "New Parent".to_string(),
            email: "parent@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn register_success_behaves_like_login() {
        let router = Router::new().route(
            "/auth/register",
            post(|| async {
                Json(json!({
                    "success": true,
                    "user": {
                        "id": 5,
                        "username": "new.parent",
                        "displayName": "New Parent",
                        "email": "parent@example.com",
                        "role": "parent",
                        "playerId": 11
                    },
                    "tokens": {"accessToken": "T5", "refreshToken": "R5"}
                }))
            }),
        );
        let base = spawn_api(router).await;
        let h = harness(&base, MemoryVault::new(), MemoryVault::new());

        let user = h.store.register(&registration()).await.unwrap();
        assert_eq!(user.role, Role::Parent);
        assert_eq!(h.store.snapshot().token(), Some("T5"));
        assert_eq!(h.durable.get(keys::TOKEN), Some("T5".to_string()));
    }

    #[tokio::test]
    async fn register_duplicate_email_is_an_error_value_not_a_panic() {
        let router = Router::new().route(
            "/auth/register",
            post(|| async {
                (
                    StatusCode::CONFLICT,
                    Json(json!({"success": false, "message": "Email already registered"})),
                )
            }),
        );
        let base = spawn_api(router).await;
        let h = harness(&base, MemoryVault::new(), MemoryVault::new());

        let failure = h.store.register(&registration()).await.unwrap_err();
        assert_eq!(
            failure,
            SessionError::Rejected("Email already registered".to_string())
        );
        assert!(!h.store.snapshot().is_authenticated());
    }

    #[tokio::test]
    async fn refresh_replaces_the_access_token() {
        let router = login_router().route(
            "/auth/refresh",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["refreshToken"], "R2");
                Json(json!({"success": true, "accessToken": "T3"}))
            }),
        );
        let base = spawn_api(router).await;
        let h = harness(&base, MemoryVault::new(), MemoryVault::new());

        h.store.login("admin", "admin123", true).await.unwrap();
        h.store.refresh().await.unwrap();

        assert_eq!(h.store.snapshot().token(), Some("T3"));
        assert_eq!(h.durable.get(keys::TOKEN), Some("T3".to_string()));
    }

    #[tokio::test]
    async fn declined_refresh_clears_the_session() {
        let router = login_router().route(
            "/auth/refresh",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"success": false, "message": "Refresh token expired"})),
                )
            }),
        );
        let base = spawn_api(router).await;
        let h = harness(&base, MemoryVault::new(), MemoryVault::new());

        h.store.login("admin", "admin123", true).await.unwrap();
        let failure = h.store.refresh().await.unwrap_err();

        assert_eq!(
            failure,
            SessionError::Rejected("Refresh token expired".to_string())
        );
        assert!(!h.store.snapshot().is_authenticated());
        assert_eq!(h.durable.get(keys::TOKEN), None);
    }

    #[tokio::test]
    async fn update_profile_re_persists_the_canonical_user() {
        let router = login_router().route(
            "/auth/profile",
            axum::routing::put(|Json(body): Json<Value>| async move {
                assert_eq!(body["displayName"], "Site Administrator");
                Json(json!({
                    "success": true,
                    "user": {
                        "id": 2,
                        "username": "admin",
                        "displayName": "Site Administrator",
                        "email": "admin@example.com",
                        "role": "admin"
                    }
                }))
            }),
        );
        let base = spawn_api(router).await;
        let h = harness(&base, MemoryVault::new(), MemoryVault::new());

        h.store.login("admin", "admin123", true).await.unwrap();
        let user = h
            .store
            .update_profile(ProfileUpdate {
                display_name: Some("Site Administrator".to_string()),
                email: None,
            })
            .await
            .unwrap();

        assert_eq!(user.display_name, "Site Administrator");
        assert!(
            h.durable
                .get(keys::USER)
                .unwrap()
                .contains("Site Administrator")
        );
    }

    #[tokio::test]
    async fn update_profile_requires_a_session() {
        let base = spawn_api(Router::new()).await;
        let h = harness(&base, MemoryVault::new(), MemoryVault::new());

        let failure = h
            .store
            .update_profile(ProfileUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(failure, SessionError::NotAuthenticated);
    }

    #[tokio::test]
    async fn invalidate_clears_session_and_vaults() {
        let base = spawn_api(login_router()).await;
        let h = harness(&base, MemoryVault::new(), MemoryVault::new());

        h.store.login("admin", "admin123", true).await.unwrap();
        h.store.invalidate();

        assert!(!h.store.snapshot().is_authenticated());
        assert_eq!(h.durable.get(keys::TOKEN), None);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Snapshot predicates
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn token_and_user_are_coupled() {
        let anonymous = testing::anonymous(true);
        assert!(anonymous.user().is_none() && anonymous.token().is_none());

        let verified = testing::verified(user_fixture(Role::Coach, Some(3), None));
        assert!(verified.user().is_some() && verified.token().is_some());
    }

    #[test]
    fn hydrating_user_is_optimistic_only() {
        let snapshot = testing::hydrating(user_fixture(Role::Coach, Some(3), None));
        assert!(snapshot.user().is_none());
        assert!(snapshot.optimistic_user().is_some());
        assert!(!snapshot.is_authenticated());
    }

    #[test]
    fn capability_checks_follow_the_table() {
        let parent = testing::verified(user_fixture(Role::Parent, Some(3), Some(11)));
        assert!(parent.can_access(Capability::Billing));
        assert!(!parent.can_access(Capability::Roster));
        assert!(parent.can_access_tag("billing"));
        assert!(!parent.can_access_tag("roster"));
        // Unknown tags are denied for everyone.
        assert!(!parent.can_access_tag("trophy-cabinet"));
        let admin = testing::verified(user_fixture(Role::Admin, None, None));
        assert!(!admin.can_access_tag("trophy-cabinet"));
    }

    #[test]
    fn resource_checks_scope_by_ownership() {
        let admin = testing::verified(user_fixture(Role::Admin, None, None));
        assert!(admin.can_access_resource(Resource::Team(TeamId::new(99))));
        assert!(admin.can_access_resource(Resource::Player(PlayerId::new(99))));

        let coach = testing::verified(user_fixture(Role::Coach, Some(3), None));
        assert!(coach.can_access_resource(Resource::Team(TeamId::new(3))));
        assert!(!coach.can_access_resource(Resource::Team(TeamId::new(4))));
        assert!(coach.can_access_resource(Resource::Player(PlayerId::new(11))));

        let parent = testing::verified(user_fixture(Role::Parent, Some(3), Some(11)));
        assert!(parent.can_access_resource(Resource::Player(PlayerId::new(11))));
        assert!(!parent.can_access_resource(Resource::Player(PlayerId::new(12))));
        assert!(parent.can_access_resource(Resource::Team(TeamId::new(3))));

        let anonymous = testing::anonymous(true);
        assert!(!anonymous.can_access_resource(Resource::Player(PlayerId::new(11))));
    }

    #[test]
    fn role_predicates() {
        let coach = testing::verified(user_fixture(Role::Coach, Some(3), None));
        assert!(coach.is_coach());
        assert!(!coach.is_admin());
        assert!(coach.has_any_role(&[Role::Admin, Role::Coach]));
        assert!(!coach.has_any_role(&[Role::Admin]));
        assert!(!coach.has_any_role(&[]));
    }
}
