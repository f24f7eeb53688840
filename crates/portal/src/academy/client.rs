//! HTTP client for the academy API.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use touchline_core::{PlayerId, TeamId};

use crate::academy::types::{
    AttendanceRecord, AuthGrant, CheckinReceipt, Invoice, MatchSummary, RosterEntry,
};
use crate::academy::ApiError;
use crate::models::{AccountUser, ProfileUpdate, RegistrationPayload};

/// Client for the academy API.
///
/// Cheaply cloneable via `Arc`; one instance is shared across the portal.
#[derive(Clone)]
pub struct AcademyClient {
    inner: Arc<AcademyClientInner>,
}

struct AcademyClientInner {
    client: reqwest::Client,
    base_url: Url,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire envelopes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    identifier: &'a str,
    secret: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
struct CheckinBody<'a> {
    code: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    success: bool,
    user: Option<AccountUser>,
    token: Option<String>,
    refresh_token: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPair {
    access_token: String,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    success: bool,
    user: Option<AccountUser>,
    tokens: Option<TokenPair>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    success: bool,
    user: Option<AccountUser>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    success: bool,
    access_token: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AckResponse {
    success: bool,
    message: Option<String>,
}

/// Generic envelope for resource endpoints (`{success, data, message}`).
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    success: bool,
    data: Option<T>,
    message: Option<String>,
}

/// Failure body shape shared by every endpoint.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

impl AcademyClient {
    /// Create a new academy API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            inner: Arc::new(AcademyClientInner { client, base_url }),
        })
    }

    /// The base URL this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}{path}",
            self.inner.base_url.as_str().trim_end_matches('/')
        )
    }

    // ─────────────────────────────────────────────────────────────────────
    // Authentication
    // ─────────────────────────────────────────────────────────────────────

    /// Authenticate with an identifier (username or email) and secret.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] or [`ApiError::Unauthorized`] when the
    /// credentials are declined, transport-class errors otherwise.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<AuthGrant, ApiError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("/auth/login"))
            .json(&LoginBody { identifier, secret })
            .send()
            .await?;

        let body: LoginResponse = read_body(response).await?;
        if !body.success {
            return Err(rejected(body.message, "authentication failed"));
        }

        let (Some(user), Some(token)) = (body.user, body.token) else {
            return Err(ApiError::Malformed("login response missing user or token"));
        };

        Ok(AuthGrant {
            user,
            token,
            refresh_token: body.refresh_token,
        })
    }

    /// Create a new account.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] with the server's message for expected
    /// failures such as a duplicate email.
    pub async fn register(&self, payload: &RegistrationPayload) -> Result<AuthGrant, ApiError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("/auth/register"))
            .json(payload)
            .send()
            .await?;

        let body: RegisterResponse = read_body(response).await?;
        if !body.success {
            return Err(rejected(body.message, "registration failed"));
        }

        let (Some(user), Some(tokens)) = (body.user, body.tokens) else {
            return Err(ApiError::Malformed(
                "register response missing user or tokens",
            ));
        };

        Ok(AuthGrant {
            user,
            token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }

    /// Invalidate the session server-side.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails; callers treat this as best-effort.
    pub async fn logout(&self, token: &str) -> Result<(), ApiError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("/auth/logout"))
            .bearer_auth(token)
            .send()
            .await?;

        let body: AckResponse = read_body(response).await?;
        if !body.success {
            return Err(rejected(body.message, "logout failed"));
        }
        Ok(())
    }

    /// Verify a stored token and fetch the canonical user record.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] when the token is no longer valid.
    pub async fn verify(&self, token: &str) -> Result<AccountUser, ApiError> {
        let response = self
            .inner
            .client
            .get(self.endpoint("/auth/verify"))
            .bearer_auth(token)
            .send()
            .await?;

        let body: UserResponse = read_body(response).await?;
        if !body.success {
            return Err(rejected(body.message, "session verification failed"));
        }
        body.user
            .ok_or(ApiError::Malformed("verify response missing user"))
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] when the refresh token has expired.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("/auth/refresh"))
            .json(&RefreshBody { refresh_token })
            .send()
            .await?;

        let body: RefreshResponse = read_body(response).await?;
        if !body.success {
            return Err(rejected(body.message, "session refresh failed"));
        }
        body.access_token
            .ok_or(ApiError::Malformed("refresh response missing access token"))
    }

    /// Update the signed-in user's own profile.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] when the token is no longer valid,
    /// [`ApiError::Rejected`] for validation failures.
    pub async fn update_profile(
        &self,
        token: &str,
        changes: &ProfileUpdate,
    ) -> Result<AccountUser, ApiError> {
        let response = self
            .inner
            .client
            .put(self.endpoint("/auth/profile"))
            .bearer_auth(token)
            .json(changes)
            .send()
            .await?;

        let body: UserResponse = read_body(response).await?;
        if !body.success {
            return Err(rejected(body.message, "profile update failed"));
        }
        body.user
            .ok_or(ApiError::Malformed("profile response missing user"))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Resources
    // ─────────────────────────────────────────────────────────────────────

    /// Fetch a team's roster.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the session is invalid.
    pub async fn team_roster(
        &self,
        token: &str,
        team_id: TeamId,
    ) -> Result<Vec<RosterEntry>, ApiError> {
        self.get_data(token, &format!("/teams/{team_id}/roster"))
            .await
    }

    /// Fetch a player's training attendance history.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the session is invalid.
    pub async fn player_attendance(
        &self,
        token: &str,
        player_id: PlayerId,
    ) -> Result<Vec<AttendanceRecord>, ApiError> {
        self.get_data(token, &format!("/players/{player_id}/attendance"))
            .await
    }

    /// Fetch the invoices visible to this account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the session is invalid.
    pub async fn invoices(&self, token: &str) -> Result<Vec<Invoice>, ApiError> {
        self.get_data(token, "/billing/invoices").await
    }

    /// Fetch match results and statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the session is invalid.
    pub async fn match_stats(&self, token: &str) -> Result<Vec<MatchSummary>, ApiError> {
        self.get_data(token, "/matches/stats").await
    }

    /// Record a QR check-in from an already-decoded code.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] when the code is unknown or expired.
    pub async fn record_checkin(
        &self,
        token: &str,
        code: &str,
    ) -> Result<CheckinReceipt, ApiError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("/checkins"))
            .bearer_auth(token)
            .json(&CheckinBody { code })
            .send()
            .await?;

        let body: DataEnvelope<CheckinReceipt> = read_body(response).await?;
        if !body.success {
            return Err(rejected(body.message, "check-in failed"));
        }
        body.data
            .ok_or(ApiError::Malformed("check-in response missing receipt"))
    }

    /// GET a `{success, data}` resource envelope.
    async fn get_data<T: DeserializeOwned>(&self, token: &str, path: &str) -> Result<T, ApiError> {
        let response = self
            .inner
            .client
            .get(self.endpoint(path))
            .bearer_auth(token)
            .send()
            .await?;

        let body: DataEnvelope<T> = read_body(response).await?;
        if !body.success {
            return Err(rejected(body.message, "request declined"));
        }
        body.data
            .ok_or(ApiError::Malformed("resource response missing data"))
    }
}

/// Map a response to a decoded body or an [`ApiError`].
///
/// 401 becomes [`ApiError::Unauthorized`] (with the body message when
/// parseable); other non-success statuses become [`ApiError::Rejected`] when
/// the body carries a message, [`ApiError::Status`] otherwise.
async fn read_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        let message = response
            .text()
            .await
            .ok()
            .and_then(|text| serde_json::from_str::<ErrorBody>(&text).ok())
            .and_then(|body| body.message);
        return Err(ApiError::Unauthorized { message });
    }

    let text = response.text().await?;

    if !status.is_success() {
        if let Ok(body) = serde_json::from_str::<ErrorBody>(&text)
            && let Some(message) = body.message
        {
            return Err(ApiError::Rejected { message });
        }
        return Err(ApiError::Status(status));
    }

    Ok(serde_json::from_str(&text)?)
}

/// Build a rejection from an optional server message.
fn rejected(message: Option<String>, fallback: &str) -> ApiError {
    ApiError::Rejected {
        message: message.unwrap_or_else(|| fallback.to_string()),
    }
}
