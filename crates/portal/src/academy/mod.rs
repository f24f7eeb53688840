//! Academy API client.
//!
//! The portal owns no data: accounts, rosters, attendance, billing, and match
//! statistics all live behind the external academy API. This module is the
//! only place that talks to it.
//!
//! # Architecture
//!
//! - Plain JSON over HTTP via `reqwest`, bearer-token authenticated
//! - Responses carry a `success` flag; failures carry a `message` field
//! - Error mapping happens at this boundary: callers see [`ApiError`] and
//!   never a raw transport error
//!
//! # Example
//!
//! ```rust,ignore
//! use touchline_portal::academy::AcademyClient;
//!
//! let client = AcademyClient::new(config.academy_api_url.clone(), config.academy_api_timeout)?;
//! let grant = client.login("coach.ana", "secret").await?;
//! let roster = client.team_roster(&grant.token, team_id).await?;
//! ```

mod client;
pub mod types;

pub use client::AcademyClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when talking to the academy API.
///
/// The split matters to callers: [`ApiError::Rejected`] carries a
/// server-supplied message safe to show to the user, [`ApiError::Unauthorized`]
/// means the session token is no longer valid (consumers clear the session),
/// and everything else is surfaced as a generic network problem.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The endpoint could not be reached (connect, timeout, body read).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success status without a parseable failure body.
    #[error("academy API returned {0}")]
    Status(reqwest::StatusCode),

    /// The API answered and declined the operation.
    #[error("{message}")]
    Rejected {
        /// Server-supplied, user-presentable message.
        message: String,
    },

    /// The bearer token was rejected (401).
    #[error("session is no longer valid")]
    Unauthorized {
        /// Server-supplied message, when the 401 body was parseable.
        message: Option<String>,
    },

    /// A success status with a body that did not decode.
    #[error("unreadable response: {0}")]
    Parse(#[from] serde_json::Error),

    /// A decodable body missing fields the contract requires.
    #[error("unexpected response shape: {0}")]
    Malformed(&'static str),
}

impl ApiError {
    /// True for failures that should read as "network error, try again".
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Status(_) | Self::Parse(_) | Self::Malformed(_)
        )
    }
}
