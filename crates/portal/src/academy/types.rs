//! Wire types for the academy API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use touchline_core::{InvoiceId, MatchId, PlayerId};

use crate::models::AccountUser;

/// A successful authentication: the canonical user plus its bearer tokens.
#[derive(Debug, Clone)]
pub struct AuthGrant {
    /// Canonical account record from the server.
    pub user: AccountUser,
    /// Bearer access token.
    pub token: String,
    /// Refresh token, when the server issues one.
    pub refresh_token: Option<String>,
}

/// One player line in a team roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub squad_number: Option<u32>,
    #[serde(default)]
    pub position: Option<String>,
}

/// Attendance outcome for one training session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Excused,
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Excused => "excused",
        })
    }
}

/// One training session row for a player.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub session_date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub note: Option<String>,
}

/// An invoice as billed to a family account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: InvoiceId,
    pub description: String,
    /// Formatted amount, rendered as the API supplies it.
    pub amount: String,
    pub due_date: NaiveDate,
    pub paid: bool,
}

/// A match result summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub id: MatchId,
    pub opponent: String,
    pub played_on: NaiveDate,
    pub goals_for: u32,
    pub goals_against: u32,
}

/// Receipt for a recorded QR check-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinReceipt {
    pub player_id: PlayerId,
    pub display_name: String,
    pub recorded_at: DateTime<Utc>,
}
