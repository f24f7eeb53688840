//! Account user types.
//!
//! [`AccountUser`] is the canonical user record as the academy API returns it
//! (camelCase on the wire). It is also the record the session store persists
//! under the `user` vault key.

use serde::{Deserialize, Serialize};

use touchline_core::{Email, PlayerId, Role, TeamId, UserId};

/// The authenticated account as known to the academy API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUser {
    /// Account ID.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Name shown in the portal header.
    pub display_name: String,
    /// Contact email.
    pub email: Email,
    /// Role determining baseline capability.
    pub role: Role,
    /// Team scope for coaches, parents, and players.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    /// Linked player for parents and player accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
}

/// Fields a signed-in user may change about their own account.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Payload for creating a new account.
///
/// The academy API assigns the role (self-registration creates parent
/// accounts; staff accounts are provisioned by an admin).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPayload {
    pub username: String,
    pub secret: String,
    pub display_name: String,
    pub email: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_account_user_wire_format() {
        let json = r#"{
            "id": 7,
            "username": "coach.ana",
            "displayName": "Ana Ferreira",
            "email": "ana@example.com",
            "role": "coach",
            "teamId": 3
        }"#;

        let user: AccountUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, UserId::new(7));
        assert_eq!(user.role, Role::Coach);
        assert_eq!(user.team_id, Some(TeamId::new(3)));
        assert_eq!(user.player_id, None);

        // Round-trips through the same camelCase shape.
        let back = serde_json::to_string(&user).unwrap();
        assert!(back.contains("\"displayName\":\"Ana Ferreira\""));
        assert!(!back.contains("playerId"));
    }
}
