//! Roles, capabilities, and the role-permission table.
//!
//! Every capability the portal gates on is a variant of [`Capability`], and
//! its permitted roles come from the exhaustive match in
//! [`Capability::allowed_roles`]. Adding a capability without a table row is a
//! compile error, not a silent fail-open. String tags (used at the template
//! edge) resolve through [`Capability::from_tag`], which returns `None` for
//! anything unknown so lookups stay fail-closed.

use serde::{Deserialize, Serialize};

use crate::types::id::{PlayerId, TeamId};

/// Identity role determining baseline capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Academy staff with full access, including the admin panel.
    Admin,
    /// Team coach: rosters, attendance, match statistics, check-in.
    Coach,
    /// Parent or guardian of a registered player.
    Parent,
    /// A registered player (older age groups get their own login).
    Player,
}

impl Role {
    /// All roles, in a fixed order.
    pub const ALL: [Self; 4] = [Self::Admin, Self::Coach, Self::Parent, Self::Player];

    /// The wire/display tag for this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Coach => "coach",
            Self::Parent => "parent",
            Self::Player => "player",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named permission gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Team roster views.
    Roster,
    /// Training session attendance views.
    TrainingAttendance,
    /// Invoices and payment history.
    Billing,
    /// Match results and per-player statistics.
    Statistics,
    /// The QR check-in desk.
    QrCheckin,
    /// Academy administration panel.
    AdminPanel,
}

impl Capability {
    /// All capabilities, in a fixed order.
    pub const ALL: [Self; 6] = [
        Self::Roster,
        Self::TrainingAttendance,
        Self::Billing,
        Self::Statistics,
        Self::QrCheckin,
        Self::AdminPanel,
    ];

    /// The role-permission table.
    ///
    /// Exhaustive by construction: a new capability variant does not compile
    /// until it has a row here.
    #[must_use]
    pub const fn allowed_roles(self) -> &'static [Role] {
        match self {
            Self::Roster => &[Role::Admin, Role::Coach],
            Self::TrainingAttendance => &[Role::Admin, Role::Coach, Role::Parent],
            Self::Billing => &[Role::Admin, Role::Parent],
            Self::Statistics => &[Role::Admin, Role::Coach, Role::Player],
            Self::QrCheckin => &[Role::Admin, Role::Coach],
            Self::AdminPanel => &[Role::Admin],
        }
    }

    /// Whether `role` is permitted this capability.
    #[must_use]
    pub fn permits(self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }

    /// The string tag for this capability, as referenced from templates.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Roster => "roster",
            Self::TrainingAttendance => "training-attendance",
            Self::Billing => "billing",
            Self::Statistics => "statistics",
            Self::QrCheckin => "qr-checkin",
            Self::AdminPanel => "admin-panel",
        }
    }

    /// Resolve a string tag to a capability.
    ///
    /// Returns `None` for unknown tags; callers must treat that as denied.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.tag() == tag)
    }
}

/// A scoped resource subject to ownership checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// A team and everything scoped under it.
    Team(TeamId),
    /// A single player's records.
    Player(PlayerId),
}
