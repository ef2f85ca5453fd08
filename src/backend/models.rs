//! Typed rows for the hosted tables.
//!
//! Rows arrive as loose JSON; [`parse_rows`] validates them into these
//! structs at the boundary and drops anything that does not fit.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::{Row, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Superadmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }
}

/// Admin profile row (`profiles`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Upcoming,
    Live,
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "Upcoming",
            EventStatus::Live => "Live",
            EventStatus::Completed => "Completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Upcoming" => Some(EventStatus::Upcoming),
            "Live" => Some(EventStatus::Live),
            "Completed" => Some(EventStatus::Completed),
            _ => None,
        }
    }
}

/// Event row (`events`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(deserialize_with = "flexible_datetime")]
    pub event_date: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub location: String,
    #[serde(default)]
    pub meeting_link: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    pub status: EventStatus,
    #[serde(default)]
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClubType {
    Club,
    #[serde(rename = "UHC")]
    Uhc,
    #[serde(rename = "LHC")]
    Lhc,
    WebOps,
    Committee,
}

impl ClubType {
    /// Public display order.
    pub const ALL: [ClubType; 5] = [
        ClubType::Club,
        ClubType::Uhc,
        ClubType::Lhc,
        ClubType::WebOps,
        ClubType::Committee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClubType::Club => "Club",
            ClubType::Uhc => "UHC",
            ClubType::Lhc => "LHC",
            ClubType::WebOps => "WebOps",
            ClubType::Committee => "Committee",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ClubType::Club => "Clubs",
            ClubType::Uhc => "UHC (Upper House Council)",
            ClubType::Lhc => "LHC (Lower House Council)",
            ClubType::WebOps => "WebOps",
            ClubType::Committee => "Committees",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Club or other house entity row (`clubs`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Club {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ClubType,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub secretary_name: Option<String>,
    #[serde(default)]
    pub secretary_contact: Option<String>,
}

/// Team member category. Both taxonomies seen in the backend are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeamCategory {
    Core,
    Lead,
    #[serde(rename = "UHC")]
    Uhc,
    #[serde(rename = "LHC")]
    Lhc,
    WebOps,
    Member,
    Alumni,
}

impl TeamCategory {
    /// Public display order.
    pub const ALL: [TeamCategory; 7] = [
        TeamCategory::Core,
        TeamCategory::Lead,
        TeamCategory::Uhc,
        TeamCategory::Lhc,
        TeamCategory::WebOps,
        TeamCategory::Member,
        TeamCategory::Alumni,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TeamCategory::Core => "Core",
            TeamCategory::Lead => "Lead",
            TeamCategory::Uhc => "UHC",
            TeamCategory::Lhc => "LHC",
            TeamCategory::WebOps => "WebOps",
            TeamCategory::Member => "Member",
            TeamCategory::Alumni => "Alumni",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TeamCategory::Core => "Core Team",
            TeamCategory::Lead => "Leads",
            TeamCategory::Uhc => "Upper House Council",
            TeamCategory::Lhc => "Lower House Council",
            TeamCategory::WebOps => "Web Ops Team",
            TeamCategory::Member => "Members",
            TeamCategory::Alumni => "Alumni",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

/// Team member row (`team_members`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: Uuid,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub position: String,
    pub category: TeamCategory,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub order_index: i32,
}

// ============================================================================
// Boundary parsing
// ============================================================================

/// Validate raw rows into `T`, logging and skipping rows that do not match.
pub fn parse_rows<T: DeserializeOwned>(table: Table, rows: Vec<Row>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(row) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "skipping malformed row");
                None
            }
        })
        .collect()
}

/// Accepts RFC 3339 plus the offset-less forms produced by `datetime-local`
/// inputs and `timestamp` columns. Offset-less values are taken as UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn flexible_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datetime(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date-time: {raw}")))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
