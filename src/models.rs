//! Record types exchanged with the store and over the wire.
//!
//! Read types (`Member`, `HealthMetric`, ...) serialize with camelCase keys
//! and RFC 3339 timestamps. Input types (`NewMember`, `MemberUpdate`, ...)
//! reject unknown fields and are checked with `validate` before any store
//! call.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{ChronicleError, Result};

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, default = $default:ident, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// Stored values are written through `as_str`, anything else
            /// falls back to the default variant.
            pub fn from_db(value: &str) -> Self {
                Self::parse(value).unwrap_or_default()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(
    /// Externally assigned activity tier.
    EngagementLevel, default = Medium, {
        VeryLow => "very_low",
        Low => "low",
        Medium => "medium",
        High => "high",
        VeryHigh => "very_high",
    }
);

string_enum!(TeamRole, default = Concierge, {
    Doctor => "doctor",
    Concierge => "concierge",
    Trainer => "trainer",
});

string_enum!(Priority, default = Medium, {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

string_enum!(EpisodeStatus, default = Open, {
    Open => "open",
    InProgress => "in_progress",
    Resolved => "resolved",
});

string_enum!(ConversationStatus, default = Active, {
    Active => "active",
    Archived => "archived",
    UrgentAttentionNeeded => "urgent_attention_needed",
});

string_enum!(SenderRole, default = CareCoordinator, {
    Member => "member",
    Doctor => "doctor",
    Concierge => "concierge",
    Trainer => "trainer",
    CareCoordinator => "care_coordinator",
});

impl EpisodeStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, EpisodeStatus::Open | EpisodeStatus::InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub date_of_birth: Option<OffsetDateTime>,
    pub profile_image: Option<String>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub insurance_info: Option<String>,
    pub health_goals: Vec<String>,
    pub current_conditions: Vec<String>,
    pub medications: Vec<String>,
    pub allergies: Vec<String>,
    pub communication_preference: String,
    pub time_zone: String,
    pub preferred_contact_time: String,
    #[serde(with = "time::serde::rfc3339")]
    pub join_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_active: OffsetDateTime,
    pub engagement_level: EngagementLevel,
    pub plan_adherence: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The slice of a member embedded in metric, episode and conversation lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

impl From<&Member> for MemberSummary {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id.clone(),
            name: member.name.clone(),
            email: member.email.clone(),
            profile_image: member.profile_image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub role: TeamRole,
    pub title: String,
    pub avatar: Option<String>,
    pub communication_style: String,
    pub expertise: Vec<String>,
    pub is_online: bool,
    /// Typical response time in minutes.
    pub response_time: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetric {
    pub id: String,
    pub member_id: String,
    #[serde(rename = "type")]
    pub metric_type: String,
    /// Kept verbatim: blood pressure arrives as "systolic/diastolic".
    pub value: String,
    pub unit: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub source: String,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetricWithMember {
    #[serde(flatten)]
    pub metric: HealthMetric,
    pub member: MemberSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub member_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Priority,
    pub status: EpisodeStatus,
    pub initiated_by: String,
    pub assigned_to: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    pub interventions: Vec<String>,
    pub outcomes: Vec<String>,
    pub friction_points: Vec<String>,
    pub tags: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeWithMember {
    #[serde(flatten)]
    pub episode: Episode,
    pub member: MemberSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub member_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: String,
    pub status: ConversationStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_role: SenderRole,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub message_type: String,
    pub is_read: bool,
    pub sentiment: Option<String>,
    pub topics: Vec<String>,
    pub action_items: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Message {
    /// Unread and sent by someone other than the member.
    pub fn is_unread_from_team(&self) -> bool {
        !self.is_read && self.sender_role != SenderRole::Member
    }
}

/// A conversation with a message slice; `member` is present on list views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationThread {
    #[serde(flatten)]
    pub conversation: Conversation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<MemberSummary>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub member: Member,
    pub messages: Vec<Message>,
}

/// Accepts RFC 3339, a bare `YYYY-MM-DDTHH:MM:SS` (read as UTC) or a plain
/// date (midnight UTC).
pub fn parse_instant(raw: &str) -> Result<OffsetDateTime> {
    use time::format_description::well_known::Rfc3339;
    use time::macros::format_description;
    use time::{Date, PrimitiveDateTime};

    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(ts);
    }
    if let Ok(ts) = PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Ok(ts.assume_utc());
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map(|date| date.midnight().assume_utc())
        .map_err(|_| ChronicleError::Validation(format!("invalid timestamp '{raw}'")))
}

mod flexible_time {
    use serde::{Deserialize, Deserializer};
    use time::OffsetDateTime;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
            None => Ok(None),
            Some(value) => super::parse_instant(value)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }

    pub fn deserialize_nullable<'de, D>(
        deserializer: D,
    ) -> Result<Option<Option<OffsetDateTime>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize(deserializer).map(Some)
    }
}

/// For update fields backed by nullable columns: a missing key leaves the
/// column alone, an explicit `null` clears it.
mod nullable {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewMember {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "flexible_time::deserialize")]
    pub date_of_birth: Option<OffsetDateTime>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub insurance_info: Option<String>,
    #[serde(default)]
    pub health_goals: Vec<String>,
    #[serde(default)]
    pub current_conditions: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub communication_preference: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub preferred_contact_time: Option<String>,
    #[serde(default, deserialize_with = "flexible_time::deserialize")]
    pub join_date: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "flexible_time::deserialize")]
    pub last_active: Option<OffsetDateTime>,
    #[serde(default)]
    pub engagement_level: Option<EngagementLevel>,
    #[serde(default)]
    pub plan_adherence: Option<i32>,
}

impl NewMember {
    pub fn validate(&self) -> Result<()> {
        validate_optional_id(self.id.as_deref())?;
        require("name", &self.name)?;
        validate_email(&self.email)?;
        if let Some(score) = self.plan_adherence {
            validate_adherence(score)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MemberUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "flexible_time::deserialize_nullable")]
    pub date_of_birth: Option<Option<OffsetDateTime>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub profile_image: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub gender: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub emergency_contact: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub insurance_info: Option<Option<String>>,
    #[serde(default)]
    pub health_goals: Option<Vec<String>>,
    #[serde(default)]
    pub current_conditions: Option<Vec<String>>,
    #[serde(default)]
    pub medications: Option<Vec<String>>,
    #[serde(default)]
    pub allergies: Option<Vec<String>>,
    #[serde(default)]
    pub communication_preference: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub preferred_contact_time: Option<String>,
    #[serde(default, deserialize_with = "flexible_time::deserialize")]
    pub join_date: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "flexible_time::deserialize")]
    pub last_active: Option<OffsetDateTime>,
    #[serde(default)]
    pub engagement_level: Option<EngagementLevel>,
    #[serde(default)]
    pub plan_adherence: Option<i32>,
}

impl MemberUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            require("name", name)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(score) = self.plan_adherence {
            validate_adherence(score)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewTeamMember {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub role: TeamRole,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub communication_style: String,
    #[serde(default)]
    pub expertise: Vec<String>,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub response_time: i32,
}

impl NewTeamMember {
    pub fn validate(&self) -> Result<()> {
        validate_optional_id(self.id.as_deref())?;
        require("name", &self.name)?;
        if self.response_time < 0 {
            return Err(ChronicleError::Validation(
                "responseTime must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewHealthMetric {
    #[serde(default)]
    pub id: Option<String>,
    pub member_id: String,
    #[serde(rename = "type")]
    pub metric_type: String,
    pub value: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default, deserialize_with = "flexible_time::deserialize")]
    pub timestamp: Option<OffsetDateTime>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewHealthMetric {
    pub fn validate(&self) -> Result<()> {
        validate_optional_id(self.id.as_deref())?;
        require("memberId", &self.member_id)?;
        require("type", &self.metric_type)?;
        require("value", &self.value)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewEpisode {
    #[serde(default)]
    pub id: Option<String>,
    pub member_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: Option<EpisodeStatus>,
    #[serde(default)]
    pub initiated_by: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default, deserialize_with = "flexible_time::deserialize")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "flexible_time::deserialize")]
    pub end_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub interventions: Vec<String>,
    #[serde(default)]
    pub outcomes: Vec<String>,
    #[serde(default)]
    pub friction_points: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewEpisode {
    pub fn validate(&self) -> Result<()> {
        validate_optional_id(self.id.as_deref())?;
        require("memberId", &self.member_id)?;
        require("title", &self.title)?;
        Ok(())
    }
}

/// Partial episode update. Status moves are unconstrained: any value may be
/// written at any time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EpisodeUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: Option<EpisodeStatus>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub assigned_to: Option<Option<String>>,
    #[serde(default, deserialize_with = "flexible_time::deserialize")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "flexible_time::deserialize_nullable")]
    pub end_date: Option<Option<OffsetDateTime>>,
    #[serde(default)]
    pub interventions: Option<Vec<String>>,
    #[serde(default)]
    pub outcomes: Option<Vec<String>>,
    #[serde(default)]
    pub friction_points: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl EpisodeUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            require("title", title)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewConversation {
    #[serde(default)]
    pub id: Option<String>,
    pub member_id: String,
    #[serde(default, alias = "subject")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<ConversationStatus>,
}

impl NewConversation {
    pub fn validate(&self) -> Result<()> {
        validate_optional_id(self.id.as_deref())?;
        require("memberId", &self.member_id)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConversationUpdate {
    #[serde(default, alias = "subject", deserialize_with = "nullable::deserialize")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<ConversationStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub sender_name: String,
    /// Taken as given; `care_coordinator` when omitted.
    #[serde(default)]
    pub sender_role: Option<SenderRole>,
    pub content: String,
    #[serde(default, deserialize_with = "flexible_time::deserialize")]
    pub timestamp: Option<OffsetDateTime>,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
}

impl NewMessage {
    pub fn validate(&self) -> Result<()> {
        validate_optional_id(self.id.as_deref())?;
        require("content", &self.content)
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ChronicleError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn validate_optional_id(id: Option<&str>) -> Result<()> {
    match id {
        Some(id) if id.trim().is_empty() => Err(ChronicleError::Validation(
            "id must not be blank when provided".to_string(),
        )),
        _ => Ok(()),
    }
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\S+@\S+\.\S+").expect("email pattern compiles")
});

/// Same shape check the dashboard form applies: `something@domain.tld`.
pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    require("email", email)?;
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ChronicleError::Validation(format!(
            "invalid email format '{email}'"
        )))
    }
}

pub fn validate_adherence(score: i32) -> Result<()> {
    if (0..=100).contains(&score) {
        Ok(())
    } else {
        Err(ChronicleError::Validation(format!(
            "planAdherence must be between 0 and 100, got {score}"
        )))
    }
}
