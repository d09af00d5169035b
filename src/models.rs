use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Server-assigned identifiers are opaque strings (UUIDs or slugs)
pub type Id = String;

// ---------------- Users ----------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Editor,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Editor => "editor",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Body returned by `/auth/login` and `/auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserRole {
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfile {
    pub name: String,
}

// ---------------- Sources --------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Telegram,
    Website,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Telegram => "telegram",
            SourceType::Website => "website",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Active,
    Paused,
}

impl SourceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceStatus::Active => "active",
            SourceStatus::Paused => "paused",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SourceStatus::Active => SourceStatus::Paused,
            SourceStatus::Paused => SourceStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: Id,
    pub title: String,
    pub handle: String,
    #[serde(rename = "type")]
    pub kind: SourceType,
    pub status: SourceStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Id>,
    #[serde(default)]
    pub filter_prompt: String,
    #[serde(default)]
    pub format_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSource {
    pub title: String,
    pub handle: String,
    #[serde(rename = "type")]
    pub kind: SourceType,
    pub status: SourceStatus,
    pub filter_prompt: String,
    pub format_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSourceStatus {
    pub status: SourceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourcePrompts {
    pub filter_prompt: String,
    pub format_prompt: String,
}

// ---------------- Posts ----------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    New,
    Editing,
    Approved,
    Rejected,
    Scheduled, // reserved: no pathway sets it
    Published,
}

impl PostStatus {
    pub const ALL: [PostStatus; 6] = [
        PostStatus::New,
        PostStatus::Editing,
        PostStatus::Approved,
        PostStatus::Rejected,
        PostStatus::Scheduled,
        PostStatus::Published,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::New => "new",
            PostStatus::Editing => "editing",
            PostStatus::Approved => "approved",
            PostStatus::Rejected => "rejected",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Published => "published",
        }
    }

    // Position along new → editing → approved → scheduled → published.
    fn rank(self) -> Option<u8> {
        match self {
            PostStatus::New => Some(0),
            PostStatus::Editing => Some(1),
            PostStatus::Approved => Some(2),
            PostStatus::Scheduled => Some(3),
            PostStatus::Published => Some(4),
            PostStatus::Rejected => None,
        }
    }

    /// Whether moving to `next` is a forward step of the moderation workflow.
    ///
    /// Advisory only: stores and backends accept any transition, this just
    /// decides which actions an editor is offered.
    pub fn can_transition_to(self, next: PostStatus) -> bool {
        if matches!(self, PostStatus::Published | PostStatus::Rejected) {
            return false;
        }
        if next == PostStatus::Rejected {
            return true;
        }
        // scheduled is never offered
        if next == PostStatus::Scheduled {
            return false;
        }
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }

    pub fn forward_targets(self) -> Vec<PostStatus> {
        PostStatus::ALL
            .into_iter()
            .filter(|next| self.can_transition_to(*next))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Created,
    Edited,
    Approved,
    Rejected,
    Published,
    Commented,
}

impl HistoryAction {
    /// History action recorded when a post enters `status`.
    ///
    /// Sending a post back to `editing` or `new` is logged as an edit or a
    /// comment, not as an approval.
    pub fn for_status(status: PostStatus) -> Self {
        match status {
            PostStatus::Rejected => HistoryAction::Rejected,
            PostStatus::Published => HistoryAction::Published,
            PostStatus::Editing => HistoryAction::Edited,
            PostStatus::New => HistoryAction::Commented,
            PostStatus::Approved | PostStatus::Scheduled => HistoryAction::Approved,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HistoryAction::Created => "created",
            HistoryAction::Edited => "edited",
            HistoryAction::Approved => "approved",
            HistoryAction::Rejected => "rejected",
            HistoryAction::Published => "published",
            HistoryAction::Commented => "commented",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostHistoryEvent {
    pub id: Id,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub action: HistoryAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id,
    pub source_id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub original_content: String,
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub history: Vec<PostHistoryEvent>, // append-only audit trail
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,
}

impl Post {
    /// Timestamp the review queue orders and groups by.
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.updated_at.max(self.created_at)
    }
}

/// Full-field overwrite sent to `PUT /posts/:id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdatePost {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

/// Body of `POST /posts/:id/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Query accepted by `GET /posts`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub source_id: Option<Id>,
    pub query: Option<String>,
}

impl PostFilter {
    pub fn to_params(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("status", self.status.map(|s| s.as_str().to_string())),
            ("sourceId", self.source_id.clone()),
            ("q", self.query.clone()),
        ]
    }
}

// ---------------- Local store state ----------------------------------

/// Either every value or one concrete value, the `'all'` of a filter select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    Only(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::All
    }
}

impl<T: PartialEq> Selection<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => wanted == value,
        }
    }
}

impl<T> Selection<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Selection::All => None,
            Selection::Only(v) => Some(v),
        }
    }
}

impl<T: FromStr> FromStr for Selection<T> {
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Selection::All)
        } else {
            s.parse().map(Selection::Only)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub query: String,
    pub source_type: Selection<SourceType>,
    pub source_status: Selection<SourceStatus>,
    pub post_status: Selection<PostStatus>,
}

/// Fields of [`FilterState`] to overwrite; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct FilterUpdate {
    pub query: Option<String>,
    pub source_type: Option<Selection<SourceType>>,
    pub source_status: Option<Selection<SourceStatus>>,
    pub post_status: Option<Selection<PostStatus>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ru,
    En,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSettings {
    pub auto_publish_enabled: bool,
    pub default_language: Language,
    pub parser_enabled: bool,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self { auto_publish_enabled: false, default_language: Language::Ru, parser_enabled: true }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub auto_publish_enabled: Option<bool>,
    pub default_language: Option<Language>,
    pub parser_enabled: Option<bool>,
}

// ---------------- String conversions ---------------------------------

/// Error for an unrecognised enum literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! str_enum {
    ($ty:ident, $kind:literal, [$($variant:ident),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.pad(self.as_str()) }
        }

        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase();
                $(
                    if $ty::$variant.as_str() == wanted { return Ok($ty::$variant); }
                )+
                Err(ParseEnumError { kind: $kind, value: s.to_string() })
            }
        }
    };
}

str_enum!(Role, "role", [Owner, Admin, Editor]);
str_enum!(SourceType, "source type", [Telegram, Website]);
str_enum!(SourceStatus, "source status", [Active, Paused]);
str_enum!(PostStatus, "post status", [New, Editing, Approved, Rejected, Scheduled, Published]);
str_enum!(HistoryAction, "history action", [Created, Edited, Approved, Rejected, Published, Commented]);
