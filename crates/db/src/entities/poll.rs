//! Poll entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a poll.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "poll_status")]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "open")]
    #[default]
    Open,
    #[sea_orm(string_value = "closed")]
    Closed,
}

impl PollStatus {
    /// Parse a wire value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Who may see a poll's results.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "visibility_mode")]
#[serde(rename_all = "snake_case")]
pub enum VisibilityMode {
    /// Listed and visible to everyone.
    #[sea_orm(string_value = "public")]
    #[default]
    Public,
    /// Visible to anyone holding the link.
    #[sea_orm(string_value = "unlisted")]
    Unlisted,
    /// Results visible only after responding (give-to-get).
    #[sea_orm(string_value = "voters")]
    Voters,
    /// Results visible only to the owner and admins.
    #[sea_orm(string_value = "private")]
    Private,
}

impl VisibilityMode {
    /// Parse a wire value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "unlisted" => Some(Self::Unlisted),
            "voters" => Some(Self::Voters),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "polls")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Short public token used in share links.
    #[sea_orm(unique)]
    pub slug: String,

    pub title: String,

    #[sea_orm(nullable)]
    pub description: Option<String>,

    pub status: PollStatus,

    pub visibility_mode: VisibilityMode,

    pub allow_comments: bool,

    /// SHA-256 hex of the creator key handed to anonymous creators.
    #[sea_orm(nullable)]
    pub creator_key_hash: Option<String>,

    #[sea_orm(nullable)]
    pub created_by_user_id: Option<String>,

    #[sea_orm(nullable)]
    pub preview_image_url: Option<String>,

    /// Responses are refused after this instant.
    #[sea_orm(nullable)]
    pub open_until: Option<DateTimeWithTimeZone>,

    /// Responses are refused once this many have been collected.
    #[sea_orm(nullable)]
    pub close_after_responses: Option<i32>,

    #[sea_orm(nullable)]
    pub archived_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub archived_by_user_id: Option<String>,

    #[sea_orm(nullable)]
    pub archive_reason: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether the poll has been soft-deleted.
    #[must_use]
    pub const fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::question::Entity")]
    Question,
    #[sea_orm(has_many = "super::response::Entity")]
    Response,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
}

impl Related<super::question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Question.def()
    }
}

impl Related<super::response::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Response.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
