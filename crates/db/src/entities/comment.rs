//! Comment entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Moderation status of a comment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "comment_status")]
#[serde(rename_all = "snake_case")]
pub enum CommentStatus {
    #[sea_orm(string_value = "visible")]
    #[default]
    Visible,
    #[sea_orm(string_value = "hidden")]
    Hidden,
    #[sea_orm(string_value = "flagged")]
    Flagged,
}

impl CommentStatus {
    /// Parse a wire value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "visible" => Some(Self::Visible),
            "hidden" => Some(Self::Hidden),
            "flagged" => Some(Self::Flagged),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub poll_id: String,

    pub body: String,

    #[sea_orm(nullable)]
    pub display_name: Option<String>,

    pub status: CommentStatus,

    #[sea_orm(nullable)]
    pub user_id: Option<String>,

    #[sea_orm(nullable)]
    pub ip_hash: Option<String>,

    #[sea_orm(nullable)]
    pub user_agent_hash: Option<String>,

    /// SHA-256 hex of the normalized body, used for duplicate detection.
    pub text_hash: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::poll::Entity",
        from = "Column::PollId",
        to = "super::poll::Column::Id",
        on_delete = "Cascade"
    )]
    Poll,
}

impl Related<super::poll::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Poll.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
