//! Question entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Kind of answer a question accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "question_type")]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[sea_orm(string_value = "single_choice")]
    SingleChoice,
    #[sea_orm(string_value = "multiple_choice")]
    MultipleChoice,
    #[sea_orm(string_value = "rating")]
    Rating,
    #[sea_orm(string_value = "nps")]
    Nps,
    #[sea_orm(string_value = "ranking")]
    Ranking,
    #[sea_orm(string_value = "short_text")]
    ShortText,
    #[sea_orm(string_value = "emoji")]
    Emoji,
}

impl QuestionType {
    /// Parse a wire value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "single_choice" => Some(Self::SingleChoice),
            "multiple_choice" => Some(Self::MultipleChoice),
            "rating" => Some(Self::Rating),
            "nps" => Some(Self::Nps),
            "ranking" => Some(Self::Ranking),
            "short_text" => Some(Self::ShortText),
            "emoji" => Some(Self::Emoji),
            _ => None,
        }
    }

    /// Whether the question stores option rows.
    #[must_use]
    pub const fn has_options(self) -> bool {
        matches!(self, Self::SingleChoice | Self::MultipleChoice | Self::Ranking)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "questions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub poll_id: String,

    /// Zero-based display order within the poll.
    pub position: i32,

    #[sea_orm(column_name = "type")]
    pub question_type: QuestionType,

    pub prompt: String,

    pub is_required: bool,

    /// Type-specific settings such as `{"scale": 10}` or `{"emojis": [..]}`.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub settings_json: Option<JsonValue>,

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
    #[sea_orm(has_many = "super::poll_option::Entity")]
    PollOption,
}

impl Related<super::poll::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Poll.def()
    }
}

impl Related<super::poll_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PollOption.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
