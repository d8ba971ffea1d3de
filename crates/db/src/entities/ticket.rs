//! Ticket entity for user reports about polls and comments.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ticket status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[sea_orm(string_value = "open")]
    #[default]
    Open,
    #[sea_orm(string_value = "resolved")]
    Resolved,
}

impl TicketStatus {
    /// Parse a wire value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

/// Ticket model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Poll the report concerns.
    #[sea_orm(nullable)]
    pub poll_id: Option<String>,
    /// Comment the report concerns, if any.
    #[sea_orm(nullable)]
    pub comment_id: Option<String>,
    /// Free-form report category chosen by the reporter.
    #[sea_orm(column_name = "type")]
    pub ticket_type: String,
    #[sea_orm(nullable)]
    pub message: Option<String>,
    pub status: TicketStatus,
    /// Note left by the moderator who resolved the ticket.
    #[sea_orm(nullable)]
    pub admin_note: Option<String>,
    #[sea_orm(nullable)]
    pub resolved_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(nullable)]
    pub ip_hash: Option<String>,
    #[sea_orm(nullable)]
    pub user_agent_hash: Option<String>,
    /// SHA-256 hex of the normalized `type|message|commentId` triple.
    #[sea_orm(nullable)]
    pub text_hash: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
