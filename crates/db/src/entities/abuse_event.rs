//! Abuse event entity: one row per rate-limited or audited action.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "abuse_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub event_type: String,
    /// Set when the action was attributed to a signed-in user.
    #[sea_orm(nullable)]
    pub user_id: Option<String>,
    /// Set when the action was attributed to an anonymous client.
    #[sea_orm(nullable)]
    pub ip_hash: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
