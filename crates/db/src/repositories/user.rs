//! User and role repository.

use std::sync::Arc;

use crate::entities::{
    User, UserRole, user,
    user_role::{self, AppRole},
};
use askanai_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    sea_query::OnConflict,
};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by lower-cased email.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by bearer token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a user. A uniqueness violation is reported as `ALREADY_REGISTERED`.
    pub async fn create(&self, model: user::Model) -> AppResult<user::Model> {
        User::insert(user::ActiveModel::from(model.clone()))
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| crate::unique_violation_as(e, "ALREADY_REGISTERED"))?;
        Ok(model)
    }

    /// Whether a user holds a role.
    pub async fn has_role(&self, user_id: &str, role: AppRole) -> AppResult<bool> {
        let count = UserRole::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .filter(user_role::Column::Role.eq(role))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Grant a role. Granting a role the user already holds is a no-op.
    pub async fn grant_role(&self, model: user_role::Model) -> AppResult<()> {
        UserRole::insert(user_role::ActiveModel::from(model))
            .on_conflict(
                OnConflict::columns([user_role::Column::UserId, user_role::Column::Role])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
