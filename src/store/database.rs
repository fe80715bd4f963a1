//! SeaORM-backed attempt store.
//!
//! Persists one row per session in `two_factor_sign_in_attempts`:
//! `session_id` (primary key), `delivered_code` (nullable), `username`,
//! `created_at` (epoch milliseconds). Insert is an upsert on the session id,
//! preserving the one-attempt-per-session invariant at the database level.

use crate::attempt::SignInAttempt;
use crate::error::{DeadboltError, Result};
use crate::store::AttemptStore;
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, DatabaseConnection, EntityTrait};

pub mod entity {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "two_factor_sign_in_attempts")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub session_id: String,
        pub delivered_code: Option<String>,
        pub username: String,
        pub created_at: i64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Attempt store backed by a SeaORM database connection.
#[derive(Clone)]
pub struct DatabaseAttemptStore {
    conn: DatabaseConnection,
}

impl DatabaseAttemptStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl AttemptStore for DatabaseAttemptStore {
    async fn insert(&self, attempt: SignInAttempt) -> Result<()> {
        let model = entity::ActiveModel {
            session_id: Set(attempt.session_id().to_string()),
            delivered_code: Set(attempt.delivered_code().map(str::to_string)),
            username: Set(attempt.username().to_string()),
            created_at: Set(attempt.created_at() as i64),
        };

        entity::Entity::insert(model)
            .on_conflict(
                OnConflict::column(entity::Column::SessionId)
                    .update_columns([
                        entity::Column::DeliveredCode,
                        entity::Column::Username,
                        entity::Column::CreatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .map_err(|e| DeadboltError::store_unavailable(format!("insert failed: {}", e)))?;

        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<SignInAttempt>> {
        if session_id.is_empty() {
            return Ok(None);
        }

        let row = entity::Entity::find_by_id(session_id.to_string())
            .one(&self.conn)
            .await
            .map_err(|e| DeadboltError::store_unavailable(format!("query failed: {}", e)))?;

        Ok(row.map(|model| {
            SignInAttempt::new(
                model.session_id,
                model.username,
                model.delivered_code,
                model.created_at as u64,
            )
        }))
    }

    async fn remove(&self, session_id: &str) -> Result<()> {
        entity::Entity::delete_by_id(session_id.to_string())
            .exec(&self.conn)
            .await
            .map_err(|e| DeadboltError::store_unavailable(format!("delete failed: {}", e)))?;

        Ok(())
    }
}
