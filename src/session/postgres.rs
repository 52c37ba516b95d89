use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{Session, SessionStore};
use crate::database::StoreError;

/// Sessions kept in the `sessions` table
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, id: &str) -> Result<Option<Session>, StoreError> {
        let row = sqlx::query(
            r#"SELECT "id", "user_id", "expires_at" FROM "sessions" WHERE "id" = $1 AND "expires_at" > now()"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Session {
            id: row.try_get::<String, _>("id")?,
            user_id: row.try_get::<Uuid, _>("user_id")?,
            expires_at: row.try_get::<DateTime<Utc>, _>("expires_at")?,
        }))
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO "sessions" ("id", "user_id", "expires_at") VALUES ($1, $2, $3)
               ON CONFLICT ("id") DO UPDATE SET "user_id" = EXCLUDED."user_id", "expires_at" = EXCLUDED."expires_at""#,
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query(r#"DELETE FROM "sessions" WHERE "id" = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
