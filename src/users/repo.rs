use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::users::error::UserError;
use crate::users::repo_types::{User, UserRecord};

/// Name of the unique constraint on `users.email` in the schema.
const EMAIL_UNIQUE_CONSTRAINT: &str = "users_email_key";

/// Persistence boundary for users. The backing store handle is injected via
/// the implementation, so call sites and tests decide what backs it.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Point lookup by id; an absent row is `Ok(None)`, not an error.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserError>;

    /// Point lookup by email (case-sensitive); absent is `Ok(None)`.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError>;

    /// Upsert keyed by id: overwrite `email` and `password_hash` if the row
    /// exists, insert otherwise. Clashing with another user's email surfaces
    /// as [`UserError::DuplicateEmail`]; anything else propagates unchanged.
    async fn save(&self, record: &UserRecord) -> Result<(), UserError>;
}

/// Classify a save failure as an email-uniqueness conflict using the driver's
/// structured error: unique-violation kind plus the constraint name when the
/// driver reports one. Message text is never inspected.
fn is_email_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation()
                && db_err
                    .constraint()
                    .map_or(true, |c| c == EMAIL_UNIQUE_CONSTRAINT)
        }
        _ => false,
    }
}

/// Postgres-backed [`IdentityStore`].
#[derive(Clone)]
pub struct PgIdentityStore {
    db: PgPool,
}

impl PgIdentityStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn save(&self, record: &UserRecord) -> Result<(), UserError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET email = EXCLUDED.email,
                password_hash = EXCLUDED.password_hash,
                updated_at = now()
            "#,
        )
        .bind(record.id)
        .bind(&record.email)
        .bind(&record.password_hash)
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_email_unique_violation(&e) => {
                warn!(user_id = %record.id, "email already registered");
                Err(UserError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory [`IdentityStore`] with the same observable semantics as the
/// Postgres one: upsert by id, duplicate-email rejection, store-maintained
/// timestamps. Used by tests and local development without a database.
#[derive(Debug, Default, Clone)]
pub struct MemoryIdentityStore {
    rows: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserError> {
        let rows = self.rows.read().await;
        Ok(rows.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let rows = self.rows.read().await;
        Ok(rows.values().find(|u| u.email == email).cloned())
    }

    async fn save(&self, record: &UserRecord) -> Result<(), UserError> {
        let mut rows = self.rows.write().await;

        // The email may stay with its current owner across an update.
        let taken = rows
            .values()
            .any(|u| u.email == record.email && u.id != record.id);
        if taken {
            warn!(user_id = %record.id, "email already registered");
            return Err(UserError::DuplicateEmail);
        }

        let now = OffsetDateTime::now_utc();
        match rows.get_mut(&record.id) {
            Some(existing) => {
                existing.email = record.email.clone();
                existing.password_hash = record.password_hash.clone();
                existing.updated_at = now;
            }
            None => {
                rows.insert(
                    record.id,
                    User {
                        id: record.id,
                        email: record.email.clone(),
                        password_hash: record.password_hash.clone(),
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }
        Ok(())
    }
}
