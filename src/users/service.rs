use tracing::{error, info};
use uuid::Uuid;

use crate::users::error::UserError;
use crate::users::password::hash_password;
use crate::users::repo::IdentityStore;
use crate::users::repo_types::{User, UserRecord};

/// Creates user accounts: id generation, password hashing, persistence and a
/// confirmation read-back. Constructed with its store so call sites choose
/// the backing implementation.
#[derive(Clone)]
pub struct UserService<S: IdentityStore> {
    store: S,
}

impl<S: IdentityStore> UserService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Register a new user. A `DuplicateEmail` failure means no row was
    /// committed for this id; no retry and no id reuse happens here.
    pub async fn create_user(&self, email: &str, password: &str) -> Result<User, UserError> {
        let id = Uuid::new_v4();
        let password_hash = hash_password(password)?;
        let record = UserRecord {
            id,
            email: email.to_owned(),
            password_hash,
        };
        self.store.save(&record).await?;

        // Read back the canonical row; the store fills in timestamps and any
        // other defaults. An unreadable row after an accepted write is an
        // anomalous store state and must surface.
        let user = self.store.find_by_id(id).await?.ok_or_else(|| {
            error!(user_id = %id, "saved user could not be read back");
            UserError::CreationVerificationFailed(id)
        })?;

        info!(user_id = %user.id, email = %user.email, "user created");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::password::verify_password;
    use crate::users::repo::MemoryIdentityStore;
    use async_trait::async_trait;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("idvault=debug")
            .try_init();
    }

    #[tokio::test]
    async fn create_user_returns_canonical_row_without_plaintext() {
        init_tracing();
        let service = UserService::new(MemoryIdentityStore::new());

        let user = service
            .create_user("a@x.com", "Secret123")
            .await
            .expect("creation should succeed");

        assert_eq!(user.email, "a@x.com");
        assert!(!user.password_hash.is_empty());
        assert_ne!(user.password_hash, "Secret123");
        assert!(!user.password_hash.contains("Secret123"));
        assert!(verify_password("Secret123", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn second_registration_with_same_email_is_rejected() {
        init_tracing();
        let store = MemoryIdentityStore::new();
        let service = UserService::new(store.clone());

        let first = service
            .create_user("a@x.com", "Secret123")
            .await
            .expect("first creation should succeed");

        let err = service
            .create_user("a@x.com", "Different456")
            .await
            .unwrap_err();
        assert!(err.is_duplicate_email());

        // The first row is untouched by the losing attempt.
        let winner = store
            .find_by_email("a@x.com")
            .await
            .unwrap()
            .expect("first user still present");
        assert_eq!(winner.id, first.id);
        assert_eq!(winner.password_hash, first.password_hash);
    }

    #[tokio::test]
    async fn distinct_emails_get_distinct_ids() {
        let service = UserService::new(MemoryIdentityStore::new());
        let a = service.create_user("a@x.com", "pw-aaaaaa").await.unwrap();
        let b = service.create_user("b@x.com", "pw-bbbbbb").await.unwrap();
        assert_ne!(a.id, b.id);
    }

    /// Accepts writes but never returns them, to exercise the read-back check.
    #[derive(Default, Clone)]
    struct ForgetfulStore;

    #[async_trait]
    impl IdentityStore for ForgetfulStore {
        async fn find_by_id(&self, _id: Uuid) -> Result<Option<User>, UserError> {
            Ok(None)
        }

        async fn find_by_email(&self, _email: &str) -> Result<Option<User>, UserError> {
            Ok(None)
        }

        async fn save(&self, _record: &UserRecord) -> Result<(), UserError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn unreadable_row_after_write_fails_verification() {
        let service = UserService::new(ForgetfulStore);
        let err = service.create_user("a@x.com", "Secret123").await.unwrap_err();
        assert!(matches!(err, UserError::CreationVerificationFailed(_)));
    }

    #[tokio::test]
    async fn end_to_end_registration_scenario() {
        init_tracing();
        let store = MemoryIdentityStore::new();
        let service = UserService::new(store.clone());

        let user = service.create_user("a@x.com", "Secret123").await.unwrap();
        assert_eq!(user.email, "a@x.com");
        assert!(!user.password_hash.is_empty());
        assert_ne!(user.password_hash, "Secret123");

        let err = service.create_user("a@x.com", "Other9999").await.unwrap_err();
        assert!(err.is_duplicate_email());

        let found = store
            .find_by_email("a@x.com")
            .await
            .unwrap()
            .expect("registered user");
        assert_eq!(found.id, user.id);
        assert_eq!(found.email, user.email);
        assert_eq!(found.password_hash, user.password_hash);
    }
}
