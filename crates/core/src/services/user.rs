//! User service: accounts, passwords and session tokens.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use polls_common::{AppError, AppResult, IdGenerator};
use polls_db::{entities::user, repositories::UserRepository};
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// Input for creating a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(length(min = 1, max = 150))]
    pub username: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[serde(default)]
    pub is_admin: bool,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a new user.
    pub async fn create(&self, input: CreateUserInput) -> AppResult<user::Model> {
        input.validate()?;

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let password_hash = hash_password(&input.password)?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            password: Set(password_hash),
            token: Set(None),
            is_admin: Set(input.is_admin),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        self.user_repo.create(model).await
    }

    /// Authenticate a user by session token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Authenticate a user by username and password.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password)? {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Sign a user in, returning the user and a fresh session token.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<(user::Model, String)> {
        let user = self.authenticate(username, password).await?;
        let (user, token) = self.rotate_token(user).await?;
        info!(user_id = %user.id, "User logged in");
        Ok((user, token))
    }

    /// Sign a user out. The token they held stops working.
    pub async fn logout(&self, user_id: &str) -> AppResult<()> {
        let user = self.user_repo.get_by_id(user_id).await?;
        self.rotate_token(user).await?;
        info!(user_id, "User logged out");
        Ok(())
    }

    /// Make sure an admin account named `username` exists.
    ///
    /// An existing account is promoted if needed; its password is left alone.
    pub async fn ensure_admin(&self, username: &str, password: &str) -> AppResult<user::Model> {
        match self.user_repo.find_by_username(username).await? {
            Some(user) if user.is_admin => Ok(user),
            Some(user) => {
                let mut active: user::ActiveModel = user.into();
                active.is_admin = Set(true);
                active.updated_at = Set(Some(Utc::now().into()));
                let user = self.user_repo.update(active).await?;
                info!(username, "Promoted existing user to admin");
                Ok(user)
            }
            None => {
                let user = self
                    .create(CreateUserInput {
                        username: username.to_string(),
                        password: password.to_string(),
                        is_admin: true,
                    })
                    .await?;
                info!(username, "Created admin user");
                Ok(user)
            }
        }
    }

    async fn rotate_token(&self, user: user::Model) -> AppResult<(user::Model, String)> {
        let new_token = self.id_gen.generate_token();

        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(new_token.clone()));
        active.updated_at = Set(Some(Utc::now().into()));

        let user = self.user_repo.update(active).await?;
        Ok((user, new_token))
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(id: &str, username: &str, password: &str, is_admin: bool) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            password: hash_password(password).unwrap(),
            token: Some("test_token".to_string()),
            is_admin,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: MockDatabase) -> UserService {
        UserService::new(UserRepository::new(Arc::new(db.into_connection())))
    }

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password_123").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(hash.len() > 50);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("test_password_123").unwrap();

        assert!(verify_password("test_password_123", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("test", "invalid_hash").is_err());
    }

    #[test]
    fn test_hash_password_different_each_time() {
        let hash1 = hash_password("same_password").unwrap();
        let hash2 = hash_password("same_password").unwrap();

        assert_ne!(hash1, hash2);
    }

    #[tokio::test]
    async fn test_authenticate_correct_password() {
        let user = create_test_user("user1", "alice", "correct horse", false);
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]));

        let found = svc.authenticate("Alice", "correct horse").await.unwrap();
        assert_eq!(found.id, "user1");
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password() {
        let user = create_test_user("user1", "alice", "correct horse", false);
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]));

        assert!(matches!(
            svc.authenticate("alice", "battery staple").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_user() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        assert!(matches!(
            svc.authenticate("nobody", "whatever1").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_by_token_not_found() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        assert!(matches!(
            svc.authenticate_by_token("stale").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_login_issues_new_token() {
        let user = create_test_user("user1", "alice", "correct horse", false);
        let mut updated = user.clone();
        updated.token = Some("rotated".to_string());

        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .append_query_results([[updated]]),
        );

        let (user, token) = svc.login("alice", "correct horse").await.unwrap();
        assert_eq!(user.id, "user1");
        assert_eq!(token.len(), 32);
        assert_ne!(token, "test_token");
    }

    #[tokio::test]
    async fn test_create_rejects_taken_username() {
        let existing = create_test_user("user1", "alice", "correct horse", false);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]),
        );

        let result = svc
            .create(CreateUserInput {
                username: "ALICE".to_string(),
                password: "another password".to_string(),
                is_admin: false,
            })
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_short_password() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc
            .create(CreateUserInput {
                username: "bob".to_string(),
                password: "short".to_string(),
                is_admin: false,
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_ensure_admin_keeps_existing_admin() {
        let admin = create_test_user("admin1", "admin", "admin password", true);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[admin]]),
        );

        let user = svc.ensure_admin("admin", "ignored password").await.unwrap();
        assert!(user.is_admin);
    }

    #[tokio::test]
    async fn test_ensure_admin_creates_missing_admin() {
        let created = create_test_user("admin1", "admin", "admin password", true);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([[created]]),
        );

        let user = svc.ensure_admin("admin", "admin password").await.unwrap();
        assert!(user.is_admin);
        assert_eq!(user.username, "admin");
    }
}
