//! User service.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use communitywatch_common::{AppError, AppResult, IdGenerator, error::field_errors};
use communitywatch_db::{
    entities::{issue, user},
    repositories::{IssueRepository, UserRepository},
};
use sea_orm::{Set, prelude::DateTimeWithTimeZone};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    issue_repo: IssueRepository,
    id_gen: IdGenerator,
}

/// Input for creating a new account.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 3, max = 64, message = "Username must be 3 to 64 characters."))]
    pub username: String,

    #[validate(
        email(message = "Invalid email address."),
        length(max = 120, message = "Email must be at most 120 characters.")
    )]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    pub password: String,

    pub password_confirmation: String,
}

/// Credentials for signing in.
#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

/// Publicly visible user fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub reputation_points: i32,
    pub is_moderator: bool,
    pub created_at: DateTimeWithTimeZone,
}

impl From<&user::Model> for PublicUser {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            reputation_points: user.reputation_points,
            is_moderator: user.is_moderator,
            created_at: user.created_at,
        }
    }
}

/// A user with the issues they reported, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user: PublicUser,
    pub issues: Vec<issue::Model>,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, issue_repo: IssueRepository) -> Self {
        Self {
            user_repo,
            issue_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new account.
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        let mut fields = input
            .validate()
            .map_or_else(|e| field_errors(&e), |()| Default::default());

        if input.password != input.password_confirmation {
            fields
                .entry("password_confirmation".to_string())
                .or_default()
                .push("Passwords must match.".to_string());
        }

        if !fields.contains_key("username")
            && self.user_repo.find_by_username(&input.username).await?.is_some()
        {
            fields.insert(
                "username".to_string(),
                vec!["Please use a different username.".to_string()],
            );
        }
        if !fields.contains_key("email")
            && self.user_repo.find_by_email(&input.email).await?.is_some()
        {
            fields.insert(
                "email".to_string(),
                vec!["Please use a different email address.".to_string()],
            );
        }

        if !fields.is_empty() {
            return Err(AppError::InvalidFields(fields));
        }

        let password_hash = hash_password(&input.password)?;
        let now: DateTimeWithTimeZone = Utc::now().into();

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username_lower: Set(input.username.to_lowercase()),
            username: Set(input.username),
            email: Set(input.email.to_lowercase()),
            password_hash: Set(password_hash),
            token: Set(None),
            reputation_points: Set(0),
            is_moderator: Set(false),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let created = self.user_repo.create(model).await?;
        info!(user_id = %created.id, username = %created.username, "User registered");
        Ok(created)
    }

    /// Verify credentials and return the user with a bearer token.
    pub async fn login(&self, input: LoginInput) -> AppResult<(user::Model, String)> {
        let user = self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(&input.password, &user.password_hash)? {
            debug!(username = %input.username, "Rejected login");
            return Err(AppError::Unauthorized);
        }

        if let Some(token) = user.token.clone() {
            return Ok((user, token));
        }

        let token = self.id_gen.generate_token();
        let updated = self.set_token(user, token.clone()).await?;
        info!(user_id = %updated.id, "User signed in");
        Ok((updated, token))
    }

    /// Invalidate the user's current token by rotating it.
    pub async fn logout(&self, user: user::Model) -> AppResult<()> {
        let user_id = user.id.clone();
        self.set_token(user, self.id_gen.generate_token()).await?;
        info!(user_id = %user_id, "User signed out");
        Ok(())
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        if token.is_empty() {
            return Ok(None);
        }
        self.user_repo.find_by_token(token).await
    }

    /// Public profile with reported issues, newest first.
    pub async fn profile(&self, username: &str) -> AppResult<UserProfile> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))?;
        let issues = self.issue_repo.find_by_reporter(&user.id).await?;

        Ok(UserProfile {
            user: PublicUser::from(&user),
            issues,
        })
    }

    async fn set_token(&self, user: user::Model, token: String) -> AppResult<user::Model> {
        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(token));
        active.updated_at = Set(Some(Utc::now().into()));
        self.user_repo.update(active).await
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

    fn create_test_user(id: &str, username: &str, password: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            email: format!("{username}@example.com"),
            password_hash: hash_password(password).unwrap(),
            token: None,
            reputation_points: 0,
            is_moderator: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: MockDatabase) -> UserService {
        let db = Arc::new(db.into_connection());
        UserService::new(
            UserRepository::new(Arc::clone(&db)),
            IssueRepository::new(db),
        )
    }

    fn register_input(username: &str, email: &str) -> RegisterInput {
        RegisterInput {
            username: username.to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
            password_confirmation: "correct horse".to_string(),
        }
    }

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password_123").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("test_password_123", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("password", "not_a_hash").is_err());
    }

    #[tokio::test]
    async fn test_register_field_errors() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
        let input = RegisterInput {
            username: "ab".to_string(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            password_confirmation: "different".to_string(),
        };

        let Err(AppError::InvalidFields(fields)) = svc.register(input).await else {
            panic!("expected field errors");
        };

        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert_eq!(
            fields["password_confirmation"],
            vec!["Passwords must match.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_register_duplicate_username_and_email() {
        let existing = create_test_user("u1", "alice", "password123");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[existing.clone()]])
            .append_query_results([[existing]]);
        let svc = service(db);

        let Err(AppError::InvalidFields(fields)) = svc
            .register(register_input("Alice", "alice@example.com"))
            .await
        else {
            panic!("expected field errors");
        };

        assert_eq!(fields["username"], vec!["Please use a different username."]);
        assert_eq!(fields["email"], vec!["Please use a different email address."]);
    }

    #[tokio::test]
    async fn test_register_success() {
        let created = create_test_user("u1", "alice", "correct horse");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([[created]]);
        let svc = service(db);

        let user = svc
            .register(register_input("alice", "alice@example.com"))
            .await
            .unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.reputation_points, 0);
        assert!(!user.is_moderator);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let user = create_test_user("u1", "alice", "correct horse");
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]);
        let svc = service(db);

        let result = svc
            .login(LoginInput {
                username: "alice".to_string(),
                password: "battery staple".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()]);
        let svc = service(db);

        let result = svc
            .login(LoginInput {
                username: "nobody".to_string(),
                password: "whatever1".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_login_reuses_existing_token() {
        let mut user = create_test_user("u1", "alice", "correct horse");
        user.token = Some("tok".to_string());
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]);
        let svc = service(db);

        let (_, token) = svc
            .login(LoginInput {
                username: "alice".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(token, "tok");
    }

    #[tokio::test]
    async fn test_login_issues_token() {
        let user = create_test_user("u1", "alice", "correct horse");
        let mut with_token = user.clone();
        with_token.token = Some("fresh".to_string());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user]])
            .append_query_results([[with_token]]);
        let svc = service(db);

        let (updated, token) = svc
            .login(LoginInput {
                username: "alice".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(token.len(), 32);
        assert_eq!(updated.id, "u1");
    }

    #[tokio::test]
    async fn test_authenticate_empty_token() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
        assert!(svc.authenticate_by_token("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_profile_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()]);
        let svc = service(db);

        let result = svc.profile("ghost").await;
        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[test]
    fn test_public_user_hides_email() {
        let user = create_test_user("u1", "alice", "password123");
        let value = serde_json::to_value(PublicUser::from(&user)).unwrap();

        assert_eq!(value["username"], "alice");
        assert!(value.get("email").is_none());
        assert!(value.get("password_hash").is_none());
    }
}
