//! Models that represent users, authentication payloads, and role metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::types::UserId;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of a registered account.
pub struct User {
    /// Unique identifier for the user; also scopes the user's capture sessions.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Unique contact address, used for password recovery.
    pub email: String,
    /// Argon2 hash of the user's password.
    pub password_hash: String,
    /// Role describing the user's privileges.
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::Type, ToSchema, Default)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
/// Supported user roles stored in the database.
pub enum UserRole {
    /// Regular account that records and inspects its own telemetry.
    #[default]
    User,
    /// Administrator account.
    Admin,
}

impl UserRole {
    /// Returns the canonical snake_case representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl Serialize for UserRole {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            _ => Err(serde::de::Error::unknown_variant(&s, &["user", "admin"])),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
/// Payload for creating a new account.
pub struct RegisterRequest {
    #[validate(custom(function = "crate::validation::rules::validate_username"))]
    pub username: String,
    #[validate(length(min = 1, max = 256))]
    pub password: String,
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
/// Credentials submitted by a user attempting to authenticate.
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
/// Identifies the account whose password should be regenerated and mailed.
pub struct RecoverPasswordRequest {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
/// Payload submitted when a user changes their password.
pub struct ChangePasswordRequest {
    pub username: String,
    /// Current password, verified before applying the change.
    pub password: String,
    pub newpassword: String,
    /// Must equal `newpassword`.
    pub confirm_newpassword: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
/// Returned after a successful login; the token is also set as a cookie.
pub struct LoginResponse {
    pub id: UserId,
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
/// Public-facing representation of a user returned by the API.
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role.as_str().to_string(),
        }
    }
}

impl User {
    /// Constructs a new account with a freshly generated identifier.
    pub fn new(username: String, email: String, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            username,
            email,
            password_hash,
            role,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn user_role_serde_accepts_any_casing_and_emits_snake_case() {
        let u: UserRole = serde_json::from_str("\"user\"").unwrap();
        let a: UserRole = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(u, UserRole::User);
        assert_eq!(a, UserRole::Admin);
        assert!(serde_json::from_str::<UserRole>("\"employee\"").is_err());

        assert_eq!(
            serde_json::to_value(UserRole::User).unwrap(),
            Value::String("user".into())
        );
    }

    #[test]
    fn user_response_hides_password_hash() {
        let user = User::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "secret-hash".to_string(),
            UserRole::User,
        );
        let resp: UserResponse = user.into();
        assert_eq!(resp.role, "user");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("secret-hash"));
    }

    #[test]
    fn register_request_validates_email_and_username() {
        let ok = RegisterRequest {
            username: "alice_01".into(),
            password: "pw".into(),
            email: "alice@example.com".into(),
        };
        assert!(ok.validate().is_ok());

        let bad = RegisterRequest {
            username: "alice smith".into(),
            password: "".into(),
            email: "not-an-email".into(),
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("email"));
    }
}
