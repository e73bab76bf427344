//! User model and related types

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Minimum password length accepted on registration and password change
pub const MIN_PASSWORD_LEN: usize = 6;

/// Minimum number of digits in a cleaned phone number
pub const MIN_PHONE_LEN: usize = 8;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Front-end a login comes from; each one admits a single role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClientApp {
    /// Administrative dashboard
    Admin,
    /// Rider mobile application
    Mobile,
}

impl ClientApp {
    pub fn admitted_role(&self) -> Role {
        match self {
            ClientApp::Admin => Role::Admin,
            ClientApp::Mobile => Role::User,
        }
    }
}

/// User as stored in the `users` resource
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prezime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telefon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// User as returned by the API (no password)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub ime: Option<String>,
    pub prezime: Option<String>,
    pub telefon: Option<String>,
    pub email: Option<String>,
}

impl From<User> for UserInfo {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            role: u.role,
            ime: u.ime,
            prezime: u.prezime,
            telefon: u.telefon,
            email: u.email,
        }
    }
}

/// User to be created in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub ime: Option<String>,
    pub prezime: Option<String>,
    pub telefon: Option<String>,
    pub email: Option<String>,
}

impl NewUser {
    pub fn into_user(self, id: i64) -> User {
        User {
            id,
            username: self.username,
            password: self.password,
            role: self.role,
            ime: self.ime,
            prezime: self.prezime,
            telefon: self.telefon,
            email: self.email,
        }
    }
}

/// Partial user update sent to the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prezime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserPatch {
    pub fn apply(&self, user: &mut User) {
        if let Some(v) = &self.username {
            user.username = v.clone();
        }
        if let Some(v) = &self.password {
            user.password = v.clone();
        }
        if let Some(v) = self.role {
            user.role = v;
        }
        if self.ime.is_some() {
            user.ime = self.ime.clone();
        }
        if self.prezime.is_some() {
            user.prezime = self.prezime.clone();
        }
        if self.telefon.is_some() {
            user.telefon = self.telefon.clone();
        }
        if self.email.is_some() {
            user.email = self.email.clone();
        }
    }
}

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Which front-end is logging in
    pub client: ClientApp,
}

/// Login response with the session token
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserInfo,
}

/// Rider self-registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(length(min = 1, message = "All fields are required"))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "All fields are required"))]
    pub ime: String,
    #[validate(length(min = 1, message = "All fields are required"))]
    pub prezime: String,
    #[validate(length(min = 1, message = "All fields are required"))]
    pub telefon: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Create user request (admin)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub role: Role,
    pub ime: Option<String>,
    pub prezime: Option<String>,
    pub telefon: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

/// Update user request (admin)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 1, message = "Username cannot be empty"))]
    pub username: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
    pub role: Option<Role>,
    pub ime: Option<String>,
    pub prezime: Option<String>,
    pub telefon: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

/// Update own profile request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateProfile {
    pub username: String,
    pub ime: String,
    pub prezime: String,
    #[serde(default)]
    pub telefon: String,
    pub email: String,
}

impl UpdateProfile {
    /// Check the profile form and return the patch to store
    pub fn validate_into_patch(self) -> Result<UserPatch, AppError> {
        let required = [
            (&self.username, "Username is required"),
            (&self.ime, "First name is required"),
            (&self.prezime, "Last name is required"),
            (&self.email, "Email is required"),
        ];
        for (value, message) in required {
            if value.trim().is_empty() {
                return Err(AppError::Validation(message.to_string()));
            }
        }
        if !is_valid_email(&self.email) {
            return Err(AppError::Validation("Email is not well formed".to_string()));
        }
        let telefon = self.telefon.trim();
        if !telefon.is_empty() && clean_phone(telefon).len() < MIN_PHONE_LEN {
            return Err(AppError::Validation("Phone number is not well formed".to_string()));
        }

        Ok(UserPatch {
            username: Some(self.username.trim().to_string()),
            ime: Some(self.ime.trim().to_string()),
            prezime: Some(self.prezime.trim().to_string()),
            telefon: Some(telefon.to_string()),
            email: Some(self.email.trim().to_lowercase()),
            ..UserPatch::default()
        })
    }
}

/// Change own password request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
    pub repeat_password: String,
}

impl ChangePassword {
    /// Form checks that do not need the stored user
    pub fn validate(&self) -> Result<(), AppError> {
        if self.current_password.trim().is_empty()
            || self.new_password.trim().is_empty()
            || self.repeat_password.trim().is_empty()
        {
            return Err(AppError::Validation("All fields are required".to_string()));
        }
        if self.new_password != self.repeat_password {
            return Err(AppError::Validation("Passwords do not match".to_string()));
        }
        if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "New password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}

/// Keep digits and `+` only
pub fn clean_phone(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit() || *c == '+').collect()
}

/// JWT claims carried by every authenticated request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// Username when the token was issued; the account may have been renamed since
    pub sub: String,
    pub user_id: i64,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    /// Require a rider account
    pub fn require_rider(&self) -> Result<(), AppError> {
        if self.role == Role::User {
            Ok(())
        } else {
            Err(AppError::Authorization("Only riders can rent bikes".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(email: &str, telefon: &str) -> UpdateProfile {
        UpdateProfile {
            username: " ana ".to_string(),
            ime: "Ana".to_string(),
            prezime: "Vraneš".to_string(),
            telefon: telefon.to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn test_profile_normalization() {
        let patch = profile(" Ana@Test.com ", "+381 69 10 10 10")
            .validate_into_patch()
            .unwrap();
        assert_eq!(patch.username.as_deref(), Some("ana"));
        assert_eq!(patch.email.as_deref(), Some("ana@test.com"));
        assert_eq!(patch.password, None);
    }

    #[test]
    fn test_profile_rejections() {
        assert!(profile("not-an-email", "").validate_into_patch().is_err());
        assert!(profile("ana@test.com", "12-34").validate_into_patch().is_err());
        assert!(profile("ana@test.com", "").validate_into_patch().is_ok());
    }

    #[test]
    fn test_change_password_form() {
        let form = |cur: &str, new: &str, rep: &str| ChangePassword {
            current_password: cur.to_string(),
            new_password: new.to_string(),
            repeat_password: rep.to_string(),
        };
        assert!(form("old", "secret1", "secret1").validate().is_ok());
        assert!(form("", "secret1", "secret1").validate().is_err());
        assert!(form("old", "secret1", "secret2").validate().is_err());
        assert!(form("old", "abc", "abc").validate().is_err());
    }

    #[test]
    fn test_register_validation() {
        let req = RegisterUser {
            username: "pera".to_string(),
            password: "12345".to_string(),
            ime: "Pera".to_string(),
            prezime: "Perić".to_string(),
            telefon: "0601234567".to_string(),
            email: "pera@test.com".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_token_round_trip() {
        let now = chrono::Utc::now().timestamp();
        let claims = UserClaims {
            sub: "ana".to_string(),
            user_id: 7,
            role: Role::User,
            exp: now + 3600,
            iat: now,
        };
        let token = claims.create_token("secret").unwrap();
        let parsed = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.user_id, 7);
        assert!(parsed.require_rider().is_ok());
        assert!(parsed.require_admin().is_err());
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_client_roles() {
        assert_eq!(ClientApp::Mobile.admitted_role(), Role::User);
        assert_eq!(ClientApp::Admin.admitted_role(), Role::Admin);
    }
}
