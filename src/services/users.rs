//! Authentication, registration, profiles and user management

use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{
        ChangePassword, ClientApp, CreateUser, LoginResponse, NewUser, RegisterUser, Role,
        UpdateProfile, UpdateUser, User, UserClaims, UserInfo, UserPatch,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let users = self.repository.find_users_by_username(username).await?;
        Ok(users.into_iter().find(|u| u.username == username))
    }

    async fn ensure_username_free(&self, username: &str, except: Option<i64>) -> AppResult<()> {
        match self.find_by_username(username).await? {
            Some(user) if Some(user.id) != except => Err(AppError::Conflict(format!(
                "Username '{}' is already taken",
                username
            ))),
            _ => Ok(()),
        }
    }

    /// Check credentials for the given front-end and issue a session token.
    ///
    /// The rider app only admits riders, the dashboard only administrators.
    pub async fn login(&self, username: &str, password: &str, client: ClientApp) -> AppResult<LoginResponse> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AppError::Validation("Username and password are required".to_string()));
        }

        let user = self
            .find_by_username(username)
            .await?
            .filter(|u| u.password == password)
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if user.role != client.admitted_role() {
            tracing::info!(username, role = %user.role, ?client, "Login refused for this client");
            return Err(AppError::Authorization(match client {
                ClientApp::Mobile => "This account cannot use the rider app".to_string(),
                ClientApp::Admin => "Administrator account required".to_string(),
            }));
        }

        let token = self.create_token(&user)?;
        tracing::info!(username, user_id = user.id, "User logged in");
        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.jwt_expiration_hours * 3600,
            user: user.into(),
        })
    }

    /// Issue a JWT for a user
    pub fn create_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Rider self-registration
    pub async fn register(&self, input: RegisterUser) -> AppResult<UserInfo> {
        input.validate()?;
        let username = input.username.trim().to_string();
        if username.is_empty()
            || input.ime.trim().is_empty()
            || input.prezime.trim().is_empty()
            || input.telefon.trim().is_empty()
        {
            return Err(AppError::Validation("All fields are required".to_string()));
        }
        self.ensure_username_free(&username, None).await?;

        let user = self
            .repository
            .create_user(&NewUser {
                username,
                password: input.password,
                role: Role::User,
                ime: Some(input.ime.trim().to_string()),
                prezime: Some(input.prezime.trim().to_string()),
                telefon: Some(input.telefon.trim().to_string()),
                email: Some(input.email.trim().to_lowercase()),
            })
            .await?;
        tracing::info!(username = %user.username, user_id = user.id, "Rider registered");
        Ok(user.into())
    }

    pub async fn me(&self, claims: &UserClaims) -> AppResult<UserInfo> {
        Ok(self.repository.get_user(claims.user_id).await?.into())
    }

    /// Update the signed-in user's own profile
    pub async fn update_profile(&self, claims: &UserClaims, profile: UpdateProfile) -> AppResult<UserInfo> {
        let patch = profile.validate_into_patch()?;
        if let Some(username) = &patch.username {
            self.ensure_username_free(username, Some(claims.user_id)).await?;
        }
        let user = self.repository.update_user(claims.user_id, &patch).await?;
        Ok(user.into())
    }

    pub async fn change_password(&self, claims: &UserClaims, request: ChangePassword) -> AppResult<()> {
        request.validate()?;
        let user = self.repository.get_user(claims.user_id).await?;
        if user.password != request.current_password {
            return Err(AppError::Validation("Current password is incorrect".to_string()));
        }
        self.repository
            .update_user(
                claims.user_id,
                &UserPatch {
                    password: Some(request.new_password),
                    ..UserPatch::default()
                },
            )
            .await?;
        tracing::info!(user_id = claims.user_id, "Password changed");
        Ok(())
    }

    pub async fn list_users(&self) -> AppResult<Vec<UserInfo>> {
        let users = self.repository.list_users().await?;
        Ok(users.into_iter().map(UserInfo::from).collect())
    }

    pub async fn get_user(&self, id: i64) -> AppResult<UserInfo> {
        Ok(self.repository.get_user(id).await?.into())
    }

    pub async fn create_user(&self, input: CreateUser) -> AppResult<UserInfo> {
        input.validate()?;
        let username = input.username.trim().to_string();
        self.ensure_username_free(&username, None).await?;
        let user = self
            .repository
            .create_user(&NewUser {
                username,
                password: input.password,
                role: input.role,
                ime: input.ime,
                prezime: input.prezime,
                telefon: input.telefon,
                email: input.email.map(|e| e.trim().to_lowercase()),
            })
            .await?;
        Ok(user.into())
    }

    pub async fn update_user(&self, id: i64, input: UpdateUser) -> AppResult<UserInfo> {
        input.validate()?;
        if let Some(username) = &input.username {
            self.ensure_username_free(username.trim(), Some(id)).await?;
        }
        let patch = UserPatch {
            username: input.username.map(|u| u.trim().to_string()),
            password: input.password,
            role: input.role,
            ime: input.ime,
            prezime: input.prezime,
            telefon: input.telefon,
            email: input.email.map(|e| e.trim().to_lowercase()),
        };
        Ok(self.repository.update_user(id, &patch).await?.into())
    }

    /// Remove a user; administrators cannot remove themselves
    pub async fn delete_user(&self, claims: &UserClaims, id: i64) -> AppResult<()> {
        if claims.user_id == id {
            return Err(AppError::BusinessRule("You cannot delete your own account".to_string()));
        }
        self.repository.delete_user(id).await?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::repository::MockStore;

    fn user(id: i64, username: &str, password: &str, role: Role) -> User {
        User {
            id,
            username: username.to_string(),
            password: password.to_string(),
            role,
            ime: Some("Ana".to_string()),
            prezime: Some("Vraneš".to_string()),
            telefon: None,
            email: None,
        }
    }

    fn service(store: MockStore) -> UsersService {
        UsersService::new(Arc::new(store), AuthConfig::default())
    }

    fn store_with(users: Vec<User>) -> MockStore {
        let mut store = MockStore::new();
        store.expect_find_users_by_username().returning(move |name| {
            Ok(users.iter().filter(|u| u.username == name).cloned().collect())
        });
        store
    }

    #[tokio::test]
    async fn test_login_issues_token_with_identity() {
        let store = store_with(vec![user(2, "ana", "ana123", Role::User)]);
        let service = service(store);

        let response = service.login("ana", "ana123", ClientApp::Mobile).await.unwrap();
        let claims = UserClaims::from_token(&response.token, &AuthConfig::default().jwt_secret).unwrap();
        assert_eq!(claims.sub, "ana");
        assert_eq!(claims.user_id, 2);
        assert_eq!(claims.role, Role::User);
        assert_eq!(response.expires_in, 24 * 3600);
    }

    #[tokio::test]
    async fn test_login_checks_password_and_client() {
        let store = store_with(vec![
            user(1, "admin", "admin123", Role::Admin),
            user(2, "ana", "ana123", Role::User),
        ]);
        let service = service(store);

        assert!(matches!(
            service.login("ana", "wrong", ClientApp::Mobile).await,
            Err(AppError::Authentication(_))
        ));
        assert!(matches!(
            service.login("nobody", "x", ClientApp::Mobile).await,
            Err(AppError::Authentication(_))
        ));
        assert!(matches!(
            service.login("admin", "admin123", ClientApp::Mobile).await,
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            service.login("ana", "ana123", ClientApp::Admin).await,
            Err(AppError::Authorization(_))
        ));
        assert!(service.login("admin", "admin123", ClientApp::Admin).await.is_ok());
    }

    #[tokio::test]
    async fn test_register_rejects_taken_username() {
        let mut store = store_with(vec![user(2, "ana", "ana123", Role::User)]);
        store.expect_create_user().never();

        let err = service(store)
            .register(RegisterUser {
                username: "ana".to_string(),
                password: "secret1".to_string(),
                ime: "Ana".to_string(),
                prezime: "Petrović".to_string(),
                telefon: "0641234567".to_string(),
                email: "ana@example.com".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_forces_rider_role() {
        let mut store = store_with(Vec::new());
        store
            .expect_create_user()
            .withf(|u| u.role == Role::User && u.email.as_deref() == Some("marko@example.com"))
            .times(1)
            .returning(|u| Ok(u.clone().into_user(5)));

        let info = service(store)
            .register(RegisterUser {
                username: "marko".to_string(),
                password: "secret1".to_string(),
                ime: "Marko".to_string(),
                prezime: "Marković".to_string(),
                telefon: "0641234567".to_string(),
                email: "Marko@Example.com".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(info.id, 5);
        assert_eq!(info.role, Role::User);
    }

    #[tokio::test]
    async fn test_change_password_verifies_current_password() {
        let mut store = MockStore::new();
        store
            .expect_get_user()
            .returning(|id| Ok(user(id, "ana", "ana123", Role::User)));
        store.expect_update_user().never();

        let claims = UserClaims {
            sub: "ana".to_string(),
            user_id: 2,
            role: Role::User,
            exp: 0,
            iat: 0,
        };
        let err = service(store)
            .change_password(
                &claims,
                ChangePassword {
                    current_password: "nope".to_string(),
                    new_password: "novaLozinka".to_string(),
                    repeat_password: "novaLozinka".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
