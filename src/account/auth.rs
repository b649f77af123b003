//! Authentication and profile management
//!
//! Sign-in/sign-up go through the auth service; the user record the UI sees
//! is the caller's row in the `profiles` table.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{decode_single, AuthUser, Backend, Filter, Query, Selection};
use crate::error::{Error, Result};

pub const PROFILES: &str = "profiles";

/// Marketplace role of a profile
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Buyer,
    Seller,
    Agent,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: Uuid,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_role")]
    role: Option<Role>,
    #[serde(default)]
    avatar_url: Option<String>,
}

/// Roles outside the known set decode as absent, so the profile still loads as a buyer
fn lenient_role<'de, D>(deserializer: D) -> std::result::Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|role| {
        let known = serde_json::from_value(Value::String(role.clone())).ok();
        if known.is_none() {
            debug!("Unknown profile role {:?}, treating as buyer", role);
        }
        known
    }))
}

/// Signed-in user as shown by the UI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub avatar: Option<String>,
}

impl From<ProfileRow> for User {
    fn from(profile: ProfileRow) -> Self {
        User {
            id: profile.id,
            first_name: profile.first_name.unwrap_or_default(),
            last_name: profile.last_name.unwrap_or_default(),
            email: profile.email.unwrap_or_default(),
            phone: profile.phone.filter(|p| !p.is_empty()),
            role: profile.role.unwrap_or_default(),
            avatar: profile.avatar_url.filter(|a| !a.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub role: Option<Role>,
}

/// Result of login or registration
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuthResponse {
    /// Bearer token; absent when registration still awaits email confirmation
    pub token: Option<String>,
    pub user: User,
}

/// Profile fields to change; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub avatar: Option<String>,
}

impl ProfileUpdate {
    fn to_patch(&self) -> Result<Map<String, Value>> {
        let mut patch = Map::new();
        if let Some(first_name) = &self.first_name {
            patch.insert("first_name".to_string(), Value::from(first_name.as_str()));
        }
        if let Some(last_name) = &self.last_name {
            patch.insert("last_name".to_string(), Value::from(last_name.as_str()));
        }
        if let Some(phone) = &self.phone {
            patch.insert("phone".to_string(), Value::from(phone.as_str()));
        }
        if let Some(role) = self.role {
            patch.insert("role".to_string(), serde_json::to_value(role)?);
        }
        if let Some(avatar) = &self.avatar {
            patch.insert("avatar_url".to_string(), Value::from(avatar.as_str()));
        }
        Ok(patch)
    }
}

/// Resolve the ambient session into a user. Any failure means "not authenticated".
pub async fn resolve_identity(backend: &dyn Backend) -> Result<AuthUser> {
    match backend.current_user().await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(Error::NotAuthenticated("no signed-in user".to_string())),
        Err(e) => {
            warn!("Identity resolution failed: {}", e);
            Err(Error::NotAuthenticated(e.to_string()))
        }
    }
}

pub struct AuthApi {
    backend: Arc<dyn Backend>,
}

impl AuthApi {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    async fn profile(&self, id: Uuid) -> Result<User> {
        let query = Query::select(Selection::all())
            .eq("id", id.to_string())
            .limit(1);
        let rows = self.backend.select(PROFILES, &query).await?;
        let profile: ProfileRow = decode_single(rows.rows, &format!("profile {}", id))?;
        Ok(profile.into())
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse> {
        let session = self
            .backend
            .sign_in(&credentials.email, &credentials.password)
            .await?;
        let user = self.profile(session.user.id).await?;

        info!("Login successful for {}", user.id);
        Ok(AuthResponse {
            token: Some(session.access_token),
            user,
        })
    }

    /// Create the auth account, then its profile row
    pub async fn register(&self, registration: &Registration) -> Result<AuthResponse> {
        let signed_up = self
            .backend
            .sign_up(&registration.email, &registration.password)
            .await?;

        let profile = serde_json::json!({
            "id": signed_up.user.id.to_string(),
            "first_name": registration.first_name,
            "last_name": registration.last_name,
            "email": registration.email,
            "phone": registration.phone.as_deref().filter(|p| !p.is_empty()),
            "role": registration.role.unwrap_or_default(),
        });
        let rows = self
            .backend
            .upsert(PROFILES, profile, &Selection::all())
            .await?;
        let profile: ProfileRow = decode_single(rows, "created profile")?;

        info!("Registration successful for {}", profile.id);
        Ok(AuthResponse {
            token: signed_up.session.map(|s| s.access_token),
            user: profile.into(),
        })
    }

    pub async fn me(&self) -> Result<User> {
        let identity = resolve_identity(self.backend.as_ref()).await?;
        self.profile(identity.id).await
    }

    pub async fn update_details(&self, update: &ProfileUpdate) -> Result<User> {
        let identity = resolve_identity(self.backend.as_ref()).await?;
        let patch = update.to_patch()?;
        if patch.is_empty() {
            return self.profile(identity.id).await;
        }

        let rows = self
            .backend
            .update(
                PROFILES,
                &[Filter::eq("id", identity.id.to_string())],
                Value::Object(patch),
                &Selection::all(),
            )
            .await?;
        let profile: ProfileRow = decode_single(rows, &format!("profile {}", identity.id))?;
        Ok(profile.into())
    }

    /// Change the password after re-verifying the current one
    pub async fn update_password(&self, current_password: &str, new_password: &str) -> Result<()> {
        let identity = resolve_identity(self.backend.as_ref()).await?;
        let email = identity
            .email
            .ok_or_else(|| Error::NotAuthenticated("account has no email".to_string()))?;

        self.backend
            .sign_in(&email, current_password)
            .await
            .map_err(reverify_error)?;
        self.backend.update_password(new_password).await?;

        info!("Password updated for {}", identity.id);
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        self.backend.sign_out().await
    }
}

/// A rejected re-verification means a wrong current password; anything else propagates
fn reverify_error(err: Error) -> Error {
    match err {
        Error::Backend { status: 400, .. } => {
            Error::InvalidInput("current password is incorrect".to_string())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::error::ErrorKind;

    fn registration(email: &str) -> Registration {
        Registration {
            first_name: "Ada".to_string(),
            last_name: "Obi".to_string(),
            email: email.to_string(),
            password: "secret".to_string(),
            phone: Some(String::new()),
            role: None,
        }
    }

    #[tokio::test]
    async fn test_register_then_me() {
        let auth = AuthApi::new(Arc::new(MemoryBackend::new()));
        let registered = auth.register(&registration("ada@example.com")).await.unwrap();

        assert!(registered.token.is_some());
        assert_eq!(registered.user.role, Role::Buyer);
        assert_eq!(registered.user.phone, None);
        assert_eq!(auth.me().await.unwrap(), registered.user);
    }

    #[tokio::test]
    async fn test_signed_out_is_not_authenticated() {
        let auth = AuthApi::new(Arc::new(MemoryBackend::new()));
        assert_eq!(auth.me().await.unwrap_err().kind(), ErrorKind::NotAuthenticated);
        assert_eq!(
            auth.update_details(&ProfileUpdate::default())
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::NotAuthenticated
        );
    }

    #[tokio::test]
    async fn test_login_returns_profile() {
        let auth = AuthApi::new(Arc::new(MemoryBackend::new()));
        auth.register(&registration("ada@example.com")).await.unwrap();
        auth.logout().await.unwrap();

        let credentials = Credentials {
            email: "ada@example.com".to_string(),
            password: "secret".to_string(),
        };
        let response = auth.login(&credentials).await.unwrap();
        assert_eq!(response.user.first_name, "Ada");
        assert!(response.token.is_some());
    }

    #[tokio::test]
    async fn test_login_without_profile_is_not_found() {
        let backend = Arc::new(MemoryBackend::new());
        backend.sign_up("ghost@example.com", "pw").await.unwrap();
        let auth = AuthApi::new(backend);

        let credentials = Credentials {
            email: "ghost@example.com".to_string(),
            password: "pw".to_string(),
        };
        assert_eq!(
            auth.login(&credentials).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_update_details_maps_avatar() {
        let auth = AuthApi::new(Arc::new(MemoryBackend::new()));
        auth.register(&registration("ada@example.com")).await.unwrap();

        let user = auth
            .update_details(&ProfileUpdate {
                role: Some(Role::Agent),
                avatar: Some("https://cdn/ada.png".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(user.role, Role::Agent);
        assert_eq!(user.avatar.as_deref(), Some("https://cdn/ada.png"));
        assert_eq!(user.first_name, "Ada");
    }

    #[tokio::test]
    async fn test_update_password_checks_current() {
        let auth = AuthApi::new(Arc::new(MemoryBackend::new()));
        auth.register(&registration("ada@example.com")).await.unwrap();

        let err = auth.update_password("wrong", "next").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        auth.update_password("secret", "next").await.unwrap();
        auth.logout().await.unwrap();

        let credentials = Credentials {
            email: "ada@example.com".to_string(),
            password: "next".to_string(),
        };
        assert!(auth.login(&credentials).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_role_falls_back_to_buyer() {
        let backend = Arc::new(MemoryBackend::new());
        let signed_up = backend.sign_up("root@example.com", "pw").await.unwrap();
        backend
            .seed(
                PROFILES,
                vec![serde_json::json!({
                    "id": signed_up.user.id.to_string(),
                    "first_name": "Root",
                    "email": "root@example.com",
                    "role": "admin",
                })],
            )
            .await;
        let auth = AuthApi::new(backend);

        let credentials = Credentials {
            email: "root@example.com".to_string(),
            password: "pw".to_string(),
        };
        let response = auth.login(&credentials).await.unwrap();
        assert_eq!(response.user.role, Role::Buyer);
        assert_eq!(auth.me().await.unwrap().first_name, "Root");
    }

    #[test]
    fn test_reverify_error_only_maps_rejection() {
        let rejected = reverify_error(Error::Backend {
            status: 400,
            message: "Invalid login credentials".to_string(),
        });
        assert_eq!(rejected.kind(), ErrorKind::InvalidInput);

        let unavailable = reverify_error(Error::Backend {
            status: 503,
            message: "upstream unavailable".to_string(),
        });
        assert!(matches!(unavailable, Error::Backend { status: 503, .. }));
        assert_eq!(unavailable.kind(), ErrorKind::BackendFailed);
    }
}
