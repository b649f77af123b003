use crate::backend::traits::Backend;
use crate::backend::types::{AuthSession, AuthUser, Filter, Query, Rows, Selection, SignUp};
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Refresh the access token this long before it expires
const REFRESH_MARGIN_SECS: i64 = 30;

/// Hosted backend over HTTP: PostgREST for tables, GoTrue for auth
pub struct RestBackend {
    client: Client,
    config: BackendConfig,
    session: RwLock<Option<AuthSession>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl From<TokenResponse> for AuthSession {
    fn from(token: TokenResponse) -> Self {
        let expires_at = token
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .or_else(|| {
                token
                    .expires_in
                    .map(|secs| Utc::now() + ChronoDuration::seconds(secs))
            });

        AuthSession {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: token.user,
        }
    }
}

impl RestBackend {
    /// Create a backend client for the given settings
    pub fn new(config: BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("maeson-realty/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            config,
            session: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Current session, if signed in
    pub async fn session(&self) -> Option<AuthSession> {
        self.session.read().await.clone()
    }

    fn request(&self, method: Method, url: &str, bearer: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }

    /// Token for the next call, refreshing the session when it is about to expire
    async fn bearer(&self) -> Result<String> {
        let current = self.session.read().await.clone();
        let session = match current {
            None => return Ok(self.config.anon_key.clone()),
            Some(session) => session,
        };

        let expiring = session
            .expires_at
            .map_or(false, |at| at <= Utc::now() + ChronoDuration::seconds(REFRESH_MARGIN_SECS));
        if !expiring {
            return Ok(session.access_token);
        }

        debug!("Refreshing session for user {}", session.user.id);
        match self.refresh(&session.refresh_token).await {
            Ok(refreshed) => {
                let token = refreshed.access_token.clone();
                *self.session.write().await = Some(refreshed);
                Ok(token)
            }
            Err(Error::Backend { status, message }) if (400..500).contains(&status) => {
                warn!(
                    "Refresh rejected for user {} ({}): {}; continuing signed out",
                    session.user.id, status, message
                );
                let mut current = self.session.write().await;
                if current.as_ref().map(|s| &s.refresh_token) == Some(&session.refresh_token) {
                    *current = None;
                }
                Ok(self.config.anon_key.clone())
            }
            Err(e) => Err(e),
        }
    }

    async fn signed_in(&self) -> bool {
        self.session.read().await.is_some()
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession> {
        let url = self.config.auth_url("token");
        let response = self
            .request(Method::POST, &url, &self.config.anon_key)
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let token: TokenResponse = check(response).await?.json().await?;
        Ok(token.into())
    }

    async fn mutate(
        &self,
        method: Method,
        table: &str,
        filters: &[Filter],
        body: Option<Value>,
        returning: Option<&Selection>,
        prefer: &str,
    ) -> Result<Vec<Value>> {
        let url = self.config.rest_url(table);
        let bearer = self.bearer().await?;

        let mut params: Vec<(String, String)> = filters.iter().map(Filter::to_param).collect();
        if let Some(selection) = returning {
            params.push(("select".to_string(), selection.render()));
        }

        debug!("{} {} {:?}", method, url, params);

        let mut request = self
            .request(method, &url, &bearer)
            .query(&params)
            .header("Prefer", prefer);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = check(request.send().await?).await?;
        if returning.is_none() {
            return Ok(Vec::new());
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl Backend for RestBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Rows> {
        let url = self.config.rest_url(table);
        let bearer = self.bearer().await?;
        let params = query.to_params();

        debug!("GET {} {:?}", url, params);

        let mut request = self.request(Method::GET, &url, &bearer).query(&params);
        if query.count {
            request = request.header("Prefer", "count=exact");
        }

        let response = request.send().await?;
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            // Offset past the last row: an empty page, not a failure
            let total = content_range_total(&response);
            debug!("Range past the end of {} (total {:?})", table, total);
            return Ok(Rows {
                rows: Vec::new(),
                total,
            });
        }

        let response = check(response).await?;
        let total = content_range_total(&response);
        let rows: Vec<Value> = response.json().await?;

        debug!("Fetched {} rows from {} (total {:?})", rows.len(), table, total);
        Ok(Rows { rows, total })
    }

    async fn insert(&self, table: &str, row: Value, returning: &Selection) -> Result<Vec<Value>> {
        self.mutate(
            Method::POST,
            table,
            &[],
            Some(row),
            Some(returning),
            "return=representation",
        )
        .await
    }

    async fn upsert(&self, table: &str, row: Value, returning: &Selection) -> Result<Vec<Value>> {
        self.mutate(
            Method::POST,
            table,
            &[],
            Some(row),
            Some(returning),
            "resolution=merge-duplicates,return=representation",
        )
        .await
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
        returning: &Selection,
    ) -> Result<Vec<Value>> {
        self.mutate(
            Method::PATCH,
            table,
            filters,
            Some(patch),
            Some(returning),
            "return=representation",
        )
        .await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
        self.mutate(Method::DELETE, table, filters, None, None, "return=minimal")
            .await
            .map(|_| ())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let url = self.config.auth_url("token");
        let response = self
            .request(Method::POST, &url, &self.config.anon_key)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let token: TokenResponse = check(response).await?.json().await?;
        let session = AuthSession::from(token);
        info!("Signed in as {}", session.user.id);

        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp> {
        let url = self.config.auth_url("signup");
        let response = self
            .request(Method::POST, &url, &self.config.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let body: Value = check(response).await?.json().await?;
        let outcome = if body.get("access_token").is_some() {
            let session = AuthSession::from(serde_json::from_value::<TokenResponse>(body)?);
            *self.session.write().await = Some(session.clone());
            SignUp {
                user: session.user.clone(),
                session: Some(session),
            }
        } else {
            // Confirmation pending: the body is the user itself, sometimes wrapped
            let user = match body.get("user") {
                Some(user) => serde_json::from_value(user.clone())?,
                None => serde_json::from_value(body)?,
            };
            SignUp {
                user,
                session: None,
            }
        };

        info!("Registered user {}", outcome.user.id);
        Ok(outcome)
    }

    async fn current_user(&self) -> Result<Option<AuthUser>> {
        if !self.signed_in().await {
            return Ok(None);
        }

        let bearer = self.bearer().await?;
        if !self.signed_in().await {
            return Ok(None);
        }
        let url = self.config.auth_url("user");
        let response = self.request(Method::GET, &url, &bearer).send().await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            warn!("Session rejected by auth service");
            return Ok(None);
        }

        let user: AuthUser = check(response).await?.json().await?;
        Ok(Some(user))
    }

    async fn update_password(&self, new_password: &str) -> Result<AuthUser> {
        let bearer = self.bearer().await?;
        if !self.signed_in().await {
            return Err(Error::NotAuthenticated("no active session".to_string()));
        }
        let url = self.config.auth_url("user");
        let response = self
            .request(Method::PUT, &url, &bearer)
            .json(&json!({ "password": new_password }))
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    async fn sign_out(&self) -> Result<()> {
        let session = self.session.write().await.take();
        let Some(session) = session else {
            return Ok(());
        };

        let url = self.config.auth_url("logout");
        let response = self
            .request(Method::POST, &url, &session.access_token)
            .send()
            .await?;
        check(response).await?;

        info!("Signed out user {}", session.user.id);
        Ok(())
    }
}

/// Turn a non-2xx response into `Error::Backend` carrying the service's message
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|body| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| body.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or(text);

    warn!("Backend returned {}: {}", status, message);
    Err(Error::Backend {
        status: status.as_u16(),
        message,
    })
}

fn content_range_total(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("content-range")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range)
}

/// Total from a `Content-Range` header such as `0-11/42` or `*/0`
fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse().ok()
}
