use crate::backend::types::{AuthSession, AuthUser, Filter, Query, Rows, Selection, SignUp};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// The hosted backend as seen by the marketplace: relational tables plus auth.
/// Every call is a single round trip; implementations never retry.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Select rows from a table
    async fn select(&self, table: &str, query: &Query) -> Result<Rows>;

    /// Insert one row and return the stored representation
    async fn insert(&self, table: &str, row: Value, returning: &Selection) -> Result<Vec<Value>>;

    /// Insert or merge one row keyed by its primary key
    async fn upsert(&self, table: &str, row: Value, returning: &Selection) -> Result<Vec<Value>>;

    /// Patch every row matching all filters
    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
        returning: &Selection,
    ) -> Result<Vec<Value>>;

    /// Delete every row matching all filters
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp>;

    /// Resolve the ambient session into a user; `None` when signed out
    async fn current_user(&self) -> Result<Option<AuthUser>>;

    async fn update_password(&self, new_password: &str) -> Result<AuthUser>;

    async fn sign_out(&self) -> Result<()>;
}
