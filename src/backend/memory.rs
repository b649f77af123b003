use crate::backend::traits::Backend;
use crate::backend::types::{
    compare_values, AuthSession, AuthUser, Filter, Query, Rows, Selection, SignUp,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

struct Account {
    user: AuthUser,
    password: String,
}

#[derive(Default)]
struct State {
    tables: HashMap<String, Vec<Value>>,
    accounts: HashMap<String, Account>,
    current: Option<AuthUser>,
}

/// In-process backend that evaluates queries over JSON rows.
/// Used for tests and offline demos; it applies the same clause semantics the
/// hosted service does, without row-level security.
#[derive(Default)]
pub struct MemoryBackend {
    state: RwLock<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rows as-is, filling in `id` and timestamps when absent
    pub async fn seed(&self, table: &str, rows: impl IntoIterator<Item = Value>) {
        let mut state = self.state.write().await;
        let stored = state.tables.entry(table.to_string()).or_default();
        for row in rows {
            stored.push(with_defaults(row));
        }
    }

    /// Snapshot of a table's rows
    pub async fn rows(&self, table: &str) -> Vec<Value> {
        self.state
            .read()
            .await
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

fn with_defaults(row: Value) -> Value {
    let mut object = match row {
        Value::Object(object) => object,
        other => return other,
    };
    let now = Value::String(Utc::now().to_rfc3339());
    object
        .entry("id")
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    object.entry("created_at").or_insert_with(|| now.clone());
    object.entry("updated_at").or_insert(now);
    Value::Object(object)
}

fn matches_all(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| f.matches(row))
}

/// Nulls sort last ascending and first descending
fn compare_rows(a: &Value, b: &Value, column: &str, ascending: bool) -> Ordering {
    let left = a.get(column).filter(|v| !v.is_null());
    let right = b.get(column).filter(|v| !v.is_null());
    let ordering = match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
    };
    if ascending {
        ordering
    } else {
        ordering.reverse()
    }
}

fn pick_columns(row: &Value, columns: &[String]) -> Map<String, Value> {
    match row {
        Value::Object(object) if columns.is_empty() => object.clone(),
        _ => columns
            .iter()
            .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
            .collect(),
    }
}

fn project(row: &Value, selection: &Selection, tables: &HashMap<String, Vec<Value>>) -> Value {
    let mut object = pick_columns(row, &selection.columns);

    for embed in &selection.embeds {
        let related = row
            .get(&embed.fk_column)
            .filter(|fk| !fk.is_null())
            .and_then(|fk| {
                tables
                    .get(&embed.table)?
                    .iter()
                    .find(|candidate| candidate.get("id") == Some(fk))
            })
            .map(|found| Value::Object(pick_columns(found, &embed.columns)))
            .unwrap_or(Value::Null);
        object.insert(embed.alias.clone(), related);
    }

    Value::Object(object)
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Value::Object(target), Value::Object(patch)) = (target, patch) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

fn rejected(status: u16, message: &str) -> Error {
    Error::Backend {
        status,
        message: message.to_string(),
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Rows> {
        let state = self.state.read().await;
        let mut matched: Vec<&Value> = state
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| matches_all(r, &query.filters)).collect())
            .unwrap_or_default();

        // Stable sort, applied last key first
        for order in query.order.iter().rev() {
            matched.sort_by(|a, b| compare_rows(a, b, &order.column, order.ascending));
        }

        let total = matched.len();
        let window: &[&Value] = match (query.range, query.limit) {
            (Some(range), _) if range.from >= total => &[],
            (Some(range), _) => &matched[range.from..=range.to.min(total - 1)],
            (None, Some(limit)) => &matched[..limit.min(total)],
            (None, None) => &matched,
        };

        debug!("Memory select on {}: {} of {} rows", table, window.len(), total);

        Ok(Rows {
            rows: window
                .iter()
                .map(|row| project(row, &query.selection, &state.tables))
                .collect(),
            total: query.count.then_some(total as u64),
        })
    }

    async fn insert(&self, table: &str, row: Value, returning: &Selection) -> Result<Vec<Value>> {
        if !row.is_object() {
            return Err(rejected(400, "row must be a JSON object"));
        }

        let mut state = self.state.write().await;
        let stored = with_defaults(row);
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());
        Ok(vec![project(&stored, returning, &state.tables)])
    }

    async fn upsert(&self, table: &str, row: Value, returning: &Selection) -> Result<Vec<Value>> {
        if !row.is_object() {
            return Err(rejected(400, "row must be a JSON object"));
        }

        // Lookup and merge happen under one write guard
        let mut state = self.state.write().await;
        let rows = state.tables.entry(table.to_string()).or_default();
        let existing = row
            .get("id")
            .and_then(|id| rows.iter().position(|r| r.get("id") == Some(id)));

        let stored = match existing {
            Some(index) => {
                let current = &mut rows[index];
                merge(current, &row);
                merge(
                    current,
                    &serde_json::json!({ "updated_at": Utc::now().to_rfc3339() }),
                );
                current.clone()
            }
            None => {
                let stored = with_defaults(row);
                rows.push(stored.clone());
                stored
            }
        };
        Ok(vec![project(&stored, returning, &state.tables)])
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
        returning: &Selection,
    ) -> Result<Vec<Value>> {
        let mut state = self.state.write().await;
        let stamp = serde_json::json!({ "updated_at": Utc::now().to_rfc3339() });

        let mut updated = Vec::new();
        if let Some(rows) = state.tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| matches_all(r, filters)) {
                merge(row, &patch);
                merge(row, &stamp);
                updated.push(row.clone());
            }
        }

        Ok(updated
            .iter()
            .map(|row| project(row, returning, &state.tables))
            .collect())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(rows) = state.tables.get_mut(table) {
            rows.retain(|r| !matches_all(r, filters));
        }
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let mut state = self.state.write().await;
        let user = match state.accounts.get(email) {
            Some(account) if account.password == password => account.user.clone(),
            _ => return Err(rejected(400, "Invalid login credentials")),
        };
        state.current = Some(user.clone());
        Ok(session_for(user))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp> {
        let mut state = self.state.write().await;
        if state.accounts.contains_key(email) {
            return Err(rejected(422, "User already registered"));
        }

        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
        };
        state.accounts.insert(
            email.to_string(),
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        state.current = Some(user.clone());

        Ok(SignUp {
            session: Some(session_for(user.clone())),
            user,
        })
    }

    async fn current_user(&self) -> Result<Option<AuthUser>> {
        Ok(self.state.read().await.current.clone())
    }

    async fn update_password(&self, new_password: &str) -> Result<AuthUser> {
        let mut state = self.state.write().await;
        let user = state
            .current
            .clone()
            .ok_or_else(|| Error::NotAuthenticated("no active session".to_string()))?;

        let account = state
            .accounts
            .values_mut()
            .find(|a| a.user.id == user.id)
            .ok_or_else(|| rejected(404, "User not found"))?;
        account.password = new_password.to_string();
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        self.state.write().await.current = None;
        Ok(())
    }
}

fn session_for(user: AuthUser) -> AuthSession {
    AuthSession {
        access_token: format!("memory-access-{}", user.id),
        refresh_token: format!("memory-refresh-{}", user.id),
        expires_at: None,
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::{Embed, Order};
    use serde_json::json;

    #[tokio::test]
    async fn test_select_orders_and_windows() {
        let backend = MemoryBackend::new();
        backend
            .seed(
                "items",
                (1..=5).map(|n| json!({ "n": n, "created_at": format!("2024-01-0{}T00:00:00+00:00", n) })),
            )
            .await;

        let query = Query::select(Selection::columns(&["n"]))
            .order(Order::desc("created_at"))
            .range(1, 2)
            .exact_count();
        let rows = backend.select("items", &query).await.unwrap();

        assert_eq!(rows.total, Some(5));
        assert_eq!(rows.rows, vec![json!({"n": 4}), json!({"n": 3})]);

        let beyond = Query::select(Selection::all()).range(10, 19);
        assert!(backend.select("items", &beyond).await.unwrap().rows.is_empty());
    }

    #[tokio::test]
    async fn test_nulls_sort_last_ascending() {
        let backend = MemoryBackend::new();
        backend
            .seed("items", vec![json!({"n": null}), json!({"n": 2}), json!({"n": 1})])
            .await;

        let query = Query::select(Selection::columns(&["n"])).order(Order::asc("n"));
        let rows = backend.select("items", &query).await.unwrap().rows;
        assert_eq!(rows, vec![json!({"n": 1}), json!({"n": 2}), json!({"n": null})]);
    }

    #[tokio::test]
    async fn test_embed_resolves_related_row() {
        let backend = MemoryBackend::new();
        backend
            .seed("owners", vec![json!({"id": "o1", "name": "Ada"})])
            .await;
        backend
            .seed(
                "pets",
                vec![
                    json!({"id": "p1", "owner_id": "o1"}),
                    json!({"id": "p2", "owner_id": null}),
                ],
            )
            .await;

        let selection = Selection::columns(&["id"])
            .embed(Embed::new("owner", "owners", "owner_id").columns(&["name"]));
        let rows = backend
            .select("pets", &Query::select(selection).order(Order::asc("id")))
            .await
            .unwrap()
            .rows;

        assert_eq!(rows[0], json!({"id": "p1", "owner": {"name": "Ada"}}));
        assert_eq!(rows[1], json!({"id": "p2", "owner": null}));
    }

    #[tokio::test]
    async fn test_upsert_merges_existing_row() {
        let backend = MemoryBackend::new();
        backend
            .seed("profiles", vec![json!({"id": "u1", "first_name": "Ada", "role": "buyer"})])
            .await;

        let stored = backend
            .upsert(
                "profiles",
                json!({"id": "u1", "role": "agent"}),
                &Selection::columns(&["first_name", "role"]),
            )
            .await
            .unwrap();

        assert_eq!(stored, vec![json!({"first_name": "Ada", "role": "agent"})]);
        assert_eq!(backend.rows("profiles").await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_upsert_survives_concurrent_deletes() {
        let backend = std::sync::Arc::new(MemoryBackend::new());
        let ids: Vec<String> = (0..8).map(|i| format!("u{}", i)).collect();
        backend
            .seed(
                "profiles",
                ids.iter().map(|id| json!({"id": id, "role": "buyer"})).collect::<Vec<_>>(),
            )
            .await;

        let mut handles = Vec::new();
        for id in ids.iter().cloned() {
            let upserts = backend.clone();
            let upsert_id = id.clone();
            handles.push(tokio::spawn(async move {
                upserts
                    .upsert("profiles", json!({"id": upsert_id, "role": "agent"}), &Selection::all())
                    .await
                    .map(|_| ())
            }));
            let deletes = backend.clone();
            handles.push(tokio::spawn(async move {
                deletes.delete("profiles", &[Filter::eq("id", id)]).await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert!(backend.rows("profiles").await.len() <= 8);
    }

    #[tokio::test]
    async fn test_upsert_rejects_non_object() {
        let backend = MemoryBackend::new();
        let err = backend
            .upsert("profiles", json!(["u1"]), &Selection::all())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Backend { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_auth_round_trip() {
        let backend = MemoryBackend::new();
        let signed_up = backend.sign_up("ada@example.com", "secret").await.unwrap();
        assert!(signed_up.session.is_some());

        backend.sign_out().await.unwrap();
        assert_eq!(backend.current_user().await.unwrap(), None);

        assert!(backend.sign_in("ada@example.com", "wrong").await.is_err());
        let session = backend.sign_in("ada@example.com", "secret").await.unwrap();
        assert_eq!(session.user.id, signed_up.user.id);
        assert_eq!(
            backend.current_user().await.unwrap().map(|u| u.id),
            Some(signed_up.user.id)
        );
    }
}
