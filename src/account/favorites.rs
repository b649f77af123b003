use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::account::auth::resolve_identity;
use crate::backend::{decode_rows, decode_single, Backend, Embed, Filter, Order, Query, Selection};
use crate::error::Result;
use crate::listings::api::PROPERTIES;
use crate::models::Property;

pub const FAVORITES: &str = "favorites";

#[derive(Debug, Deserialize)]
struct FavoriteRow {
    id: Uuid,
    #[serde(default)]
    notes: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    property: Option<Property>,
}

/// Property saved by a user
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Favorite {
    pub id: Uuid,
    pub user: Uuid,
    /// Absent when the property has since been deleted
    pub property: Option<Property>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FavoriteRow {
    fn into_favorite(self, user: Uuid) -> Favorite {
        Favorite {
            id: self.id,
            user,
            property: self.property,
            notes: self.notes.filter(|n| !n.is_empty()),
            created_at: self.created_at,
        }
    }
}

fn favorite_selection() -> Selection {
    Selection::columns(&["id", "notes", "created_at"])
        .embed(Embed::new("property", PROPERTIES, "property_id"))
}

/// Favorites of the signed-in user
pub struct FavoritesApi {
    backend: Arc<dyn Backend>,
}

impl FavoritesApi {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Newest first
    pub async fn list(&self) -> Result<Vec<Favorite>> {
        let user = resolve_identity(self.backend.as_ref()).await?;
        let query = Query::select(favorite_selection())
            .eq("user_id", user.id.to_string())
            .order(Order::desc("created_at"));

        let rows = self.backend.select(FAVORITES, &query).await?;
        let favorites: Vec<FavoriteRow> = decode_rows(rows.rows)?;
        Ok(favorites
            .into_iter()
            .map(|f| f.into_favorite(user.id))
            .collect())
    }

    /// Save a property. Duplicates are not checked here; see [`FavoritesApi::is_favorited`].
    pub async fn add(&self, property_id: Uuid, notes: Option<&str>) -> Result<Favorite> {
        let user = resolve_identity(self.backend.as_ref()).await?;
        let row = json!({
            "user_id": user.id.to_string(),
            "property_id": property_id.to_string(),
            "notes": notes.filter(|n| !n.is_empty()),
        });

        let rows = self
            .backend
            .insert(FAVORITES, row, &favorite_selection())
            .await?;
        let favorite: FavoriteRow = decode_single(rows, "created favorite")?;

        info!("User {} saved property {}", user.id, property_id);
        Ok(favorite.into_favorite(user.id))
    }

    pub async fn update_notes(&self, id: Uuid, notes: &str) -> Result<Favorite> {
        let user = resolve_identity(self.backend.as_ref()).await?;
        let rows = self
            .backend
            .update(
                FAVORITES,
                &[
                    Filter::eq("id", id.to_string()),
                    Filter::eq("user_id", user.id.to_string()),
                ],
                json!({ "notes": notes }),
                &favorite_selection(),
            )
            .await?;

        let favorite: FavoriteRow = decode_single(rows, &format!("favorite {}", id))?;
        Ok(favorite.into_favorite(user.id))
    }

    pub async fn remove(&self, id: Uuid) -> Result<()> {
        let user = resolve_identity(self.backend.as_ref()).await?;
        self.backend
            .delete(
                FAVORITES,
                &[
                    Filter::eq("id", id.to_string()),
                    Filter::eq("user_id", user.id.to_string()),
                ],
            )
            .await?;

        info!("User {} removed favorite {}", user.id, id);
        Ok(())
    }

    /// Whether the caller already saved this property. Check-then-add is not atomic.
    pub async fn is_favorited(&self, property_id: Uuid) -> Result<bool> {
        let user = resolve_identity(self.backend.as_ref()).await?;
        let query = Query::select(Selection::columns(&["id"]))
            .eq("user_id", user.id.to_string())
            .eq("property_id", property_id.to_string())
            .limit(1);

        let rows = self.backend.select(FAVORITES, &query).await?;
        Ok(!rows.rows.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::error::ErrorKind;
    use crate::testing::property_row;

    async fn setup() -> (Arc<MemoryBackend>, FavoritesApi, Uuid) {
        let backend = Arc::new(MemoryBackend::new());
        let row = property_row("Duplex in Lekki", 95_000_000.0, "sale", "house");
        let property_id: Uuid = row["id"].as_str().unwrap().parse().unwrap();
        backend.seed(PROPERTIES, vec![row]).await;
        backend.sign_up("ada@example.com", "secret").await.unwrap();
        (backend.clone(), FavoritesApi::new(backend), property_id)
    }

    #[tokio::test]
    async fn test_add_list_remove_round_trip() {
        let (_, favorites, property_id) = setup().await;

        let added = favorites.add(property_id, Some("near school")).await.unwrap();
        assert_eq!(added.property.as_ref().map(|p| p.id), Some(property_id));

        let listed = favorites.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, added.id);
        assert_eq!(listed[0].notes.as_deref(), Some("near school"));
        assert!(favorites.is_favorited(property_id).await.unwrap());

        favorites.remove(added.id).await.unwrap();
        assert!(favorites.list().await.unwrap().is_empty());
        assert!(!favorites.is_favorited(property_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_notes_are_absent() {
        let (backend, favorites, property_id) = setup().await;
        let added = favorites.add(property_id, Some("")).await.unwrap();

        assert_eq!(added.notes, None);
        assert_eq!(backend.rows(FAVORITES).await[0]["notes"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_update_notes() {
        let (_, favorites, property_id) = setup().await;
        let added = favorites.add(property_id, None).await.unwrap();

        let updated = favorites.update_notes(added.id, "call agent").await.unwrap();
        assert_eq!(updated.notes.as_deref(), Some("call agent"));
        assert_eq!(
            favorites.update_notes(Uuid::new_v4(), "x").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_favorites_are_scoped_to_caller() {
        let (backend, favorites, property_id) = setup().await;
        let mine = favorites.add(property_id, None).await.unwrap();

        backend.sign_up("bola@example.com", "secret").await.unwrap();
        assert!(favorites.list().await.unwrap().is_empty());

        favorites.remove(mine.id).await.unwrap();
        assert_eq!(backend.rows(FAVORITES).await.len(), 1);
    }

    #[tokio::test]
    async fn test_requires_identity() {
        let (backend, favorites, property_id) = setup().await;
        backend.sign_out().await.unwrap();

        assert_eq!(
            favorites.add(property_id, None).await.unwrap_err().kind(),
            ErrorKind::NotAuthenticated
        );
        assert_eq!(
            favorites.list().await.unwrap_err().kind(),
            ErrorKind::NotAuthenticated
        );
    }
}
