use crate::account::auth::resolve_identity;
use crate::backend::{decode_rows, decode_single, Backend, Filter, Order, Query, Selection};
use crate::error::Result;
use crate::listings::filters::{PagedResponse, PropertyFilters, CREATED_AT};
use crate::models::{Property, PropertyDraft};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub const PROPERTIES: &str = "properties";

/// Property listings resource
pub struct PropertyApi {
    backend: Arc<dyn Backend>,
}

impl PropertyApi {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// One page of published properties matching the filters
    pub async fn list(&self, filters: &PropertyFilters) -> Result<PagedResponse<Property>> {
        let plan = filters.to_plan();
        debug!("Listing properties with {} clauses", plan.filters.len());

        let rows = self.backend.select(PROPERTIES, &plan.to_query()).await?;
        let total = rows.total.unwrap_or(0);
        let data: Vec<Property> = decode_rows(rows.rows)?;

        info!(
            "Page {} of properties: {} items, {} total",
            plan.page,
            data.len(),
            total
        );
        Ok(PagedResponse::new(data, total, plan.page, plan.page_size))
    }

    pub async fn get(&self, id: Uuid) -> Result<Property> {
        let query = Query::select(Selection::all())
            .eq("id", id.to_string())
            .limit(1);
        let rows = self.backend.select(PROPERTIES, &query).await?;
        decode_single(rows.rows, &format!("property {}", id))
    }

    /// Featured and published, newest first
    pub async fn featured(&self) -> Result<Vec<Property>> {
        let query = Query::select(Selection::all())
            .eq("is_featured", true)
            .eq("is_published", true)
            .order(Order::desc(CREATED_AT));
        let rows = self.backend.select(PROPERTIES, &query).await?;
        decode_rows(rows.rows)
    }

    /// Create a listing owned by the caller unless the draft names an agent
    pub async fn create(&self, mut draft: PropertyDraft) -> Result<Property> {
        let user = resolve_identity(self.backend.as_ref()).await?;
        draft.validate()?;
        draft.agent_id.get_or_insert(user.id);

        let rows = self
            .backend
            .insert(PROPERTIES, serde_json::to_value(&draft)?, &Selection::all())
            .await?;
        let property: Property = decode_single(rows, "created property")?;

        info!("Created property {} for agent {}", property.id, user.id);
        Ok(property)
    }

    pub async fn update(&self, id: Uuid, draft: &PropertyDraft) -> Result<Property> {
        resolve_identity(self.backend.as_ref()).await?;
        draft.validate()?;

        let rows = self
            .backend
            .update(
                PROPERTIES,
                &[Filter::eq("id", id.to_string())],
                serde_json::to_value(draft)?,
                &Selection::all(),
            )
            .await?;
        decode_single(rows, &format!("property {}", id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        resolve_identity(self.backend.as_ref()).await?;
        self.backend
            .delete(PROPERTIES, &[Filter::eq("id", id.to_string())])
            .await?;
        info!("Deleted property {}", id);
        Ok(())
    }

    /// Replace the image list with already-uploaded image URLs
    pub async fn set_images(&self, id: Uuid, urls: &[String]) -> Result<Property> {
        resolve_identity(self.backend.as_ref()).await?;

        let rows = self
            .backend
            .update(
                PROPERTIES,
                &[Filter::eq("id", id.to_string())],
                json!({ "images": urls }),
                &Selection::all(),
            )
            .await?;
        decode_single(rows, &format!("property {}", id))
    }
}
