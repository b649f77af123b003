use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::account::auth::{resolve_identity, PROFILES};
use crate::backend::{decode_rows, decode_single, Backend, Embed, Filter, Order, Query, Selection};
use crate::error::{invalid_input, Result};
use crate::listings::api::PROPERTIES;
use crate::models::{ProfileSummary, PropertyRef};

pub const REVIEWS: &str = "reviews";

fn review_selection() -> Selection {
    Selection::columns(&["id", "rating", "title", "comment", "is_approved", "created_at"])
        .embed(Embed::new("property", PROPERTIES, "property_id").columns(&["id", "title", "city", "state"]))
        .embed(Embed::new("user", PROFILES, "user_id").columns(&["id", "first_name", "last_name", "email"]))
}

/// Rating and comment left on a property
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub id: Uuid,
    #[serde(default)]
    pub property: Option<PropertyRef>,
    #[serde(default)]
    pub user: Option<ProfileSummary>,
    pub rating: u8,
    pub title: String,
    pub comment: String,
    #[serde(default)]
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Approved reviews of one property with their aggregate
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PropertyReviews {
    pub reviews: Vec<Review>,
    /// Mean rating rounded to one decimal; 0 when there are no reviews
    pub average_rating: f64,
    pub count: usize,
}

/// Rating, title and comment of a review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewContent {
    pub rating: u8,
    pub title: String,
    pub comment: String,
}

impl ReviewContent {
    fn validate(&self) -> Result<()> {
        if !(1..=5).contains(&self.rating) {
            return Err(invalid_input(format!(
                "rating must be between 1 and 5, got {}",
                self.rating
            )));
        }
        if self.title.trim().is_empty() {
            return Err(invalid_input("review title must not be empty"));
        }
        Ok(())
    }
}

pub fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let sum: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    let mean = f64::from(sum) / reviews.len() as f64;
    (mean * 10.0).round() / 10.0
}

pub struct ReviewsApi {
    backend: Arc<dyn Backend>,
}

impl ReviewsApi {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Public: approved reviews of a property, newest first
    pub async fn for_property(&self, property_id: Uuid) -> Result<PropertyReviews> {
        let query = Query::select(review_selection())
            .eq("property_id", property_id.to_string())
            .eq("is_approved", true)
            .order(Order::desc("created_at"));

        let rows = self.backend.select(REVIEWS, &query).await?;
        let reviews: Vec<Review> = decode_rows(rows.rows)?;

        Ok(PropertyReviews {
            average_rating: average_rating(&reviews),
            count: reviews.len(),
            reviews,
        })
    }

    /// New reviews start unapproved
    pub async fn create(&self, property_id: Uuid, content: &ReviewContent) -> Result<Review> {
        let user = resolve_identity(self.backend.as_ref()).await?;
        content.validate()?;

        let row = json!({
            "property_id": property_id.to_string(),
            "user_id": user.id.to_string(),
            "rating": content.rating,
            "title": content.title,
            "comment": content.comment,
            "is_approved": false,
        });
        let rows = self
            .backend
            .insert(REVIEWS, row, &review_selection())
            .await?;
        let review: Review = decode_single(rows, "created review")?;

        info!("User {} reviewed property {}", user.id, property_id);
        Ok(review)
    }

    /// Reviews written by the caller, newest first
    pub async fn mine(&self) -> Result<Vec<Review>> {
        let user = resolve_identity(self.backend.as_ref()).await?;
        let query = Query::select(review_selection())
            .eq("user_id", user.id.to_string())
            .order(Order::desc("created_at"));

        let rows = self.backend.select(REVIEWS, &query).await?;
        decode_rows(rows.rows)
    }

    pub async fn update(&self, id: Uuid, content: &ReviewContent) -> Result<Review> {
        let user = resolve_identity(self.backend.as_ref()).await?;
        content.validate()?;

        let rows = self
            .backend
            .update(
                REVIEWS,
                &[
                    Filter::eq("id", id.to_string()),
                    Filter::eq("user_id", user.id.to_string()),
                ],
                serde_json::to_value(content)?,
                &review_selection(),
            )
            .await?;
        decode_single(rows, &format!("review {}", id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let user = resolve_identity(self.backend.as_ref()).await?;
        self.backend
            .delete(
                REVIEWS,
                &[
                    Filter::eq("id", id.to_string()),
                    Filter::eq("user_id", user.id.to_string()),
                ],
            )
            .await
    }
}
