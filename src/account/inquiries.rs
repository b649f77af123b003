use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::account::auth::{resolve_identity, PROFILES};
use crate::backend::{decode_rows, decode_single, Backend, Embed, Filter, Order, Query, Selection};
use crate::error::Result;
use crate::listings::api::PROPERTIES;
use crate::models::{ProfileSummary, Property};

pub const INQUIRIES: &str = "inquiries";

pub const STATUS_NEW: &str = "new";
pub const DEFAULT_INQUIRY_TYPE: &str = "general";
pub const DEFAULT_CONTACT_METHOD: &str = "email";

const SENDER_FKEY: &str = "inquiries_sender_id_fkey";
const RECIPIENT_FKEY: &str = "inquiries_recipient_id_fkey";
const PARTY_COLUMNS: [&str; 4] = ["id", "first_name", "last_name", "email"];
const INQUIRY_COLUMNS: [&str; 11] = [
    "id",
    "name",
    "email",
    "phone",
    "message",
    "inquiry_type",
    "preferred_contact_method",
    "status",
    "response",
    "responded_at",
    "created_at",
];

/// Which counterpart profile(s) to join onto an inquiry
#[derive(Debug, Clone, Copy)]
enum Parties {
    Sender,
    Recipient,
    Both,
}

fn inquiry_selection(parties: Parties) -> Selection {
    let sender = Embed::new("sender", PROFILES, "sender_id")
        .hint(SENDER_FKEY)
        .columns(&PARTY_COLUMNS);
    let recipient = Embed::new("recipient", PROFILES, "recipient_id")
        .hint(RECIPIENT_FKEY)
        .columns(&PARTY_COLUMNS);

    let selection = Selection::columns(&INQUIRY_COLUMNS)
        .embed(Embed::new("property", PROPERTIES, "property_id"));
    match parties {
        Parties::Sender => selection.embed(sender),
        Parties::Recipient => selection.embed(recipient),
        Parties::Both => selection.embed(sender).embed(recipient),
    }
}

#[derive(Debug, Deserialize)]
struct InquiryRow {
    id: Uuid,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    message: String,
    inquiry_type: String,
    preferred_contact_method: String,
    status: String,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    responded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    property: Option<Property>,
    #[serde(default)]
    sender: Option<ProfileSummary>,
    #[serde(default)]
    recipient: Option<ProfileSummary>,
}

/// Message from a prospective buyer or tenant to a property's agent
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Inquiry {
    pub id: Uuid,
    pub property: Option<Property>,
    pub sender: Option<ProfileSummary>,
    /// Absent when the property has no owning agent
    pub recipient: Option<ProfileSummary>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub inquiry_type: String,
    pub preferred_contact_method: String,
    /// `new`, then whatever the recipient sets (e.g. `responded`, `closed`)
    pub status: String,
    pub response: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<InquiryRow> for Inquiry {
    fn from(row: InquiryRow) -> Self {
        Inquiry {
            id: row.id,
            property: row.property,
            sender: row.sender,
            recipient: row.recipient,
            name: row.name.unwrap_or_default(),
            email: row.email.unwrap_or_default(),
            phone: row.phone.filter(|p| !p.is_empty()),
            message: row.message,
            inquiry_type: row.inquiry_type,
            preferred_contact_method: row.preferred_contact_method,
            status: row.status,
            response: row.response.filter(|r| !r.is_empty()),
            responded_at: row.responded_at,
            created_at: row.created_at,
        }
    }
}

/// Input for a new inquiry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInquiry {
    pub property_id: Uuid,
    pub message: String,
    pub inquiry_type: Option<String>,
    pub preferred_contact_method: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PropertyOwner {
    #[serde(default)]
    agent_id: Option<Uuid>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

pub struct InquiriesApi {
    backend: Arc<dyn Backend>,
}

impl InquiriesApi {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Send an inquiry to the agent owning the property.
    /// The owner lookup and the insert are two separate round trips.
    pub async fn create(&self, inquiry: &NewInquiry) -> Result<Inquiry> {
        let user = resolve_identity(self.backend.as_ref()).await?;

        let owner_query = Query::select(Selection::columns(&["id", "agent_id"]))
            .eq("id", inquiry.property_id.to_string())
            .limit(1);
        let rows = self.backend.select(PROPERTIES, &owner_query).await?;
        let owner: PropertyOwner =
            decode_single(rows.rows, &format!("property {}", inquiry.property_id))?;

        let row = json!({
            "property_id": inquiry.property_id.to_string(),
            "sender_id": user.id.to_string(),
            "recipient_id": owner.agent_id.map(|id| id.to_string()),
            "name": non_empty(&inquiry.name),
            "email": non_empty(&inquiry.email),
            "phone": non_empty(&inquiry.phone),
            "message": inquiry.message,
            "inquiry_type": non_empty(&inquiry.inquiry_type).unwrap_or(DEFAULT_INQUIRY_TYPE),
            "preferred_contact_method": non_empty(&inquiry.preferred_contact_method)
                .unwrap_or(DEFAULT_CONTACT_METHOD),
            "status": STATUS_NEW,
        });

        let rows = self
            .backend
            .insert(INQUIRIES, row, &inquiry_selection(Parties::Recipient))
            .await?;
        let created: InquiryRow = decode_single(rows, "created inquiry")?;

        let mut created = Inquiry::from(created);
        created.sender = Some(ProfileSummary::id_only(user.id));

        info!(
            "User {} sent inquiry {} about property {}",
            user.id, created.id, inquiry.property_id
        );
        Ok(created)
    }

    /// Inquiries the caller sent, newest first
    pub async fn sent(&self) -> Result<Vec<Inquiry>> {
        let user = resolve_identity(self.backend.as_ref()).await?;
        let query = Query::select(inquiry_selection(Parties::Recipient))
            .eq("sender_id", user.id.to_string())
            .order(Order::desc("created_at"));

        let rows = self.backend.select(INQUIRIES, &query).await?;
        let inquiries: Vec<InquiryRow> = decode_rows(rows.rows)?;
        Ok(inquiries
            .into_iter()
            .map(|row| {
                let mut inquiry = Inquiry::from(row);
                inquiry.sender = Some(ProfileSummary::id_only(user.id));
                inquiry
            })
            .collect())
    }

    /// Inquiries addressed to the caller, newest first
    pub async fn received(&self) -> Result<Vec<Inquiry>> {
        let user = resolve_identity(self.backend.as_ref()).await?;
        let query = Query::select(inquiry_selection(Parties::Sender))
            .eq("recipient_id", user.id.to_string())
            .order(Order::desc("created_at"));

        let rows = self.backend.select(INQUIRIES, &query).await?;
        let inquiries: Vec<InquiryRow> = decode_rows(rows.rows)?;
        Ok(inquiries
            .into_iter()
            .map(|row| {
                let mut inquiry = Inquiry::from(row);
                inquiry.recipient = Some(ProfileSummary::id_only(user.id));
                inquiry
            })
            .collect())
    }

    /// Set the status; `responded_at` is stamped only when a response is given
    pub async fn update_status(
        &self,
        id: Uuid,
        status: &str,
        response: Option<&str>,
    ) -> Result<Inquiry> {
        resolve_identity(self.backend.as_ref()).await?;

        let response = response.filter(|r| !r.is_empty());
        let patch = json!({
            "status": status,
            "response": response,
            "responded_at": response.map(|_| Utc::now().to_rfc3339()),
        });

        let rows = self
            .backend
            .update(
                INQUIRIES,
                &[Filter::eq("id", id.to_string())],
                patch,
                &inquiry_selection(Parties::Both),
            )
            .await?;
        let updated: InquiryRow = decode_single(rows, &format!("inquiry {}", id))?;

        info!("Inquiry {} moved to status '{}'", id, status);
        Ok(updated.into())
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        resolve_identity(self.backend.as_ref()).await?;
        self.backend
            .delete(INQUIRIES, &[Filter::eq("id", id.to_string())])
            .await?;
        Ok(())
    }
}
