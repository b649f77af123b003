use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{invalid_input, Result};

/// Kind of property being listed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    House,
    Apartment,
    Land,
    Commercial,
}

impl PropertyType {
    pub const ALL: [PropertyType; 4] = [
        PropertyType::House,
        PropertyType::Apartment,
        PropertyType::Land,
        PropertyType::Commercial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::House => "house",
            PropertyType::Apartment => "apartment",
            PropertyType::Land => "land",
            PropertyType::Commercial => "commercial",
        }
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PropertyType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown property type '{}'", s))
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the property is offered
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Sale,
    Rent,
    Lease,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingType::Sale => "sale",
            ListingType::Rent => "rent",
            ListingType::Lease => "lease",
        }
    }
}

impl FromStr for ListingType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sale" => Ok(ListingType::Sale),
            "rent" => Ok(ListingType::Rent),
            "lease" => Ok(ListingType::Lease),
            other => Err(format!("unknown listing type '{}'", other)),
        }
    }
}

impl fmt::Display for ListingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location information for a property
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

/// Core property data model, one row of the `properties` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub property_type: PropertyType,
    pub listing_type: ListingType,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub location: Location,
    #[serde(default)]
    pub bedrooms: Option<i32>,
    #[serde(default)]
    pub bathrooms: Option<i32>,
    #[serde(default)]
    pub square_feet: Option<f64>,
    #[serde(default)]
    pub lot_size: Option<f64>,
    #[serde(default)]
    pub year_built: Option<i32>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub features: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub amenities: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<String>,
    #[serde(default)]
    pub virtual_tour: Option<String>,
    #[serde(default)]
    pub agent_id: Option<Uuid>,
    #[serde(default)]
    pub views: Option<i64>,
    #[serde(default)]
    pub parking: Option<String>,
    #[serde(default)]
    pub heating: Option<String>,
    #[serde(default)]
    pub cooling: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial property used for inserts and updates; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PropertyDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_type: Option<ListingType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub square_feet: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amenities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_tour: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parking: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooling: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

impl PropertyDraft {
    /// Reject values the listing invariants forbid
    pub fn validate(&self) -> Result<()> {
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(invalid_input(format!("price must be >= 0, got {}", price)));
            }
        }
        if matches!(&self.title, Some(t) if t.trim().is_empty()) {
            return Err(invalid_input("title must not be empty"));
        }
        Ok(())
    }
}

/// Property embedded in another resource when only a handful of columns are joined
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyRef {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Public slice of a profile, as embedded in inquiries and reviews
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileSummary {
    pub id: Uuid,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl ProfileSummary {
    /// Summary that only carries the id, used for the caller's own side of a record
    pub fn id_only(id: Uuid) -> Self {
        Self {
            id,
            first_name: None,
            last_name: None,
            email: None,
        }
    }
}

pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_flat_row_with_nulls() {
        let row = json!({
            "id": "6f1c7c8e-8f3e-4e55-9c53-1f1f0b1c2d3e",
            "title": "Plot in Lekki",
            "description": null,
            "price": 25000000,
            "property_type": "land",
            "listing_type": "sale",
            "status": null,
            "street": null,
            "city": "Lagos",
            "state": null,
            "zip_code": null,
            "country": "Nigeria",
            "features": null,
            "images": null,
            "is_featured": true,
            "is_published": true,
            "views": 3,
            "created_at": "2024-03-01T10:00:00+00:00",
            "updated_at": "2024-03-01T10:00:00.123456+00:00"
        });

        let property: Property = serde_json::from_value(row).unwrap();
        assert_eq!(property.property_type, PropertyType::Land);
        assert_eq!(property.location.city.as_deref(), Some("Lagos"));
        assert_eq!(property.location.state, None);
        assert!(property.images.is_empty());
        assert!(property.amenities.is_empty());
        assert_eq!(property.price, 25_000_000.0);
    }

    #[test]
    fn test_unknown_listing_type_is_rejected() {
        assert!("auction".parse::<ListingType>().is_err());
        assert_eq!("rent".parse::<ListingType>(), Ok(ListingType::Rent));
        assert_eq!("commercial".parse::<PropertyType>(), Ok(PropertyType::Commercial));
    }

    #[test]
    fn test_draft_skips_absent_fields() {
        let draft = PropertyDraft {
            title: Some("Duplex".to_string()),
            price: Some(1.0),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&draft).unwrap(),
            json!({"title": "Duplex", "price": 1.0})
        );
    }

    #[test]
    fn test_draft_rejects_negative_price() {
        let draft = PropertyDraft {
            price: Some(-5.0),
            ..Default::default()
        };
        assert!(draft.validate().is_err());
        assert!(PropertyDraft::default().validate().is_ok());
    }
}
