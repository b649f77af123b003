//! Listing-card view models
//!
//! Pure, total mapping from a property row to what a card displays.

use serde::Serialize;
use uuid::Uuid;

use crate::models::{ListingType, Property, PropertyType};

pub const LAND_PLACEHOLDER_IMAGE: &str = "https://images.unsplash.com/photo-1441974231531-c6227db76b6e?crop=entropy&cs=tinysrgb&fit=max&fm=jpg&q=80&w=1080";

/// Cards revealed per "load more" step on the featured showcase
pub const SHOWCASE_STEP: usize = 6;

/// Badge shown on a card; land wins over the listing type
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Buy,
    Rent,
    Lease,
    Land,
}

impl CardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardKind::Buy => "buy",
            CardKind::Rent => "rent",
            CardKind::Lease => "lease",
            CardKind::Land => "land",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PropertyCard {
    pub id: Uuid,
    pub title: String,
    pub location: String,
    pub price: String,
    pub kind: CardKind,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area: String,
    pub image: Option<String>,
    pub images: Vec<String>,
    pub is_new: bool,
}

impl PropertyCard {
    pub fn from_property(property: &Property) -> Self {
        let is_land = property.property_type == PropertyType::Land;

        let kind = match (is_land, property.listing_type) {
            (true, _) => CardKind::Land,
            (false, ListingType::Sale) => CardKind::Buy,
            (false, ListingType::Rent) => CardKind::Rent,
            (false, ListingType::Lease) => CardKind::Lease,
        };

        let mut price = format_naira(property.price);
        if property.listing_type == ListingType::Rent {
            price.push_str("/yr");
        }

        let images = if property.images.is_empty() && is_land {
            vec![LAND_PLACEHOLDER_IMAGE.to_string()]
        } else {
            property.images.clone()
        };

        Self {
            id: property.id,
            title: property.title.clone(),
            location: location_label(
                property.location.city.as_deref(),
                property.location.state.as_deref(),
            ),
            price,
            kind,
            bedrooms: property.bedrooms.unwrap_or(0),
            bathrooms: property.bathrooms.unwrap_or(0),
            area: property
                .square_feet
                .map(|sqft| format!("{} sqft", sqft))
                .unwrap_or_default(),
            image: images.first().cloned(),
            images,
            is_new: property.is_featured,
        }
    }
}

/// `"city, state"`, dropping the comma when state is absent
pub fn location_label(city: Option<&str>, state: Option<&str>) -> String {
    let mut label = city.unwrap_or_default().to_string();
    if let Some(state) = state.filter(|s| !s.is_empty()) {
        label.push_str(", ");
        label.push_str(state);
    }
    label
}

/// Naira amount with thousands separators and up to two decimals, e.g. `₦1,200,000`
pub fn format_naira(amount: f64) -> String {
    let kobo = (amount.abs() * 100.0).round() as u64;
    let whole = kobo / 100;
    let fraction = kobo % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 && kobo > 0 { "-" } else { "" };
    if fraction == 0 {
        format!("{}₦{}", sign, grouped)
    } else {
        let decimals = format!("{:02}", fraction);
        format!("{}₦{}.{}", sign, grouped, decimals.trim_end_matches('0'))
    }
}

/// Tabs of the featured-properties section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowcaseTab {
    Buy,
    Rent,
}

/// Featured properties split into sale and rent tabs, revealed in steps
#[derive(Debug, Clone, Default)]
pub struct Showcase {
    pub sale: Vec<PropertyCard>,
    pub rent: Vec<PropertyCard>,
}

impl Showcase {
    pub fn from_featured(properties: &[Property]) -> Self {
        let cards_for = |listing_type| {
            properties
                .iter()
                .filter(|p| p.listing_type == listing_type)
                .map(PropertyCard::from_property)
                .collect()
        };

        Self {
            sale: cards_for(ListingType::Sale),
            rent: cards_for(ListingType::Rent),
        }
    }

    fn tab(&self, tab: ShowcaseTab) -> &[PropertyCard] {
        match tab {
            ShowcaseTab::Buy => &self.sale,
            ShowcaseTab::Rent => &self.rent,
        }
    }

    /// First `shown` cards of a tab
    pub fn visible(&self, tab: ShowcaseTab, shown: usize) -> &[PropertyCard] {
        let cards = self.tab(tab);
        &cards[..shown.min(cards.len())]
    }

    pub fn has_more(&self, tab: ShowcaseTab, shown: usize) -> bool {
        shown < self.tab(tab).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::property_row;
    use serde_json::json;

    fn property(row: serde_json::Value) -> Property {
        let mut row = row;
        row["created_at"] = json!("2024-01-01T00:00:00+00:00");
        row["updated_at"] = json!("2024-01-01T00:00:00+00:00");
        serde_json::from_value(row).unwrap()
    }

    #[test]
    fn test_rent_card_without_state() {
        let mut row = property_row("Mini flat", 1_200_000.0, "rent", "apartment");
        row["state"] = json!(null);
        let card = PropertyCard::from_property(&property(row));

        assert_eq!(card.location, "Lagos");
        assert_eq!(card.price, "₦1,200,000/yr");
        assert!(card.price.ends_with("/yr"));
        assert_eq!(card.kind, CardKind::Rent);
        assert_eq!(card.image, None);
    }

    #[test]
    fn test_land_overrides_listing_type_and_gets_placeholder() {
        let mut row = property_row("Plot", 20_000_000.0, "sale", "land");
        row["bedrooms"] = json!(null);
        row["square_feet"] = json!(6500);
        let card = PropertyCard::from_property(&property(row));

        assert_eq!(card.kind, CardKind::Land);
        assert_eq!(card.price, "₦20,000,000");
        assert_eq!(card.image.as_deref(), Some(LAND_PLACEHOLDER_IMAGE));
        assert_eq!(card.images.len(), 1);
        assert_eq!(card.bedrooms, 0);
        assert_eq!(card.area, "6500 sqft");
    }

    #[test]
    fn test_sale_card_uses_first_image() {
        let mut row = property_row("Duplex", 95_000_000.0, "sale", "house");
        row["images"] = json!(["a.jpg", "b.jpg"]);
        row["is_featured"] = json!(true);
        row["city"] = json!(null);
        let card = PropertyCard::from_property(&property(row));

        assert_eq!(card.kind, CardKind::Buy);
        assert_eq!(card.image.as_deref(), Some("a.jpg"));
        assert_eq!(card.location, ", Lagos");
        assert!(card.is_new);
        assert_eq!(card.area, "");
    }

    #[test]
    fn test_format_naira() {
        assert_eq!(format_naira(0.0), "₦0");
        assert_eq!(format_naira(999.0), "₦999");
        assert_eq!(format_naira(1000.0), "₦1,000");
        assert_eq!(format_naira(1234567.5), "₦1,234,567.5");
        assert_eq!(format_naira(10.05), "₦10.05");
    }

    #[test]
    fn test_showcase_steps() {
        let properties: Vec<Property> = (0..8)
            .map(|i| property(property_row(&format!("Flat {}", i), 1.0, "rent", "apartment")))
            .chain(std::iter::once(property(property_row(
                "Office",
                1.0,
                "lease",
                "commercial",
            ))))
            .collect();

        let showcase = Showcase::from_featured(&properties);
        assert!(showcase.sale.is_empty());
        assert_eq!(showcase.rent.len(), 8);

        assert_eq!(showcase.visible(ShowcaseTab::Rent, SHOWCASE_STEP).len(), 6);
        assert!(showcase.has_more(ShowcaseTab::Rent, SHOWCASE_STEP));
        assert_eq!(
            showcase.visible(ShowcaseTab::Rent, SHOWCASE_STEP * 2).len(),
            8
        );
        assert!(!showcase.has_more(ShowcaseTab::Rent, SHOWCASE_STEP * 2));
        assert!(showcase.visible(ShowcaseTab::Buy, SHOWCASE_STEP).is_empty());
    }
}
