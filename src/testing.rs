//! Row fixtures shared by the unit tests

use serde_json::{json, Value};
use uuid::Uuid;

pub(crate) fn property_row(title: &str, price: f64, listing_type: &str, property_type: &str) -> Value {
    json!({
        "id": Uuid::new_v4().to_string(),
        "title": title,
        "description": null,
        "price": price,
        "property_type": property_type,
        "listing_type": listing_type,
        "status": "available",
        "street": null,
        "city": "Lagos",
        "state": "Lagos",
        "zip_code": null,
        "country": "Nigeria",
        "bedrooms": 2,
        "bathrooms": 2,
        "features": [],
        "images": [],
        "is_featured": false,
        "is_published": true,
    })
}

fn located(mut row: Value, city: &str, state: Option<&str>, created_at: &str) -> Value {
    row["city"] = json!(city);
    row["state"] = json!(state);
    row["created_at"] = json!(created_at);
    row["updated_at"] = json!(created_at);
    row
}

/// A small mixed catalogue across Lagos and Abuja
pub(crate) fn seed_properties() -> Vec<Value> {
    let mut featured_duplex = located(
        property_row("Duplex in Lekki", 95_000_000.0, "sale", "house"),
        "Lekki",
        Some("Lagos"),
        "2024-05-01T09:00:00+00:00",
    );
    featured_duplex["is_featured"] = json!(true);
    featured_duplex["bedrooms"] = json!(5);

    let mut featured_flat = located(
        property_row("Serviced flat", 3_500_000.0, "rent", "apartment"),
        "Ikoyi",
        Some("Lagos"),
        "2024-04-01T09:00:00+00:00",
    );
    featured_flat["is_featured"] = json!(true);

    let mut unpublished_featured = located(
        property_row("Draft mansion", 400_000_000.0, "sale", "house"),
        "Ikoyi",
        Some("Lagos"),
        "2024-06-01T09:00:00+00:00",
    );
    unpublished_featured["is_featured"] = json!(true);
    unpublished_featured["is_published"] = json!(false);

    vec![
        featured_duplex,
        featured_flat,
        unpublished_featured,
        located(
            property_row("Plot near Abuja airport", 20_000_000.0, "sale", "land"),
            "Kuje",
            Some("FCT"),
            "2024-01-15T09:00:00+00:00",
        ),
        located(
            property_row("Maitama terrace", 150_000_000.0, "sale", "house"),
            "Abuja",
            None,
            "2024-03-10T09:00:00+00:00",
        ),
        located(
            property_row("Studio in Wuse", 1_200_000.0, "rent", "apartment"),
            "Abuja",
            Some("FCT"),
            "2024-02-20T09:00:00+00:00",
        ),
        located(
            property_row("Office floor", 60_000_000.0, "lease", "commercial"),
            "Victoria Island",
            Some("Lagos"),
            "2023-12-01T09:00:00+00:00",
        ),
    ]
}
