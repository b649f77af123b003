use serde::{Deserialize, Serialize};

use crate::models::ListingType;

/// Buy/rent toggle of the search form
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListingMode {
    #[default]
    Buy,
    Rent,
}

impl ListingMode {
    pub fn listing_type(&self) -> ListingType {
        match self {
            ListingMode::Buy => ListingType::Sale,
            ListingMode::Rent => ListingType::Rent,
        }
    }
}

/// Price bounds; `None` on both sides means no constraint
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
}

impl PriceRange {
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Named price range offered instead of raw numeric entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetBucket {
    pub key: &'static str,
    pub mode: ListingMode,
    pub label: &'static str,
    pub range: PriceRange,
}

const fn bucket(
    key: &'static str,
    mode: ListingMode,
    label: &'static str,
    min: Option<u64>,
    max: Option<u64>,
) -> BudgetBucket {
    BudgetBucket {
        key,
        mode,
        label,
        range: PriceRange { min, max },
    }
}

pub static BUDGET_BUCKETS: [BudgetBucket; 7] = [
    bucket("buy-under-50m", ListingMode::Buy, "Under ₦50M", None, Some(50_000_000)),
    bucket("buy-50m-100m", ListingMode::Buy, "₦50M - ₦100M", Some(50_000_000), Some(100_000_000)),
    bucket("buy-100m-plus", ListingMode::Buy, "₦100M+", Some(100_000_000), None),
    bucket("rent-300k-1m", ListingMode::Rent, "₦300k - ₦1M /yr", Some(300_000), Some(1_000_000)),
    bucket("rent-1m-3m", ListingMode::Rent, "₦1M - ₦3M /yr", Some(1_000_000), Some(3_000_000)),
    bucket("rent-3m-6m", ListingMode::Rent, "₦3M - ₦6M /yr", Some(3_000_000), Some(6_000_000)),
    bucket("rent-6m-plus", ListingMode::Rent, "₦6M+ /yr", Some(6_000_000), None),
];

pub fn find_bucket(key: &str) -> Option<&'static BudgetBucket> {
    BUDGET_BUCKETS.iter().find(|b| b.key == key)
}

/// Price range for a bucket key; unknown or empty keys impose no constraint
pub fn resolve_budget(key: &str) -> PriceRange {
    find_bucket(key).map(|b| b.range).unwrap_or_default()
}

/// Buckets the form offers in the given mode
pub fn buckets_for(mode: ListingMode) -> impl Iterator<Item = &'static BudgetBucket> {
    BUDGET_BUCKETS.iter().filter(move |b| b.mode == mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_buckets() {
        assert_eq!(
            resolve_budget("buy-under-50m"),
            PriceRange {
                min: None,
                max: Some(50_000_000)
            }
        );
        assert_eq!(
            resolve_budget("rent-3m-6m"),
            PriceRange {
                min: Some(3_000_000),
                max: Some(6_000_000)
            }
        );
        assert_eq!(resolve_budget("buy-100m-plus").max, None);
    }

    #[test]
    fn test_unknown_key_is_unbounded() {
        assert!(resolve_budget("").is_unbounded());
        assert!(resolve_budget("rent-1b-plus").is_unbounded());
        assert_eq!(
            serde_json::to_value(resolve_budget("nope")).unwrap(),
            serde_json::json!({})
        );
    }

    #[test]
    fn test_mode_key_spaces_are_disjoint() {
        let buy: Vec<_> = buckets_for(ListingMode::Buy).map(|b| b.key).collect();
        let rent: Vec<_> = buckets_for(ListingMode::Rent).map(|b| b.key).collect();

        assert_eq!(buy.len(), 3);
        assert_eq!(rent.len(), 4);
        assert!(buy.iter().all(|k| !rent.contains(k)));
        assert!(buy.iter().all(|k| k.starts_with("buy-")));
    }
}
