use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::listings::PropertyFilters;
use crate::models::{ListingType, PropertyType};
use crate::search::budget::{find_bucket, resolve_budget, ListingMode};

/// Query parameters handed from the search form to the listing page.
/// Every field is optional and travels string-encoded in the URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchParams {
    /// Free text, matched against title, city and state
    pub location: Option<String>,
    pub listing_type: Option<ListingType>,
    pub property_type: Option<PropertyType>,
    /// Minimum number of bedrooms
    pub bedrooms: Option<u32>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
}

impl SearchParams {
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());

        if let Some(location) = &self.location {
            serializer.append_pair("location", location);
        }
        if let Some(listing_type) = self.listing_type {
            serializer.append_pair("listingType", listing_type.as_str());
        }
        if let Some(property_type) = self.property_type {
            serializer.append_pair("propertyType", property_type.as_str());
        }
        if let Some(bedrooms) = self.bedrooms {
            serializer.append_pair("bedrooms", &bedrooms.to_string());
        }
        if let Some(min) = self.min_price {
            serializer.append_pair("minPrice", &min.to_string());
        }
        if let Some(max) = self.max_price {
            serializer.append_pair("maxPrice", &max.to_string());
        }

        serializer.finish()
    }

    /// Lenient decode: unknown keys, blanks and unparseable values are dropped
    pub fn from_query_string(query: &str) -> Self {
        let mut params = Self::default();

        for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "location" => params.location = Some(value.to_string()),
                "listingType" => params.listing_type = value.parse().ok(),
                "propertyType" => params.property_type = value.parse().ok(),
                "bedrooms" => params.bedrooms = value.parse().ok(),
                "minPrice" => params.min_price = value.parse().ok(),
                "maxPrice" => params.max_price = value.parse().ok(),
                _ => {}
            }
        }

        params
    }

    pub fn into_filters(self) -> PropertyFilters {
        PropertyFilters {
            search: self.location,
            listing_type: self.listing_type,
            property_type: self.property_type,
            min_bedrooms: self.bedrooms,
            min_price: self.min_price.map(|p| p as f64),
            max_price: self.max_price.map(|p| p as f64),
            ..Default::default()
        }
    }
}

/// State of the hero search form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchForm {
    mode: ListingMode,
    budget: Option<&'static str>,
    pub location: String,
    pub property_type: Option<PropertyType>,
    pub bedrooms: Option<u32>,
}

impl SearchForm {
    pub fn new(mode: ListingMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> ListingMode {
        self.mode
    }

    pub fn budget(&self) -> Option<&'static str> {
        self.budget
    }

    /// Switching between buy and rent clears the budget, whose keys are mode-specific
    pub fn set_mode(&mut self, mode: ListingMode) {
        if self.mode != mode {
            self.mode = mode;
            self.budget = None;
        }
    }

    /// Select a bucket offered in the current mode; returns false and leaves the
    /// budget unchanged otherwise
    pub fn select_budget(&mut self, key: &str) -> bool {
        match find_bucket(key) {
            Some(bucket) if bucket.mode == self.mode => {
                self.budget = Some(bucket.key);
                true
            }
            _ => false,
        }
    }

    pub fn clear_budget(&mut self) {
        self.budget = None;
    }

    pub fn to_params(&self) -> SearchParams {
        let location = self.location.trim();
        let range = self.budget.map(resolve_budget).unwrap_or_default();

        SearchParams {
            location: (!location.is_empty()).then(|| location.to_string()),
            listing_type: Some(self.mode.listing_type()),
            property_type: self.property_type,
            bedrooms: self.bedrooms,
            min_price: range.min,
            max_price: range.max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_to_query_string() {
        let mut form = SearchForm::new(ListingMode::Rent);
        form.location = " Lagos Island ".to_string();
        form.bedrooms = Some(2);
        assert!(form.select_budget("rent-3m-6m"));

        assert_eq!(
            form.to_params().to_query_string(),
            "location=Lagos+Island&listingType=rent&bedrooms=2&minPrice=3000000&maxPrice=6000000"
        );
    }

    #[test]
    fn test_listing_type_always_present() {
        let form = SearchForm::default();
        assert_eq!(form.to_params().to_query_string(), "listingType=sale");
    }

    #[test]
    fn test_switching_mode_clears_budget() {
        let mut form = SearchForm::new(ListingMode::Buy);
        assert!(form.select_budget("buy-under-50m"));
        assert!(!form.select_budget("rent-1m-3m"));
        assert_eq!(form.budget(), Some("buy-under-50m"));

        form.set_mode(ListingMode::Rent);
        assert_eq!(form.budget(), None);
        assert_eq!(form.to_params().max_price, None);
    }

    #[test]
    fn test_decode_is_lenient() {
        let params = SearchParams::from_query_string(
            "?location=Abuja&listingType=rent&propertyType=castle&bedrooms=three&minPrice=300000&page=2",
        );
        assert_eq!(params.location.as_deref(), Some("Abuja"));
        assert_eq!(params.listing_type, Some(ListingType::Rent));
        assert_eq!(params.property_type, None);
        assert_eq!(params.bedrooms, None);
        assert_eq!(params.min_price, Some(300_000));
        assert_eq!(params.max_price, None);
    }

    #[test]
    fn test_params_become_filters() {
        let filters = SearchParams::from_query_string(
            "location=Lekki&listingType=sale&propertyType=house&bedrooms=3&maxPrice=50000000",
        )
        .into_filters();

        assert_eq!(filters.search.as_deref(), Some("Lekki"));
        assert_eq!(filters.listing_type, Some(ListingType::Sale));
        assert_eq!(filters.property_type, Some(PropertyType::House));
        assert_eq!(filters.min_bedrooms, Some(3));
        assert_eq!(filters.max_price, Some(50_000_000.0));
        assert_eq!(filters.min_price, None);
        assert_eq!(filters.page(), 1);
    }
}
