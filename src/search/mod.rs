pub mod budget;
pub mod params;

pub use budget::{buckets_for, resolve_budget, BudgetBucket, ListingMode, PriceRange, BUDGET_BUCKETS};
pub use params::{SearchForm, SearchParams};
