pub mod api;
pub mod cards;
pub mod filters;

pub use api::PropertyApi;
pub use cards::{CardKind, PropertyCard, Showcase, ShowcaseTab};
pub use filters::{page_count, PagedResponse, PropertyFilters, QueryPlan, Sort, DEFAULT_PAGE_SIZE};
