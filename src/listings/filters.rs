//! Filter-to-query translation for the listing page
//!
//! A [`PropertyFilters`] value becomes an ordered list of clauses, one sort
//! directive and a 1-indexed page window. Applying the clauses conjunctively,
//! then the sort, then slicing `[(page-1)*size, page*size)` yields the page.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::backend::{Filter, Order, Query, RowRange, Selection};
use crate::models::{ListingType, PropertyType};

pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const CREATED_AT: &str = "created_at";

/// Sort requested by the listing page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Sort {
    #[default]
    Newest,
    Oldest,
    Column { column: String, ascending: bool },
}

impl FromStr for Sort {
    type Err = String;

    /// `newest`, `oldest`, or `<column>[:<direction>]` where only `desc` is descending
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err("empty sort key".to_string()),
            "newest" => Ok(Sort::Newest),
            "oldest" => Ok(Sort::Oldest),
            other => {
                let mut parts = other.splitn(2, ':');
                let column = parts.next().unwrap_or_default();
                if column.is_empty() {
                    return Err(format!("missing sort column in '{}'", other));
                }
                Ok(Sort::Column {
                    column: column.to_string(),
                    ascending: parts.next() != Some("desc"),
                })
            }
        }
    }
}

impl Sort {
    pub fn to_order(&self) -> Order {
        match self {
            Sort::Newest => Order::desc(CREATED_AT),
            Sort::Oldest => Order::asc(CREATED_AT),
            Sort::Column { column, ascending } => Order {
                column: column.clone(),
                ascending: *ascending,
            },
        }
    }
}

/// Optional facets of the listing page; `None` means no constraint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFilters {
    pub property_type: Option<PropertyType>,
    pub listing_type: Option<ListingType>,
    pub status: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_bedrooms: Option<u32>,
    pub min_bathrooms: Option<u32>,
    pub search: Option<String>,
    pub sort: Option<Sort>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Clauses, sort and page window for one listing request
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub filters: Vec<Filter>,
    pub order: Order,
    pub page: u32,
    pub page_size: u32,
}

impl QueryPlan {
    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.page_size as usize
    }

    pub fn range(&self) -> RowRange {
        let from = self.offset();
        RowRange {
            from,
            to: from + self.page_size as usize - 1,
        }
    }

    pub fn to_query(&self) -> Query {
        let range = self.range();
        let mut query = Query::select(Selection::all())
            .order(self.order.clone())
            .range(range.from, range.to)
            .exact_count();
        query.filters = self.filters.clone();
        query
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl PropertyFilters {
    /// 1-indexed page; zero is treated as absent
    pub fn page(&self) -> u32 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.filter(|s| *s > 0).unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn to_plan(&self) -> QueryPlan {
        let mut filters = vec![Filter::eq("is_published", true)];

        if let Some(listing_type) = self.listing_type {
            filters.push(Filter::eq("listing_type", listing_type.as_str()));
        }
        if let Some(property_type) = self.property_type {
            filters.push(Filter::eq("property_type", property_type.as_str()));
        }
        if let Some(status) = present(&self.status) {
            filters.push(Filter::eq("status", status));
        }
        if let Some(city) = present(&self.city) {
            filters.push(Filter::contains("city", city));
        }
        if let Some(state) = present(&self.state) {
            filters.push(Filter::contains("state", state));
        }
        if let Some(min) = self.min_price {
            filters.push(Filter::gte("price", min));
        }
        if let Some(max) = self.max_price {
            filters.push(Filter::lte("price", max));
        }
        if let Some(bedrooms) = self.min_bedrooms {
            filters.push(Filter::gte("bedrooms", bedrooms));
        }
        if let Some(bathrooms) = self.min_bathrooms {
            filters.push(Filter::gte("bathrooms", bathrooms));
        }
        if let Some(term) = present(&self.search) {
            filters.push(Filter::Or(vec![
                Filter::contains("title", term),
                Filter::contains("city", term),
                Filter::contains("state", term),
            ]));
        }

        QueryPlan {
            filters,
            order: self.sort.clone().unwrap_or_default().to_order(),
            page: self.page(),
            page_size: self.page_size(),
        }
    }
}

/// `max(1, ceil(total / page_size))`
pub fn page_count(total: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    total.div_ceil(size).max(1) as u32
}

/// One page of results plus pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PagedResponse<T> {
    /// Items on this page
    pub count: usize,
    /// Items matching across all pages
    pub total: u64,
    pub page: u32,
    pub pages: u32,
    pub data: Vec<T>,
}

impl<T> PagedResponse<T> {
    pub fn new(data: Vec<T>, total: u64, page: u32, page_size: u32) -> Self {
        Self {
            count: data.len(),
            total,
            page,
            pages: page_count(total, page_size),
            data,
        }
    }
}
