//! Maeson Realty marketplace client
//!
//! Listing search, property detail, favorites, inquiries, reviews and
//! authentication on top of a hosted relational backend with an auth service.
//! Every operation is one round trip through a [`Backend`] handle that the
//! application constructs once and injects into each resource API.

pub mod account;
pub mod backend;
pub mod config;
pub mod error;
pub mod listings;
pub mod models;
pub mod search;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use crate::account::{AuthApi, FavoritesApi, InquiriesApi, ReviewsApi};
pub use crate::backend::{Backend, MemoryBackend, RestBackend};
pub use crate::config::BackendConfig;
pub use crate::error::{Error, ErrorKind, Result};
use crate::listings::PropertyApi;

/// Application root: owns the backend handle and the resource APIs sharing it
pub struct Marketplace {
    pub properties: PropertyApi,
    pub auth: AuthApi,
    pub favorites: FavoritesApi,
    pub inquiries: InquiriesApi,
    pub reviews: ReviewsApi,
}

impl Marketplace {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            properties: PropertyApi::new(backend.clone()),
            auth: AuthApi::new(backend.clone()),
            favorites: FavoritesApi::new(backend.clone()),
            inquiries: InquiriesApi::new(backend.clone()),
            reviews: ReviewsApi::new(backend),
        }
    }

    /// Marketplace over the hosted backend described by `config`
    pub fn connect(config: BackendConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(RestBackend::new(config)?)))
    }
}
