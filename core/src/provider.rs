use crate::error::Result;
use crate::model::{MediaKind, RawHit};
use async_trait::async_trait;

/// Parameters forwarded to the media provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub q: String,
    pub kind: MediaKind,
    pub category: Option<String>,
    pub orientation: Option<String>,
    pub safesearch: bool,
    pub per_page: u32,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            q: String::new(),
            kind: MediaKind::Image,
            category: None,
            orientation: None,
            safesearch: true,
            per_page: 20,
        }
    }
}

/// Third-party media search. Transport failures and non-success statuses surface as
/// [`crate::CatalogError::Upstream`].
#[async_trait]
pub trait MediaProvider: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawHit>>;
}
