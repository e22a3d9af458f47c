use async_trait::async_trait;
use media_core::{CatalogError, MediaKind, MediaProvider, RawHit, Result, SearchQuery};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://pixabay.com";
const USER_AGENT: &str = "media-catalog/0.1";

/// Provider accepts 3..=200 hits per page.
pub const MIN_PER_PAGE: u32 = 3;
pub const MAX_PER_PAGE: u32 = 200;

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    hits: Vec<RawHit>,
}

/// HTTP client for the Pixabay image and video search endpoints.
#[derive(Clone)]
pub struct PixabayClient {
    client: Client,
    base: Url,
    key: String,
}

impl PixabayClient {
    pub fn new(base: &str, key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base).map_err(|e| CatalogError::Validation(format!("invalid provider url: {e}")))?;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Upstream(e.to_string()))?;
        Ok(Self { client, base, key: key.into() })
    }

    fn endpoint(&self, query: &SearchQuery) -> Result<Url> {
        let path = match query.kind {
            MediaKind::Image => "api/",
            MediaKind::Video => "api/videos/",
        };
        let mut url = self.base.join(path).map_err(|e| CatalogError::Validation(format!("invalid provider url: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("key", &self.key);
            pairs.append_pair("q", &query.q);
            if query.kind == MediaKind::Image {
                pairs.append_pair("image_type", "all");
                if let Some(orientation) = non_empty(&query.orientation) {
                    pairs.append_pair("orientation", orientation);
                }
            }
            if let Some(category) = non_empty(&query.category) {
                pairs.append_pair("category", category);
            }
            pairs.append_pair("safesearch", if query.safesearch { "true" } else { "false" });
            pairs.append_pair("per_page", &query.per_page.clamp(MIN_PER_PAGE, MAX_PER_PAGE).to_string());
        }
        Ok(url)
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[async_trait]
impl MediaProvider for PixabayClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawHit>> {
        let url = self.endpoint(query)?;
        let resp = self.client.get(url).send().await.map_err(|e| {
            tracing::warn!(error = %e, "provider request failed");
            CatalogError::Upstream(format!("provider request failed: {e}"))
        })?;
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(%status, q = %query.q, "provider returned non-success status");
            return Err(CatalogError::Upstream(format!("provider responded with status {status}")));
        }
        let envelope: SearchEnvelope = resp
            .json()
            .await
            .map_err(|e| CatalogError::Upstream(format!("invalid provider response: {e}")))?;
        tracing::debug!(q = %query.q, kind = %query.kind, hits = envelope.hits.len(), "provider search");
        Ok(envelope.hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> PixabayClient {
        PixabayClient::new("https://pixabay.example", "k3y", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn image_endpoint_carries_filters() {
        let q = SearchQuery {
            q: "red fox".into(),
            category: Some("animals".into()),
            orientation: Some("vertical".into()),
            per_page: 500,
            ..SearchQuery::default()
        };
        let url = client().endpoint(&q).unwrap();
        assert_eq!(url.path(), "/api/");
        let query = url.query().unwrap();
        assert!(query.contains("key=k3y"));
        assert!(query.contains("q=red+fox"));
        assert!(query.contains("orientation=vertical"));
        assert!(query.contains("category=animals"));
        assert!(query.contains("per_page=200"));
        assert!(query.contains("safesearch=true"));
    }

    #[test]
    fn video_endpoint_skips_image_only_params() {
        let q = SearchQuery { q: "surf".into(), kind: MediaKind::Video, orientation: Some("horizontal".into()), safesearch: false, per_page: 1, ..SearchQuery::default() };
        let url = client().endpoint(&q).unwrap();
        assert_eq!(url.path(), "/api/videos/");
        let query = url.query().unwrap();
        assert!(!query.contains("orientation"));
        assert!(!query.contains("image_type"));
        assert!(query.contains("per_page=3"));
        assert!(query.contains("safesearch=false"));
    }

    #[test]
    fn envelope_tolerates_missing_hits() {
        let env: SearchEnvelope = serde_json::from_str(r#"{"total": 0}"#).unwrap();
        assert!(env.hits.is_empty());
    }

    #[tokio::test]
    async fn unreachable_provider_is_upstream_error() {
        let c = PixabayClient::new("http://127.0.0.1:9", "k", Duration::from_millis(500)).unwrap();
        let err = c.search(&SearchQuery::default()).await.unwrap_err();
        assert!(matches!(err, CatalogError::Upstream(_)));
    }
}
