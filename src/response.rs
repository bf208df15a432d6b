//! Final response shaping: status, JSON body and edge cache directives.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::model::Offer;

/// Advisory edge caching for successful offer lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub s_maxage: u64,
    pub stale_while_revalidate: Option<u64>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            s_maxage: 3600,
            stale_while_revalidate: Some(59),
        }
    }
}

impl CachePolicy {
    pub fn header_value(&self) -> String {
        match self.stale_while_revalidate {
            Some(secs) => format!("s-maxage={}, stale-while-revalidate={}", self.s_maxage, secs),
            None => format!("s-maxage={}, stale-while-revalidate", self.s_maxage),
        }
    }
}

/// A 200 with the merged offer list, possibly empty.
pub struct OffersResponse {
    pub offers: Vec<Offer>,
    pub cache: CachePolicy,
}

impl IntoResponse for OffersResponse {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::OK, Json(self.offers)).into_response();
        if let Ok(value) = HeaderValue::from_str(&self.cache.header_value()) {
            response.headers_mut().insert(header::CACHE_CONTROL, value);
        }
        response
    }
}
