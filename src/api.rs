// Copyright 2025 Memophor Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP API handlers for the offer feed.
//!
//! - `GET /api/coupons` - Merged coupon and product offers
//! - `GET /healthz` - Service health check
//! - `GET /metrics` - Prometheus metrics export
//!
//! Affiliate credentials are checked on each feed request before any
//! upstream call is made.

use std::sync::Arc;

use axum::extract::State;
use axum::http::Method;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::aggregator::OfferAggregator;
use crate::config::{AffiliateConfig, ProductFilters};
use crate::error::AppError;
use crate::metrics::Metrics;
use crate::response::{CachePolicy, OffersResponse};
use crate::upstream::JsonFetcher;

#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<dyn JsonFetcher>,
    pub affiliate: AffiliateConfig,
    pub filters: ProductFilters,
    pub cache: CachePolicy,
    pub metrics: Metrics,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/api/coupons", get(list_offers))
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health() -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": "cupaoferta",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

/// Metrics endpoint
pub async fn metrics(State(state): State<AppState>) -> Result<String, AppError> {
    state.metrics.export()
}

/// Merged offer list
pub async fn list_offers(State(state): State<AppState>) -> Result<OffersResponse, AppError> {
    state.metrics.record_feed_request();

    let settings = state.affiliate.resolve().map_err(|err| {
        state.metrics.record_config_error();
        tracing::error!(error = %err, "affiliate configuration incomplete");
        err
    })?;

    let aggregation = OfferAggregator::new(state.fetcher.clone(), settings, state.filters.clone())
        .collect()
        .await;

    for report in &aggregation.reports {
        state.metrics.record_source(report);
    }
    state.metrics.record_served(&aggregation.offers);

    tracing::info!(offers = aggregation.offers.len(), "serving offer feed");

    Ok(OffersResponse {
        offers: aggregation.offers,
        cache: state.cache,
    })
}
