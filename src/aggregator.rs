// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Offer aggregation: promotions first, product search as a fallback.
//!
//! Source failures are isolated. A failing adapter is logged and counted as
//! zero offers; the request itself still succeeds with whatever the other
//! source produced.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::{AffiliateSettings, ProductFilters};
use crate::error::UpstreamError;
use crate::model::{Offer, OfferKind};
use crate::sources::{ProductSearchAdapter, PromotionsAdapter};
use crate::upstream::JsonFetcher;

/// Below this many coupons the product search is queried as well.
pub const FALLBACK_THRESHOLD: usize = 6;

/// Whether the product search should run after `coupon_count` coupons.
pub fn should_query_products(coupon_count: usize) -> bool {
    coupon_count < FALLBACK_THRESHOLD
}

/// What one upstream source contributed to a request.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    pub kind: OfferKind,
    pub offers: usize,
    pub failed: bool,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct Aggregation {
    pub offers: Vec<Offer>,
    pub reports: Vec<SourceReport>,
}

pub struct OfferAggregator {
    settings: AffiliateSettings,
    filters: ProductFilters,
    promotions: PromotionsAdapter,
    products: ProductSearchAdapter,
}

impl OfferAggregator {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, settings: AffiliateSettings, filters: ProductFilters) -> Self {
        Self {
            promotions: PromotionsAdapter::new(fetcher.clone(), settings.api_base.clone()),
            products: ProductSearchAdapter::new(fetcher, settings.api_base.clone()),
            settings,
            filters,
        }
    }

    pub async fn collect(&self) -> Aggregation {
        let publisher_id = self.settings.publisher_id.as_str();
        let credentials = &self.settings.credentials;
        let mut reports = Vec::with_capacity(2);

        let start = Instant::now();
        let coupons = self.promotions.fetch_coupons(publisher_id, credentials).await;
        let mut offers = settle(OfferKind::Coupon, coupons, start, &mut reports);

        if should_query_products(offers.len()) {
            tracing::debug!(
                coupons = offers.len(),
                threshold = FALLBACK_THRESHOLD,
                "too few coupons; querying product search"
            );
            let start = Instant::now();
            let products = self
                .products
                .fetch_products(publisher_id, credentials, &self.filters)
                .await;
            offers.extend(settle(OfferKind::Product, products, start, &mut reports));
        }

        Aggregation { offers, reports }
    }
}

fn settle(
    kind: OfferKind,
    result: Result<Vec<Offer>, UpstreamError>,
    start: Instant,
    reports: &mut Vec<SourceReport>,
) -> Vec<Offer> {
    let elapsed = start.elapsed();
    let (offers, failed) = match result {
        Ok(offers) => {
            tracing::debug!(source = kind.source(), offers = offers.len(), "upstream source answered");
            (offers, false)
        }
        Err(error) => {
            tracing::warn!(
                source = kind.source(),
                status = ?error.status(),
                %error,
                "upstream source failed; continuing without it"
            );
            (Vec::new(), true)
        }
    };

    reports.push(SourceReport {
        kind,
        offers: offers.len(),
        failed,
        elapsed,
    });
    offers
}
