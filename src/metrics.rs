// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metrics collection for the offer feed.
//!
//! Tracks per-source upstream health and what the feed hands out.

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;

use crate::aggregator::SourceReport;
use crate::error::AppError;
use crate::model::{Offer, OfferKind};

/// Metrics collector for the offer feed
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,

    // Request metrics
    pub feed_requests: IntCounter,
    pub config_errors: IntCounter,
    pub offers_served: IntCounterVec,

    // Upstream metrics
    pub upstream_requests: IntCounterVec,
    pub upstream_failures: IntCounterVec,
    pub upstream_latency: HistogramVec,
}

fn metric_error(e: prometheus::Error) -> AppError {
    AppError::Internal(anyhow::anyhow!("Failed to create metric: {}", e))
}

impl Metrics {
    pub fn new() -> Result<Self, AppError> {
        let registry = Registry::new();

        let feed_requests = IntCounter::with_opts(Opts::new(
            "cupaoferta_feed_requests_total",
            "Total number of offer feed requests",
        ))
        .map_err(metric_error)?;

        let config_errors = IntCounter::with_opts(Opts::new(
            "cupaoferta_config_errors_total",
            "Requests rejected because affiliate configuration is missing",
        ))
        .map_err(metric_error)?;

        let offers_served = IntCounterVec::new(
            Opts::new("cupaoferta_offers_served_total", "Offers returned to clients"),
            &["kind"],
        )
        .map_err(metric_error)?;

        let upstream_requests = IntCounterVec::new(
            Opts::new(
                "cupaoferta_upstream_requests_total",
                "Upstream calls made, by source",
            ),
            &["source"],
        )
        .map_err(metric_error)?;

        let upstream_failures = IntCounterVec::new(
            Opts::new(
                "cupaoferta_upstream_failures_total",
                "Upstream calls that failed and were treated as empty, by source",
            ),
            &["source"],
        )
        .map_err(metric_error)?;

        let upstream_latency = HistogramVec::new(
            HistogramOpts::new(
                "cupaoferta_upstream_latency_seconds",
                "Duration of upstream calls in seconds",
            )
            .buckets(vec![
                0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.0, 5.0, 10.0,
            ]),
            &["source"],
        )
        .map_err(metric_error)?;

        registry.register(Box::new(feed_requests.clone())).map_err(metric_error)?;
        registry.register(Box::new(config_errors.clone())).map_err(metric_error)?;
        registry.register(Box::new(offers_served.clone())).map_err(metric_error)?;
        registry.register(Box::new(upstream_requests.clone())).map_err(metric_error)?;
        registry.register(Box::new(upstream_failures.clone())).map_err(metric_error)?;
        registry.register(Box::new(upstream_latency.clone())).map_err(metric_error)?;

        Ok(Self {
            registry: Arc::new(registry),
            feed_requests,
            config_errors,
            offers_served,
            upstream_requests,
            upstream_failures,
            upstream_latency,
        })
    }

    pub fn record_feed_request(&self) {
        self.feed_requests.inc();
    }

    pub fn record_config_error(&self) {
        self.config_errors.inc();
    }

    /// Record one upstream call from its aggregation report
    pub fn record_source(&self, report: &SourceReport) {
        let source = report.kind.source();
        self.upstream_requests.with_label_values(&[source]).inc();
        if report.failed {
            self.upstream_failures.with_label_values(&[source]).inc();
        }
        self.upstream_latency
            .with_label_values(&[source])
            .observe(report.elapsed.as_secs_f64());
    }

    pub fn record_served(&self, offers: &[Offer]) {
        for kind in [OfferKind::Coupon, OfferKind::Product] {
            let count = offers.iter().filter(|o| o.kind == kind).count();
            let label = match kind {
                OfferKind::Coupon => "coupon",
                OfferKind::Product => "product",
            };
            self.offers_served
                .with_label_values(&[label])
                .inc_by(count as u64);
        }
    }

    /// Export metrics in Prometheus format
    pub fn export(&self) -> Result<String, AppError> {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode metrics: {}", e)))?;

        String::from_utf8(buffer).map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "Failed to convert metrics to string: {}",
                e
            ))
        })
    }
}
