// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! CupaOferta offer feed.
//!
//! Fetches promotions from joined affiliate programmes, tops them up with
//! product-search results when there are too few, and serves the merged list
//! as one cached JSON array.

pub mod aggregator;
pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod response;
pub mod sources;
pub mod upstream;

pub use aggregator::{should_query_products, OfferAggregator, FALLBACK_THRESHOLD};
pub use api::{router, AppState};
pub use model::{Offer, OfferKind};
