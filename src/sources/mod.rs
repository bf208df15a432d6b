// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Source adapters for the affiliate network.
//!
//! Each adapter builds its own URL, calls the upstream fetcher and maps the
//! source-specific records into [`Offer`]s. Records are checked here, at the
//! boundary: an unreadable record is skipped and a record without a tracking
//! URL is dropped, so one bad entry never costs the whole batch.

mod products;
mod promotions;

pub use products::{ProductRecord, ProductSearchAdapter};
pub use promotions::{AdvertiserRecord, PromotionRecord, PromotionsAdapter};

use reqwest::Url;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::UpstreamError;
use crate::model::{ExternalId, Offer, OfferKind};

/// A single upstream record, tagged by the source that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRecord {
    Coupon(PromotionRecord),
    Product(ProductRecord),
}

impl SourceRecord {
    pub fn parse(kind: OfferKind, value: Value) -> Result<Self, serde_json::Error> {
        // Derived struct impls also accept arrays positionally.
        if !value.is_object() {
            return Err(serde_json::Error::custom("record is not a JSON object"));
        }

        match kind {
            OfferKind::Coupon => serde_json::from_value(value).map(SourceRecord::Coupon),
            OfferKind::Product => serde_json::from_value(value).map(SourceRecord::Product),
        }
    }

    /// Map into the unified shape. `None` when there is no usable tracking URL.
    pub fn into_offer(self, position: usize) -> Option<Offer> {
        match self {
            SourceRecord::Coupon(record) => record.into_offer(position),
            SourceRecord::Product(record) => record.into_offer(position),
        }
    }
}

/// Normalize a list of raw records from one source, keeping source order.
pub(crate) fn normalize(kind: OfferKind, items: Vec<Value>) -> Vec<Offer> {
    let total = items.len();
    let mut offers = Vec::with_capacity(total);

    for (position, item) in items.into_iter().enumerate() {
        let record = match SourceRecord::parse(kind, item) {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(source = kind.source(), position, %error, "skipping unreadable record");
                continue;
            }
        };

        match record.into_offer(position) {
            Some(offer) => offers.push(offer),
            None => {
                tracing::debug!(source = kind.source(), position, "dropping record without tracking url");
            }
        }
    }

    if offers.len() < total {
        tracing::info!(
            source = kind.source(),
            received = total,
            kept = offers.len(),
            "dropped unusable upstream records"
        );
    }

    offers
}

/// `<api_base>/publisher/<publisher_id>/<resource>` with the id percent-encoded.
pub(crate) fn publisher_url(api_base: &str, publisher_id: &str, resource: &str) -> Result<Url, UpstreamError> {
    let invalid = |reason: String| UpstreamError::Transport {
        message: format!("invalid affiliate api url: {}", reason),
    };

    let mut url = Url::parse(api_base).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid(format!("{api_base} cannot carry a path")))?
        .pop_if_empty()
        .extend(["publisher", publisher_id, resource]);
    Ok(url)
}

pub(crate) fn record_id(id: Option<ExternalId>, kind: OfferKind, position: usize) -> ExternalId {
    id.unwrap_or_else(|| ExternalId::positional(kind, position))
}

/// Treat a field of the wrong type as absent instead of failing the record.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
