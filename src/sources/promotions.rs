// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Promotions adapter: coupon and link-only promotions from joined programmes.

use std::sync::Arc;

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use super::{lenient, normalize, publisher_url, record_id};
use crate::error::UpstreamError;
use crate::model::{non_empty, ExternalId, Merchant, Offer, OfferKind};
use crate::upstream::{Credentials, JsonFetcher};

/// Expiry shown for promotions without an end date.
pub const ONGOING: &str = "ongoing";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub promotion_id: Option<ExternalId>,
    #[serde(default, deserialize_with = "lenient")]
    pub advertiser: Option<AdvertiserRecord>,
    #[serde(default, deserialize_with = "lenient")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub click_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub tracking_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvertiserRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<ExternalId>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub logo_url: Option<String>,
}

impl PromotionRecord {
    pub(crate) fn into_offer(self, position: usize) -> Option<Offer> {
        let tracking_url = non_empty(self.click_url).or_else(|| non_empty(self.tracking_url))?;

        let advertiser = self.advertiser.unwrap_or_default();
        let merchant = Merchant::new(advertiser.name, advertiser.id);
        let description = non_empty(self.title)
            .or_else(|| non_empty(self.description))
            .unwrap_or_else(|| merchant.name.clone());

        Some(Offer {
            kind: OfferKind::Coupon,
            id: record_id(self.promotion_id, OfferKind::Coupon, position),
            merchant,
            code: non_empty(self.code),
            description,
            tracking_url,
            expiry: non_empty(self.end_date).unwrap_or_else(|| ONGOING.to_string()),
            logo_url: non_empty(advertiser.logo_url),
        })
    }
}

/// Lists promotions for the programmes a publisher has joined.
#[derive(Clone)]
pub struct PromotionsAdapter {
    fetcher: Arc<dyn JsonFetcher>,
    api_base: String,
}

impl PromotionsAdapter {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, api_base: impl Into<String>) -> Self {
        Self {
            fetcher,
            api_base: api_base.into(),
        }
    }

    pub fn promotions_url(&self, publisher_id: &str) -> Result<Url, UpstreamError> {
        let mut url = publisher_url(&self.api_base, publisher_id, "promotions")?;
        url.query_pairs_mut().append_pair("relationship", "joined");
        Ok(url)
    }

    pub async fn fetch_coupons(
        &self,
        publisher_id: &str,
        credentials: &Credentials,
    ) -> Result<Vec<Offer>, UpstreamError> {
        let url = self.promotions_url(publisher_id)?;
        let body = self.fetcher.fetch_json(url.as_str(), credentials).await?;

        let Value::Array(items) = body else {
            tracing::warn!(source = OfferKind::Coupon.source(), "promotions body is not a list; treating as empty");
            return Ok(Vec::new());
        };

        Ok(normalize(OfferKind::Coupon, items))
    }
}
