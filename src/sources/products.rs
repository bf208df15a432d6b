// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Product-search adapter, queried when promotions alone come back thin.

use std::sync::Arc;

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use super::{lenient, normalize, publisher_url, record_id};
use crate::config::ProductFilters;
use crate::error::UpstreamError;
use crate::model::{non_empty, ExternalId, Merchant, Offer, OfferKind};
use crate::upstream::{Credentials, JsonFetcher};

/// Products have no redemption code; this literal stands in for one.
pub const PRODUCT_CODE: &str = "OFFER";
pub const WHILE_STOCKS_LAST: &str = "while stocks last";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub product_id: Option<ExternalId>,
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<ExternalId>,
    #[serde(default, deserialize_with = "lenient")]
    pub product_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub price: Option<Price>,
    #[serde(default, deserialize_with = "lenient")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub merchant_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub merchant_id: Option<ExternalId>,
    #[serde(default, deserialize_with = "lenient")]
    pub deep_link: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub aw_deep_link: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub large_image: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub merchant_logo: Option<String>,
}

/// Listed price; some feeds send it as a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Price {
    Amount(f64),
    Text(String),
}

impl Price {
    pub fn amount(&self) -> Option<f64> {
        let amount = match self {
            Price::Amount(value) => Some(*value),
            Price::Text(text) => text.trim().parse::<f64>().ok(),
        };
        amount.filter(|value| value.is_finite())
    }
}

impl ProductRecord {
    pub(crate) fn into_offer(self, position: usize) -> Option<Offer> {
        let tracking_url = non_empty(self.deep_link).or_else(|| non_empty(self.aw_deep_link))?;

        let merchant = Merchant::new(self.merchant_name, self.merchant_id);
        let name = non_empty(self.product_name).or_else(|| non_empty(self.name));
        let price = self.price.as_ref().and_then(Price::amount);
        let description = describe(name, price, non_empty(self.currency))
            .unwrap_or_else(|| merchant.name.clone());

        Some(Offer {
            kind: OfferKind::Product,
            id: record_id(self.product_id.or(self.id), OfferKind::Product, position),
            merchant,
            code: Some(PRODUCT_CODE.to_string()),
            description,
            tracking_url,
            expiry: WHILE_STOCKS_LAST.to_string(),
            logo_url: non_empty(self.large_image).or_else(|| non_empty(self.merchant_logo)),
        })
    }
}

fn describe(name: Option<String>, price: Option<f64>, currency: Option<String>) -> Option<String> {
    let name = name?;
    Some(match (price, currency) {
        (Some(price), Some(currency)) => format!("{name} - {currency} {price:.2}"),
        (Some(price), None) => format!("{name} - {price:.2}"),
        (None, _) => name,
    })
}

/// Searches the product catalogue of joined advertisers.
#[derive(Clone)]
pub struct ProductSearchAdapter {
    fetcher: Arc<dyn JsonFetcher>,
    api_base: String,
}

impl ProductSearchAdapter {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, api_base: impl Into<String>) -> Self {
        Self {
            fetcher,
            api_base: api_base.into(),
        }
    }

    pub fn products_url(&self, publisher_id: &str, filters: &ProductFilters) -> Result<Url, UpstreamError> {
        let mut params = vec![
            ("region", filters.region.clone()),
            ("currency", filters.currency.clone()),
        ];
        if let Some(min_price) = filters.min_price {
            params.push(("minPrice", min_price.to_string()));
        }
        params.push(("limit", filters.limit.to_string()));

        let mut url = publisher_url(&self.api_base, publisher_id, "products")?;
        url.query_pairs_mut().extend_pairs(&params);
        Ok(url)
    }

    pub async fn fetch_products(
        &self,
        publisher_id: &str,
        credentials: &Credentials,
        filters: &ProductFilters,
    ) -> Result<Vec<Offer>, UpstreamError> {
        let url = self.products_url(publisher_id, filters)?;
        let body = self.fetcher.fetch_json(url.as_str(), credentials).await?;

        let items = match body {
            Value::Object(mut map) => match map.remove("products") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        if items.is_empty() {
            tracing::debug!(source = OfferKind::Product.source(), "no products in search response");
        }

        Ok(normalize(OfferKind::Product, items))
    }
}
