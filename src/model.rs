// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Unified offer schema served to the storefront.
//!
//! Both upstream sources are mapped into [`Offer`]; `kind` records which
//! source an entry came from.

use serde::{Deserialize, Serialize};

/// Merchant name used when the source record carries none.
pub const PLACEHOLDER_MERCHANT: &str = "Partner";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferKind {
    Coupon,
    Product,
}

impl OfferKind {
    /// Upstream source name, used as a log field and metric label.
    pub fn source(self) -> &'static str {
        match self {
            OfferKind::Coupon => "promotions",
            OfferKind::Product => "product_search",
        }
    }
}

/// Identifier as the affiliate network sent it, number or string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalId {
    Number(serde_json::Number),
    Text(String),
}

impl ExternalId {
    /// Positional id for records the source sent without one.
    pub fn positional(kind: OfferKind, position: usize) -> Self {
        let prefix = match kind {
            OfferKind::Coupon => "coupon",
            OfferKind::Product => "product",
        };
        ExternalId::Text(format!("{prefix}-{position}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
    pub name: String,
    pub id: Option<ExternalId>,
}

impl Merchant {
    pub fn new(name: Option<String>, id: Option<ExternalId>) -> Self {
        Self {
            name: non_empty(name).unwrap_or_else(|| PLACEHOLDER_MERCHANT.to_string()),
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub kind: OfferKind,
    pub id: ExternalId,
    pub merchant: Merchant,
    pub code: Option<String>,
    pub description: String,
    pub tracking_url: String,
    pub expiry: String,
    pub logo_url: Option<String>,
}

/// Trimmed value, or `None` when missing or blank.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
