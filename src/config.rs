use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{ensure, Context, Result};

use crate::error::AppError;
use crate::response::CachePolicy;
use crate::upstream::Credentials;

pub const DEFAULT_API_BASE: &str = "https://api.awin.com";
pub const DEFAULT_USER_AGENT: &str = "CupaOferta-App/1.0";

pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub upstream: UpstreamConfig,
    pub affiliate: AffiliateConfig,
    pub filters: ProductFilters,
    pub cache: CachePolicy,
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub user_agent: String,
    pub timeout: Duration,
}

/// Affiliate account settings as found in the environment.
///
/// Token and publisher id stay optional here; they are checked on every
/// request by [`AffiliateConfig::resolve`] so the service can boot without
/// them and answer with a coded error instead.
#[derive(Debug, Clone, Default)]
pub struct AffiliateConfig {
    pub api_base: String,
    pub api_token: Option<String>,
    pub api_key: Option<String>,
    pub publisher_id: Option<String>,
}

/// Validated affiliate settings handed to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffiliateSettings {
    pub api_base: String,
    pub publisher_id: String,
    pub credentials: Credentials,
}

/// Product-search filters sent with the fallback query.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFilters {
    pub region: String,
    pub currency: String,
    pub min_price: Option<f64>,
    pub limit: u32,
}

impl Default for ProductFilters {
    fn default() -> Self {
        Self {
            region: "BR".to_string(),
            currency: "BRL".to_string(),
            min_price: None,
            limit: 20,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let listen_addr: SocketAddr = env::var("CUPAOFERTA_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("invalid CUPAOFERTA_ADDR")?;

        let upstream = UpstreamConfig {
            user_agent: non_blank("CUPAOFERTA_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            timeout: Duration::from_secs(parse_u64("CUPAOFERTA_UPSTREAM_TIMEOUT_SECONDS", 10)?),
        };

        let affiliate = AffiliateConfig {
            api_base: non_blank("AWIN_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_token: non_blank("AWIN_API_TOKEN"),
            api_key: non_blank("AWIN_API_KEY"),
            publisher_id: non_blank("AWIN_PUBLISHER_ID"),
        };

        let defaults = ProductFilters::default();
        let min_price = parse_min_price(non_blank("CUPAOFERTA_PRODUCT_MIN_PRICE"))?;
        let filters = ProductFilters {
            region: non_blank("CUPAOFERTA_PRODUCT_REGION").unwrap_or(defaults.region),
            currency: non_blank("CUPAOFERTA_PRODUCT_CURRENCY").unwrap_or(defaults.currency),
            min_price,
            limit: parse_u64("CUPAOFERTA_PRODUCT_LIMIT", u64::from(defaults.limit))?
                .try_into()
                .context("CUPAOFERTA_PRODUCT_LIMIT is out of range")?,
        };

        let cache = CachePolicy {
            s_maxage: parse_u64("CUPAOFERTA_CACHE_SECONDS", 3600)?,
            stale_while_revalidate: Some(parse_u64("CUPAOFERTA_STALE_SECONDS", 59)?)
                .filter(|secs| *secs > 0),
        };

        Ok(Self {
            listen_addr,
            upstream,
            affiliate,
            filters,
            cache,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }
}

impl AffiliateConfig {
    /// Check that the token and publisher id are present.
    ///
    /// The secondary key falls back to the bearer token when absent.
    pub fn resolve(&self) -> Result<AffiliateSettings, AppError> {
        let mut missing = Vec::new();
        if self.api_token.is_none() {
            missing.push("AWIN_API_TOKEN");
        }
        if self.publisher_id.is_none() {
            missing.push("AWIN_PUBLISHER_ID");
        }

        match (&self.api_token, &self.publisher_id) {
            (Some(token), Some(publisher_id)) => Ok(AffiliateSettings {
                api_base: self.api_base.trim_end_matches('/').to_string(),
                publisher_id: publisher_id.clone(),
                credentials: Credentials::new(token.clone(), self.api_key.clone()),
            }),
            _ => Err(AppError::ConfigMissing(missing)),
        }
    }
}

fn non_blank(env_key: &str) -> Option<String> {
    env::var(env_key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_u64(env_key: &str, default: u64) -> Result<u64> {
    let raw = env::var(env_key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse()
        .with_context(|| format!("{env_key} must be a non-negative integer"))
}

fn parse_min_price(raw: Option<String>) -> Result<Option<f64>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value: f64 = raw
        .parse()
        .context("CUPAOFERTA_PRODUCT_MIN_PRICE must be a number")?;
    // f64 parsing accepts "NaN" and "inf"; neither is a price.
    ensure!(
        value.is_finite() && value >= 0.0,
        "CUPAOFERTA_PRODUCT_MIN_PRICE must be a finite, non-negative number (got {raw})"
    );
    Ok(Some(value))
}
