//! Cash and spot rates from the Bank of Taiwan daily CSV.

use crate::core::cache::Cache;
use crate::core::clock::Clock;
use crate::core::currency::{Currency, CurrencyQuote, ExchangeRateProvider, fallback_quotes};
use crate::providers::util::{ensure_success, trim_base};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const FEED_PATH: &str = "/xrt/flcsv/0/day";
const CACHE_KEY: &str = "TWD";

// Columns: code, "buying" label, cash buy, spot buy, ..., "selling" label at
// 11, cash sell, spot sell, ...
const COL_CURRENCY: usize = 0;
const COL_CASH_BUY: usize = 2;
const COL_SPOT_BUY: usize = 3;
const COL_CASH_SELL: usize = 12;
const COL_SPOT_SELL: usize = 13;
const MIN_COLUMNS: usize = 14;

fn cell(parts: &[&str], index: usize) -> f64 {
    parts[index].trim().parse().unwrap_or(0.0)
}

/// Extracts HKD and CNY quotes from the feed. The header row, short rows
/// and other currencies are skipped; unreadable numbers become zero.
pub fn parse_rate_csv(csv: &str, as_of: DateTime<FixedOffset>) -> Vec<CurrencyQuote> {
    csv.trim()
        .lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(',').collect();
            if parts.len() < MIN_COLUMNS {
                return None;
            }
            let currency: Currency = parts[COL_CURRENCY].trim().parse().ok()?;
            if !currency.is_foreign() {
                return None;
            }
            Some(CurrencyQuote {
                currency,
                cash_buy: cell(&parts, COL_CASH_BUY),
                cash_sell: cell(&parts, COL_CASH_SELL),
                spot_buy: cell(&parts, COL_SPOT_BUY),
                spot_sell: cell(&parts, COL_SPOT_SELL),
                as_of,
            })
        })
        .collect()
}

pub struct BankOfTaiwanProvider {
    base_url: String,
    client: reqwest::Client,
    cache: Arc<dyn Cache<String, Vec<CurrencyQuote>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl BankOfTaiwanProvider {
    pub fn new(
        base_url: &str,
        client: reqwest::Client,
        cache: Arc<dyn Cache<String, Vec<CurrencyQuote>>>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        BankOfTaiwanProvider {
            base_url: trim_base(base_url),
            client,
            cache,
            ttl,
            clock,
        }
    }

    async fn fetch_live(&self) -> Result<Vec<CurrencyQuote>> {
        let url = format!("{}{}", self.base_url, FEED_PATH);
        debug!("Requesting exchange rates from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Request error for exchange rates URL: {url}"))?;
        let csv = ensure_success(response, "Exchange rate")?
            .text()
            .await
            .context("Failed to read exchange rate feed")?;

        let quotes = parse_rate_csv(&csv, self.clock.now());
        if quotes.is_empty() {
            bail!("No supported currencies in exchange rate feed");
        }
        Ok(quotes)
    }
}

#[async_trait]
impl ExchangeRateProvider for BankOfTaiwanProvider {
    #[instrument(name = "ExchangeRateFetch", skip(self))]
    async fn fetch_quotes(&self) -> Vec<CurrencyQuote> {
        let key = CACHE_KEY.to_string();
        if let Some(cached) = self.cache.get(&key).await {
            return cached;
        }

        match self.fetch_live().await {
            Ok(quotes) => {
                self.cache.put(key, quotes.clone(), Some(self.ttl)).await;
                quotes
            }
            Err(e) => {
                warn!(error = %e, "Exchange rate feed unavailable, using fallback rates");
                fallback_quotes(self.clock.now())
            }
        }
    }
}
