//! Cash-rate currency conversion between TWD and the two trip currencies.
//!
//! Every conversion uses the quote's cash-sell rate in both directions; the
//! bid/ask spread is not modelled.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Twd,
    Hkd,
    Cny,
}

impl Currency {
    /// The currency every quote is priced in.
    pub const BASE: Currency = Currency::Twd;
    /// The foreign currencies quotes exist for.
    pub const FOREIGN: [Currency; 2] = [Currency::Hkd, Currency::Cny];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Twd => "TWD",
            Currency::Hkd => "HKD",
            Currency::Cny => "CNY",
        }
    }

    pub fn is_foreign(&self) -> bool {
        *self != Currency::BASE
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TWD" => Ok(Currency::Twd),
            "HKD" => Ok(Currency::Hkd),
            "CNY" => Ok(Currency::Cny),
            _ => Err(anyhow!("Unsupported currency: {}", s)),
        }
    }
}

/// One foreign currency priced in TWD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyQuote {
    pub currency: Currency,
    pub cash_buy: f64,
    pub cash_sell: f64,
    pub spot_buy: f64,
    pub spot_sell: f64,
    #[serde(rename = "updateTime")]
    pub as_of: DateTime<FixedOffset>,
}

/// Approximate rates served when the live feed is unavailable.
pub fn fallback_quotes(as_of: DateTime<FixedOffset>) -> Vec<CurrencyQuote> {
    vec![
        CurrencyQuote {
            currency: Currency::Hkd,
            cash_buy: 3.9,
            cash_sell: 4.1,
            spot_buy: 3.95,
            spot_sell: 4.05,
            as_of,
        },
        CurrencyQuote {
            currency: Currency::Cny,
            cash_buy: 4.3,
            cash_sell: 4.5,
            spot_buy: 4.35,
            spot_sell: 4.45,
            as_of,
        },
    ]
}

/// Source of the latest quotes.
///
/// Implementations must not fail: on upstream trouble they return
/// [`fallback_quotes`]. Callers can tell the two apart only through `as_of`
/// and the values themselves.
#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    async fn fetch_quotes(&self) -> Vec<CurrencyQuote>;
}

fn cash_sell(quotes: &[CurrencyQuote], currency: Currency) -> Option<f64> {
    quotes
        .iter()
        .find(|q| q.currency == currency)
        .map(|q| q.cash_sell)
}

fn usable(amount: f64) -> bool {
    amount.is_finite() && amount > 0.0
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Foreign amount to TWD, rounded to a whole dollar. Zero when the amount is
/// not a positive finite number or no quote exists for `currency`.
pub fn convert_to_base(amount: f64, currency: Currency, quotes: &[CurrencyQuote]) -> f64 {
    if !usable(amount) {
        return 0.0;
    }
    match cash_sell(quotes, currency) {
        Some(rate) if currency.is_foreign() => (amount * rate).round(),
        _ => 0.0,
    }
}

/// Amounts in each foreign currency, one decimal place. Serialized as
/// `{"HKD": "246.9", "CNY": "224.7"}`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ForeignAmounts {
    #[serde(rename = "HKD", serialize_with = "one_decimal")]
    pub hkd: f64,
    #[serde(rename = "CNY", serialize_with = "one_decimal")]
    pub cny: f64,
}

impl ForeignAmounts {
    pub fn get(&self, currency: Currency) -> Option<f64> {
        match currency {
            Currency::Hkd => Some(self.hkd),
            Currency::Cny => Some(self.cny),
            Currency::Twd => None,
        }
    }
}

fn one_decimal<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{value:.1}"))
}

/// TWD amount to each foreign currency. A currency without a usable quote
/// converts to zero.
pub fn convert_from_base(amount: f64, quotes: &[CurrencyQuote]) -> ForeignAmounts {
    if !usable(amount) {
        return ForeignAmounts::default();
    }
    let per = |currency| match cash_sell(quotes, currency) {
        Some(rate) if usable(rate) => round_to(amount / rate, 1),
        _ => 0.0,
    };
    ForeignAmounts {
        hkd: per(Currency::Hkd),
        cny: per(Currency::Cny),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConversionDirection {
    ToBase,
    FromBase,
}

impl FromStr for ConversionDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "toBase" | "to_base" | "to-base" => Ok(ConversionDirection::ToBase),
            "fromBase" | "from_base" | "from-base" => Ok(ConversionDirection::FromBase),
            _ => Err(anyhow!("Invalid conversion direction: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "direction", rename_all = "camelCase")]
pub enum Conversion {
    #[serde(rename_all = "camelCase")]
    ToBase {
        amount: f64,
        currency: Currency,
        result: f64,
    },
    #[serde(rename_all = "camelCase")]
    FromBase { amount: f64, results: ForeignAmounts },
}

/// Runs the transform selected by `direction`. `currency` is only consulted
/// for [`ConversionDirection::ToBase`].
pub fn convert(
    amount: f64,
    direction: ConversionDirection,
    currency: Currency,
    quotes: &[CurrencyQuote],
) -> Conversion {
    match direction {
        ConversionDirection::ToBase => Conversion::ToBase {
            amount,
            currency,
            result: convert_to_base(amount, currency, quotes),
        },
        ConversionDirection::FromBase => Conversion::FromBase {
            amount,
            results: convert_from_base(amount, quotes),
        },
    }
}

/// Any-to-any conversion through TWD, two decimal places, as the pocket
/// calculator shows it. Zero when either side lacks a quote.
pub fn convert_between(amount: f64, from: Currency, to: Currency, quotes: &[CurrencyQuote]) -> f64 {
    if !usable(amount) {
        return 0.0;
    }
    if from == to {
        return round_to(amount, 2);
    }
    let rate_of = |currency: Currency| {
        if currency.is_foreign() {
            cash_sell(quotes, currency).filter(|r| usable(*r))
        } else {
            Some(1.0)
        }
    };
    match (rate_of(from), rate_of(to)) {
        (Some(from_rate), Some(to_rate)) => round_to(amount * from_rate / to_rate, 2),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn as_of() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 1, 29, 9, 0, 0)
            .unwrap()
    }

    fn quotes() -> Vec<CurrencyQuote> {
        let mut quotes = fallback_quotes(as_of());
        quotes[0].cash_sell = 4.05;
        quotes[1].cash_sell = 4.45;
        quotes
    }

    #[test]
    fn test_convert_to_base_rounds_to_whole_units() {
        assert_eq!(convert_to_base(100.0, Currency::Hkd, &quotes()), 405.0);
        assert_eq!(convert_to_base(33.0, Currency::Cny, &quotes()), 147.0);
    }

    #[test]
    fn test_convert_to_base_rejects_bad_amounts() {
        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert_eq!(convert_to_base(amount, Currency::Hkd, &quotes()), 0.0);
        }
    }

    #[test]
    fn test_convert_to_base_missing_quote() {
        let only_hkd: Vec<_> = quotes()
            .into_iter()
            .filter(|q| q.currency == Currency::Hkd)
            .collect();
        assert_eq!(convert_to_base(100.0, Currency::Cny, &only_hkd), 0.0);
        assert_eq!(convert_to_base(100.0, Currency::Twd, &quotes()), 0.0);
    }

    #[test]
    fn test_convert_from_base_one_decimal() {
        let amounts = convert_from_base(1000.0, &quotes());
        assert_relative_eq!(amounts.hkd, 246.9);
        assert_relative_eq!(amounts.cny, 224.7);

        let json = serde_json::to_value(amounts).unwrap();
        assert_eq!(json, serde_json::json!({"HKD": "246.9", "CNY": "224.7"}));
    }

    #[test]
    fn test_convert_from_base_missing_quote_is_zero() {
        let only_cny: Vec<_> = quotes()
            .into_iter()
            .filter(|q| q.currency == Currency::Cny)
            .collect();
        let amounts = convert_from_base(1000.0, &only_cny);
        assert_eq!(amounts.hkd, 0.0);
        assert_relative_eq!(amounts.cny, 224.7);
        assert_eq!(convert_from_base(-1.0, &quotes()), ForeignAmounts::default());
    }

    #[test]
    fn test_round_trip_within_rounding() {
        let q = quotes();
        for x in [100.0, 1000.0, 2500.0, 12_345.0] {
            let hkd = convert_from_base(x, &q).hkd;
            let back = convert_to_base(hkd, Currency::Hkd, &q);
            // one-decimal rounding of the foreign amount costs at most 0.05 * rate
            assert!((back - x).abs() <= 1.0, "{x} -> {hkd} -> {back}");
        }
    }

    #[test]
    fn test_convert_dispatches_on_direction() {
        let q = quotes();
        assert_eq!(
            convert(100.0, ConversionDirection::ToBase, Currency::Hkd, &q),
            Conversion::ToBase {
                amount: 100.0,
                currency: Currency::Hkd,
                result: 405.0
            }
        );
        let json = serde_json::to_value(convert(
            1000.0,
            ConversionDirection::FromBase,
            Currency::Hkd,
            &q,
        ))
        .unwrap();
        assert_eq!(json["direction"], "fromBase");
        assert_eq!(json["results"]["CNY"], "224.7");
    }

    #[test]
    fn test_convert_between_goes_through_base() {
        let q = quotes();
        assert_relative_eq!(convert_between(100.0, Currency::Hkd, Currency::Twd, &q), 405.0);
        assert_relative_eq!(convert_between(405.0, Currency::Twd, Currency::Hkd, &q), 100.0);
        assert_relative_eq!(
            convert_between(100.0, Currency::Hkd, Currency::Cny, &q),
            91.01
        );
        assert_eq!(convert_between(100.0, Currency::Hkd, Currency::Cny, &[]), 0.0);
        assert_eq!(convert_between(12.34, Currency::Cny, Currency::Cny, &q), 12.34);
    }

    #[test]
    fn test_parsing() {
        assert_eq!("hkd".parse::<Currency>().unwrap(), Currency::Hkd);
        assert!("JPY".parse::<Currency>().is_err());
        assert_eq!(
            "fromBase".parse::<ConversionDirection>().unwrap(),
            ConversionDirection::FromBase
        );
        assert!("sideways".parse::<ConversionDirection>().is_err());
    }

    #[test]
    fn test_quote_serializes_like_the_feed_api() {
        let json = serde_json::to_value(&fallback_quotes(as_of())[0]).unwrap();
        assert_eq!(json["currency"], "HKD");
        assert_eq!(json["cashSell"], 4.1);
        assert_eq!(json["updateTime"], "2026-01-29T09:00:00+08:00");
    }
}
