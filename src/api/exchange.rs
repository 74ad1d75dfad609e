use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::{ApiError, ApiResult, parse_param, required};
use crate::core::currency::{
    Conversion, ConversionDirection, Currency, CurrencyQuote, convert, convert_between,
};

#[derive(Debug, Deserialize)]
struct ConvertQuery {
    amount: Option<String>,
    direction: Option<String>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalculateQuery {
    amount: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

#[derive(Debug, Serialize)]
struct Calculation {
    amount: f64,
    from: Currency,
    to: Currency,
    result: f64,
}

async fn get_quotes(State(state): State<Arc<AppState>>) -> Json<Vec<CurrencyQuote>> {
    Json(state.rates.fetch_quotes().await)
}

async fn get_conversion(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ConvertQuery>,
) -> ApiResult<Json<Conversion>> {
    let amount: f64 = parse_param(required(&q.amount, "amount")?, "amount")?;
    let direction: ConversionDirection =
        parse_param(required(&q.direction, "direction")?, "direction")?;
    let currency = match direction {
        ConversionDirection::ToBase => {
            let currency: Currency = parse_param(required(&q.currency, "currency")?, "currency")?;
            if !currency.is_foreign() {
                return Err(ApiError::BadRequest(format!(
                    "Invalid currency parameter: {currency}"
                )));
            }
            currency
        }
        // Unused when converting from the base currency.
        ConversionDirection::FromBase => Currency::BASE,
    };

    let quotes = state.rates.fetch_quotes().await;
    Ok(Json(convert(amount, direction, currency, &quotes)))
}

async fn get_calculation(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CalculateQuery>,
) -> ApiResult<Json<Calculation>> {
    let amount: f64 = parse_param(required(&q.amount, "amount")?, "amount")?;
    let from: Currency = parse_param(required(&q.from, "from")?, "from")?;
    let to: Currency = parse_param(required(&q.to, "to")?, "to")?;

    let quotes = state.rates.fetch_quotes().await;
    Ok(Json(Calculation {
        amount,
        from,
        to,
        result: convert_between(amount, from, to, &quotes),
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/exchange", get(get_quotes))
        .route("/exchange/convert", get(get_conversion))
        .route("/exchange/calculate", get(get_calculation))
}
