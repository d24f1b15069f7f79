use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::AppState;
use super::error::{ApiError, ApiResult};
use crate::core::{CurrencyCode, StoreError, Summary};

const UPDATED_DETAIL: &str = "The number of currencies has been successfully updated.";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/{currency}/get/", get(get_currency))
        .route("/amount/get/", get(get_amount))
        .route("/amount/set/", post(set_amount))
        .route("/modify/", post(modify_amount))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AmountResponse {
    pub name: CurrencyCode,
    pub value: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AmountUpdateResponse {
    pub detail: String,
}

impl AmountUpdateResponse {
    fn updated() -> Self {
        AmountUpdateResponse {
            detail: UPDATED_DETAIL.to_string(),
        }
    }
}

/// Request body for set and modify: currency code → amount. Null entries are
/// left untouched.
pub type AmountUpdateRequest = BTreeMap<CurrencyCode, Option<Decimal>>;

fn ensure_tracked(tracked: &BTreeSet<CurrencyCode>, code: &CurrencyCode) -> ApiResult<()> {
    if tracked.contains(code) {
        Ok(())
    } else {
        Err(StoreError::UnsupportedCurrency(code.clone()).into())
    }
}

fn collect_amounts(
    tracked: &BTreeSet<CurrencyCode>,
    request: AmountUpdateRequest,
) -> ApiResult<BTreeMap<CurrencyCode, Decimal>> {
    let mut amounts = BTreeMap::new();
    for (code, amount) in request {
        ensure_tracked(tracked, &code)?;
        if let Some(amount) = amount {
            amounts.insert(code, amount);
        }
    }
    Ok(amounts)
}

/// GET `/{currency}/get/` - Balance of one currency.
async fn get_currency(
    State(state): State<AppState>,
    Path(currency): Path<String>,
) -> ApiResult<Json<AmountResponse>> {
    let code = CurrencyCode::new(&currency);
    ensure_tracked(&state.tracked, &code)?;
    let value = state.store.get_balance(&code).await?;
    Ok(Json(AmountResponse { name: code, value }))
}

/// GET `/amount/get/` - Balances, pair rates and totals.
async fn get_amount(State(state): State<AppState>) -> Json<Summary> {
    Json(state.store.summary().await)
}

/// POST `/amount/set/` - Absolute balances.
async fn set_amount(
    State(state): State<AppState>,
    Json(request): Json<AmountUpdateRequest>,
) -> ApiResult<Json<AmountUpdateResponse>> {
    let amounts = collect_amounts(&state.tracked, request)?;
    if let Some((code, _)) = amounts.iter().find(|(_, amount)| **amount < Decimal::ZERO) {
        return Err(ApiError::BadRequest(format!(
            "The amount of currency cannot be less than zero: {code}"
        )));
    }
    debug!(?amounts, "Setting balances");
    state.store.set_balances(amounts).await;
    Ok(Json(AmountUpdateResponse::updated()))
}

/// POST `/modify/` - Relative balance changes, applied all-or-nothing.
async fn modify_amount(
    State(state): State<AppState>,
    Json(request): Json<AmountUpdateRequest>,
) -> ApiResult<Json<AmountUpdateResponse>> {
    let deltas = collect_amounts(&state.tracked, request)?;
    debug!(?deltas, "Modifying balances");
    state.store.modify_balances(deltas).await?;
    Ok(Json(AmountUpdateResponse::updated()))
}
