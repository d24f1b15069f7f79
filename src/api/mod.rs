//! HTTP surface over the balance store.

pub mod error;
pub mod routes;

use axum::Router;
use std::collections::BTreeSet;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::core::{BalanceStore, CurrencyCode};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<BalanceStore>,
    /// Currencies requests may refer to.
    pub tracked: Arc<BTreeSet<CurrencyCode>>,
}

impl AppState {
    pub fn new(store: Arc<BalanceStore>, tracked: BTreeSet<CurrencyCode>) -> Self {
        AppState {
            store,
            tracked: Arc::new(tracked),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
