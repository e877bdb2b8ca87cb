//! Dashboard handlers
//!
//! GET /api/dashboard and GET /api/products/{key}/series. Ledgers are read
//! fresh on every request; nothing here writes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::models::dashboard::{
    DashboardErrorResponse, DashboardQuery, DashboardResponse, ProductSeriesResponse,
    ProductSummary,
};
use crate::services::ledger::ProductLedger;
use crate::services::sales_aggregator::{aggregate, rank_by, top_movers};
use crate::AppState;

/// How many products the dashboard highlights as fastest movers
pub const TOP_MOVERS: usize = 3;

type ApiError = (StatusCode, Json<DashboardErrorResponse>);

/// GET /api/dashboard
///
/// # Query Parameters
/// - `sort`: 24h, 7d, 30d (default: 24h)
///
/// # Response
/// - 200: Totals, sorted product cards, top movers and chart series
/// - 400: Invalid sort parameter
/// - 500: Ledger storage error
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let sort = query.validate().map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(DashboardErrorResponse {
                error: e,
                code: Some("INVALID_SORT".to_string()),
            }),
        )
    })?;

    let ledgers = load_ledgers(&state).await?;
    let catalog = aggregate(&ledgers, Utc::now());

    info!(
        sort = sort.as_str(),
        products = catalog.products.len(),
        "Dashboard aggregated"
    );

    let products = rank_by(&catalog.products, sort)
        .into_iter()
        .map(ProductSummary::from)
        .collect();
    let movers = top_movers(&catalog.products, TOP_MOVERS)
        .into_iter()
        .map(ProductSummary::from)
        .collect();

    Ok(Json(DashboardResponse {
        title: state.title.clone(),
        keyword: state.keyword.clone(),
        generated_at: catalog.generated_at,
        sort,
        totals: catalog.totals.into(),
        products,
        top_movers: movers,
        catalog_series: catalog.series,
    }))
}

/// GET /api/products/{key}/series
///
/// # Response
/// - 200: Positive-sales series for one product
/// - 404: No ledger rows for that key
/// - 500: Ledger storage error
pub async fn get_product_series(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ProductSeriesResponse>, ApiError> {
    let ledgers = load_ledgers(&state).await?;
    let catalog = aggregate(&ledgers, Utc::now());

    let Some(product) = catalog.product(&key) else {
        warn!(key = %key, "Product not found");
        return Err((
            StatusCode::NOT_FOUND,
            Json(DashboardErrorResponse {
                error: "Product not found".to_string(),
                code: Some("PRODUCT_NOT_FOUND".to_string()),
            }),
        ));
    };

    Ok(Json(ProductSeriesResponse {
        key: product.key.clone(),
        name: product.name.clone(),
        series: product.series.clone(),
    }))
}

async fn load_ledgers(state: &AppState) -> Result<Vec<ProductLedger>, ApiError> {
    let ledger = state.ledger.clone();

    let loaded = tokio::task::spawn_blocking(move || ledger.load_all())
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r.map_err(|e| e.to_string()));

    loaded.map_err(|e| {
        error!(error = %e, "Failed to load ledgers");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(DashboardErrorResponse {
                error: format!("Ledger error: {}", e),
                code: Some("LEDGER_ERROR".to_string()),
            }),
        )
    })
}
