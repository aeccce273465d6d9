//! HTTP handlers for price history and invoice import

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::external::invoice::ExtractedInvoice;
use crate::external::InvoiceExtractionClient;
use crate::middleware::CurrentUser;
use crate::services::pricing::{PriceRecord, PricingService, RecordPriceInput, ResolvedPrice};
use crate::AppState;

/// Record a purchase price
pub async fn record_price(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordPriceInput>,
) -> AppResult<(StatusCode, Json<PriceRecord>)> {
    let service = PricingService::new(state.db);
    let record = service.record_price(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Price history of an ingredient, newest first
pub async fn get_price_history(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<Json<Vec<PriceRecord>>> {
    let service = PricingService::new(state.db);
    let history = service
        .price_history(current_user.0.user_id, ingredient_id)
        .await?;
    Ok(Json(history))
}

/// Current resolved price of an ingredient
pub async fn get_current_price(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<Json<ResolvedPrice>> {
    let service = PricingService::new(state.db);
    let price = service
        .current_price(current_user.0.user_id, ingredient_id)
        .await?;
    Ok(Json(price))
}

#[derive(Deserialize)]
pub struct ExtractInvoiceRequest {
    pub image_url: String,
}

/// Extract structured data from a photographed invoice.
///
/// The result is returned for operator review; confirmed items are then
/// saved one by one through the record-price endpoint.
pub async fn extract_invoice(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(body): Json<ExtractInvoiceRequest>,
) -> AppResult<Json<ExtractedInvoice>> {
    let client = InvoiceExtractionClient::new(
        state.config.extraction.api_endpoint.clone(),
        state.config.extraction.api_key.clone(),
    );
    let invoice = client.extract_invoice(&body.image_url).await?;
    Ok(Json(invoice))
}
