use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use tracing::info;

use crate::{
    error::{AppError, AppResult},
    models::{NewProduct, Product, ProductFilters, UpdateProduct},
    AppState,
};

// ── List ──────────────────────────────────────────────────────────────────────

pub async fn list_products(
    State(state): State<AppState>,
    Query(filters): Query<ProductFilters>,
) -> AppResult<Json<Vec<Product>>> {
    let products = state.store.list(&filters).await;
    info!(count = products.len(), "Listed products");
    Ok(Json(products))
}

// ── Create ────────────────────────────────────────────────────────────────────

pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<NewProduct>,
) -> AppResult<(StatusCode, Json<Product>)> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".to_string()));
    }
    if payload.price < 0.0 {
        return Err(AppError::BadRequest("price must be >= 0".to_string()));
    }

    let product = state.store.create(payload).await?;
    info!(id = product.id, name = %product.name, "Created product");

    Ok((StatusCode::CREATED, Json(product)))
}

// ── Get by ID ─────────────────────────────────────────────────────────────────

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<Json<Product>> {
    let product = state.store.get(id).await?;
    Ok(Json(product))
}

// ── Update ────────────────────────────────────────────────────────────────────

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(payload): Json<UpdateProduct>,
) -> AppResult<Json<Product>> {
    if payload.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::BadRequest("name must not be empty".to_string()));
    }
    if payload.price.is_some_and(|p| p < 0.0) {
        return Err(AppError::BadRequest("price must be >= 0".to_string()));
    }

    let product = state.store.update(id, payload).await?;
    info!(id, "Updated product");

    Ok(Json(product))
}

// ── Delete ────────────────────────────────────────────────────────────────────

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<Json<serde_json::Value>> {
    state.store.delete(id).await?;
    info!(id, "Deleted product");
    Ok(Json(serde_json::json!({ "ok": true })))
}

// ── GET /api/products/export/csv ──────────────────────────────────────────────

pub async fn export_csv(State(state): State<AppState>) -> Result<Response, AppError> {
    let products = state.store.all().await;
    let csv = products_to_csv(&products)?;

    info!(count = products.len(), "Exported catalog as CSV");

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv")
        .header(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"products.csv\"",
        )
        .body(axum::body::Body::from(csv))
        .map_err(anyhow::Error::from)?)
}

/// Same column set the CSV import accepts, so an export re-imports cleanly.
fn products_to_csv(products: &[Product]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["id", "name", "price", "image", "description", "category"])?;

    for p in products {
        wtr.write_record([
            p.id.to_string(),
            p.name.clone(),
            p.price.to_string(),
            p.image.clone(),
            p.description.clone(),
            p.category.clone(),
        ])?;
    }

    let data = wtr.into_inner()?;
    Ok(String::from_utf8(data)?)
}
