//! Staff JSON API for categories and locations
//!
//! Mounted under `/admin/api` behind [`super::middleware::require_staff`].

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::models::{
    CatalogFilter, Category, CreateCategoryInput, CreateLocationInput, Location,
    UpdateCategoryInput, UpdateLocationInput,
};
use crate::services::CatalogServiceError;

use super::middleware::{ApiError, AppState};

impl From<CatalogServiceError> for ApiError {
    fn from(err: CatalogServiceError) -> Self {
        match err {
            CatalogServiceError::NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            CatalogServiceError::ValidationError(message) => ApiError::validation_error(message),
            CatalogServiceError::Conflict(message) => ApiError::conflict(message),
            CatalogServiceError::InternalError(e) => {
                tracing::error!("Catalog error: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError::validation_error(e.body_text()))
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category)
                .put(update_category)
                .patch(update_category)
                .delete(delete_category),
        )
        .route("/locations", get(list_locations).post(create_location))
        .route(
            "/locations/{id}",
            get(get_location)
                .put(update_location)
                .patch(update_location)
                .delete(delete_location),
        )
}

// ============================================================================
// Categories
// ============================================================================

/// GET /admin/api/categories
async fn list_categories(
    State(state): State<AppState>,
    Query(filter): Query<CatalogFilter>,
) -> Result<Json<ListResponse<Category>>, ApiError> {
    let categories = state.catalog_service.list_categories(&filter).await?;
    Ok(Json(categories.into()))
}

/// GET /admin/api/categories/{id}
async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.catalog_service.get_category(id).await?))
}

/// POST /admin/api/categories
async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<CreateCategoryInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let category = state.catalog_service.create_category(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(category)).into_response())
}

/// PUT/PATCH /admin/api/categories/{id}
async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateCategoryInput>, JsonRejection>,
) -> Result<Json<Category>, ApiError> {
    let category = state
        .catalog_service
        .update_category(id, body(payload)?)
        .await?;
    Ok(Json(category))
}

/// DELETE /admin/api/categories/{id}
async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.catalog_service.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Locations
// ============================================================================

/// GET /admin/api/locations
async fn list_locations(
    State(state): State<AppState>,
    Query(filter): Query<CatalogFilter>,
) -> Result<Json<ListResponse<Location>>, ApiError> {
    let locations = state.catalog_service.list_locations(&filter).await?;
    Ok(Json(locations.into()))
}

/// GET /admin/api/locations/{id}
async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Location>, ApiError> {
    Ok(Json(state.catalog_service.get_location(id).await?))
}

/// POST /admin/api/locations
async fn create_location(
    State(state): State<AppState>,
    payload: Result<Json<CreateLocationInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let location = state.catalog_service.create_location(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(location)).into_response())
}

/// PUT/PATCH /admin/api/locations/{id}
async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateLocationInput>, JsonRejection>,
) -> Result<Json<Location>, ApiError> {
    let location = state
        .catalog_service
        .update_location(id, body(payload)?)
        .await?;
    Ok(Json(location))
}

/// DELETE /admin/api/locations/{id}
async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.catalog_service.delete_location(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
