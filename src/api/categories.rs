//! Category endpoints. Listing is public; creating a category requires an access cookie.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection, rejection::PathRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ResultExt, required};
use crate::auth::Auth;
use crate::db::{CreateCategoryError, Database};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct CategoriesState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(CategoriesState);

pub fn router(state: CategoriesState) -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/{id}", get(get_category))
        .with_state(state)
}

#[derive(Deserialize)]
struct CreateCategoryRequest {
    name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCategoryResponse {
    message: &'static str,
    category_id: i64,
}

async fn create_category(
    State(state): State<CategoriesState>,
    Auth(user): Auth,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(|_| ApiError::bad_request("Invalid request body."))?;
    let name = required(payload.name)
        .ok_or_else(|| ApiError::bad_request("Category name is required."))?;

    let category_id = match state.db.categories().create(name.trim()).await {
        Ok(id) => id,
        Err(CreateCategoryError::Duplicate) => {
            return Err(ApiError::conflict("Category already exists!"));
        }
        Err(CreateCategoryError::Database(e)) => {
            return Err(ApiError::db_error("Failed to create category", e));
        }
    };

    info!(category_id, user_id = user.id(), "Category created");

    Ok((
        StatusCode::CREATED,
        Json(CreateCategoryResponse {
            message: "Category created successfully!",
            category_id,
        }),
    ))
}

async fn list_categories(
    State(state): State<CategoriesState>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .db
        .categories()
        .list()
        .await
        .db_err("Failed to list categories")?;
    Ok(Json(categories))
}

async fn get_category(
    State(state): State<CategoriesState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path.map_err(|_| ApiError::bad_request("Invalid category id."))?;

    let category = state
        .db
        .categories()
        .get_by_id(id)
        .await
        .db_err("Failed to get category")?
        .ok_or_else(|| ApiError::not_found("Category not found."))?;

    Ok(Json(category))
}
