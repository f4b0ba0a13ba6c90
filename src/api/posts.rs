//! Job listing endpoints.
//!
//! Reads are public. Creating, editing and deleting require an access
//! cookie, and edits are limited to the listing's owner.

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

use super::MessageResponse;
use super::error::{ApiError, ResultExt, required};
use crate::auth::Auth;
use crate::db::{Database, NewPost, Post};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

/// State for posts endpoints.
#[derive(Clone)]
pub struct PostsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(PostsState);

pub fn router(state: PostsState) -> Router {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/get-user-posts", get(list_user_posts))
        .route(
            "/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .with_state(state)
}

// --- Request/Response types ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostRequest {
    title: Option<String>,
    content: Option<String>,
    price: Option<f64>,
    category_id: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostResponse {
    id: i64,
    user_id: i64,
    category_id: Option<i64>,
    title: String,
    content: String,
    price: f64,
    created_at: String,
    updated_at: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            user_id: post.user_id,
            category_id: post.category_id,
            title: post.title,
            content: post.content,
            price: post.price,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePostResponse {
    message: &'static str,
    post_id: i64,
}

// --- Helpers ---

fn post_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::bad_request("Invalid post id."))
}

/// Validate a create/update body and check that any referenced category exists.
async fn validate(
    db: &Database,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> Result<NewPost, ApiError> {
    let Json(payload) = payload.map_err(|_| ApiError::bad_request("Invalid request body."))?;

    let (Some(title), Some(content), Some(price)) = (
        required(payload.title),
        required(payload.content),
        payload.price,
    ) else {
        return Err(ApiError::bad_request(
            "Title, content and price are required.",
        ));
    };

    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::bad_request("Price must be a non-negative number."));
    }

    if let Some(category_id) = payload.category_id {
        db.categories()
            .get_by_id(category_id)
            .await
            .db_err("Failed to get category")?
            .ok_or_else(|| ApiError::bad_request("Category not found."))?;
    }

    Ok(NewPost {
        title: title.trim().to_string(),
        content,
        price,
        category_id: payload.category_id,
    })
}

/// Fetch a post and confirm the caller owns it.
async fn owned_post(db: &Database, id: i64, user_id: i64) -> Result<Post, ApiError> {
    let post = db
        .posts()
        .get_by_id(id)
        .await
        .db_err("Failed to get post")?
        .ok_or_else(|| ApiError::not_found("Post not found."))?;

    if post.user_id != user_id {
        return Err(ApiError::forbidden("You can only modify your own posts."));
    }
    Ok(post)
}

// --- Handlers ---

async fn list_posts(State(state): State<PostsState>) -> Result<impl IntoResponse, ApiError> {
    let posts = state
        .db
        .posts()
        .list_all()
        .await
        .db_err("Failed to list posts")?;

    Ok(Json(
        posts.into_iter().map(PostResponse::from).collect::<Vec<_>>(),
    ))
}

async fn list_user_posts(
    State(state): State<PostsState>,
    Auth(user): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state
        .db
        .posts()
        .list_by_user(user.id())
        .await
        .db_err("Failed to list posts")?;

    Ok(Json(
        posts.into_iter().map(PostResponse::from).collect::<Vec<_>>(),
    ))
}

async fn get_post(
    State(state): State<PostsState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = post_id(path)?;

    let post = state
        .db
        .posts()
        .get_by_id(id)
        .await
        .db_err("Failed to get post")?
        .ok_or_else(|| ApiError::not_found("Post not found."))?;

    Ok(Json(PostResponse::from(post)))
}

async fn create_post(
    State(state): State<PostsState>,
    Auth(user): Auth,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let new_post = validate(&state.db, payload).await?;

    let post_id = state
        .db
        .posts()
        .create(user.id(), &new_post)
        .await
        .db_err("Failed to create post")?;

    info!(post_id, user_id = user.id(), "Post created");

    Ok((
        StatusCode::CREATED,
        Json(CreatePostResponse {
            message: "Post created successfully!",
            post_id,
        }),
    ))
}

async fn update_post(
    State(state): State<PostsState>,
    Auth(user): Auth,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = post_id(path)?;
    owned_post(&state.db, id, user.id()).await?;
    let new_post = validate(&state.db, payload).await?;

    let updated = state
        .db
        .posts()
        .update(id, user.id(), &new_post)
        .await
        .db_err("Failed to update post")?;

    // Deleted between the ownership check and the write.
    if !updated {
        return Err(ApiError::not_found("Post not found."));
    }

    let post = state
        .db
        .posts()
        .get_by_id(id)
        .await
        .db_err("Failed to get post")?
        .ok_or_else(|| ApiError::not_found("Post not found."))?;

    Ok(Json(PostResponse::from(post)))
}

async fn delete_post(
    State(state): State<PostsState>,
    Auth(user): Auth,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = post_id(path)?;
    owned_post(&state.db, id, user.id()).await?;

    let deleted = state
        .db
        .posts()
        .delete(id, user.id())
        .await
        .db_err("Failed to delete post")?;

    if !deleted {
        return Err(ApiError::not_found("Post not found."));
    }

    info!(post_id = id, user_id = user.id(), "Post deleted");

    Ok(Json(MessageResponse::new("Post deleted successfully!")))
}
