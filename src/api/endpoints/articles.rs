//! Article registration endpoints.
//!
//! Upload and storage of the PDF itself are external; these endpoints only
//! register the article an extraction will belong to.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository;
use crate::models::Article;

#[derive(Deserialize)]
pub struct ArticleCreate {
    pub title: String,
    pub file_path: Option<String>,
}

/// `POST /api/articles` — register an article.
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(body): Json<ArticleCreate>,
) -> Result<(StatusCode, Json<Article>), ApiError> {
    if body.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".into()));
    }
    let article = Article::new(body.title, body.file_path);
    let conn = ctx.lock_db()?;
    repository::insert_article(&conn, &article)?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// `GET /api/articles/:id` — article metadata.
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Article>, ApiError> {
    let conn = ctx.lock_db()?;
    let article = repository::get_article(&conn, id)?;
    Ok(Json(article))
}
