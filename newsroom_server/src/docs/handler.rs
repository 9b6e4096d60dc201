use axum::Json;
use utoipa::OpenApi;

use super::dto::ApiDoc;

pub async fn api_docs() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
