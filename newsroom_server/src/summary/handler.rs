use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use newsroom_core::assistant::dto::Digest;

use crate::{error::ErrorServer, state::ServerState, summary::dto::SummaryRequest};

#[utoipa::path(
    post,
    path = "/summaries",
    request_body = SummaryRequest,
    description = "Fetch recent news for a topic and summarize it with the assistant",
    responses(
        (status = 200, description = "Success", body = Digest),
        (status = 400, description = "Bad Request", body = ErrorServer),
        (status = 502, description = "Assistant run failed", body = ErrorServer),
        (status = 504, description = "Assistant run did not settle", body = ErrorServer),
    )
)]
#[axum::debug_handler]
pub async fn summarize(
    State(server_state): State<Arc<ServerState>>,
    Json(request): Json<SummaryRequest>,
) -> Result<Json<Digest>, ErrorServer> {
    let topic = request.topic.trim();
    if topic.is_empty() {
        return Err(ErrorServer {
            status: StatusCode::BAD_REQUEST.into(),
            message: "topic must not be empty".to_string(),
        });
    }

    let mut manager = server_state.manager().await;
    let digest = manager.summarize_topic(topic).await?;

    Ok(Json(digest))
}
