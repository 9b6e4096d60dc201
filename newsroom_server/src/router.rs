use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use newsroom_core::{
    assistant::{AssistantManager, OpenAIAssistants, ToolDispatcher},
    config::Config,
    error::StoreError,
    news::NewsClient,
    session::SessionStore,
};
use reqwest::Client as ReqClient;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use crate::{
    docs::{dto::ApiDoc, handler::api_docs},
    page::{index, submit},
    state::ServerState,
    summary::handler::summarize,
};

pub fn router(config: &Config) -> Result<Router, StoreError> {
    let client = ReqClient::new();

    let api = Arc::new(OpenAIAssistants::new(
        client.clone(),
        config.openai_base_url.clone(),
        config.openai_api_key.clone(),
    ));
    let news = NewsClient::new(
        client,
        config.news_api_url.clone(),
        config.news_api_key.clone(),
    );
    let store = SessionStore::open(config.session_db_path.as_deref())?;

    let manager = AssistantManager::new(
        api,
        ToolDispatcher::new(news),
        store,
        config.model.clone(),
        config.poll,
    );

    Ok(app(Arc::new(ServerState::from(manager))))
}

pub fn app(state: Arc<ServerState>) -> Router {
    let doc = ApiDoc::openapi();

    Router::new()
        .merge(Redoc::with_url("/redoc", doc))
        .route("/", get(index).post(submit))
        .route("/summaries", post(summarize))
        .route("/docs", get(api_docs))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
