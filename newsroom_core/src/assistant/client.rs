use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::dto::{
    Assistant, CreateAssistantRequest, CreateMessageRequest, CreateRunRequest, ListResponse, Run,
    RunStep, SubmitToolOutputsRequest, Thread, ThreadMessage, ToolOutput,
};
use crate::error::ApiError;

/// The remote assistants service, as far as the orchestrator needs it.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    async fn create_assistant(&self, request: CreateAssistantRequest)
        -> Result<Assistant, ApiError>;

    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, ApiError>;

    async fn create_thread(&self) -> Result<Thread, ApiError>;

    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, ApiError>;

    async fn create_message(
        &self,
        thread_id: &str,
        request: CreateMessageRequest,
    ) -> Result<ThreadMessage, ApiError>;

    /// Messages of the thread, newest first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, ApiError>;

    async fn create_run(&self, thread_id: &str, request: CreateRunRequest)
        -> Result<Run, ApiError>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ApiError>;

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        tool_outputs: Vec<ToolOutput>,
    ) -> Result<Run, ApiError>;

    async fn list_run_steps(&self, thread_id: &str, run_id: &str)
        -> Result<Vec<RunStep>, ApiError>;
}

/// reqwest-backed client for the OpenAI Assistants v2 endpoints.
#[derive(Clone)]
pub struct OpenAIAssistants {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAIAssistants {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let builder = self.authorized(self.client.get(self.url(path)));
        Self::send(builder).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.authorized(self.client.post(self.url(path)).json(body));
        Self::send(builder).await
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            log::error!("Assistants API request failed with status: {} - {}", status, body);
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl AssistantApi for OpenAIAssistants {
    async fn create_assistant(
        &self,
        request: CreateAssistantRequest,
    ) -> Result<Assistant, ApiError> {
        self.post("/assistants", &request).await
    }

    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, ApiError> {
        self.get(&format!("/assistants/{}", assistant_id)).await
    }

    async fn create_thread(&self) -> Result<Thread, ApiError> {
        self.post("/threads", &serde_json::json!({})).await
    }

    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, ApiError> {
        self.get(&format!("/threads/{}", thread_id)).await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        request: CreateMessageRequest,
    ) -> Result<ThreadMessage, ApiError> {
        self.post(&format!("/threads/{}/messages", thread_id), &request)
            .await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, ApiError> {
        let list: ListResponse<ThreadMessage> = self
            .get(&format!("/threads/{}/messages?order=desc", thread_id))
            .await?;
        Ok(list.data)
    }

    async fn create_run(
        &self,
        thread_id: &str,
        request: CreateRunRequest,
    ) -> Result<Run, ApiError> {
        self.post(&format!("/threads/{}/runs", thread_id), &request)
            .await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ApiError> {
        self.get(&format!("/threads/{}/runs/{}", thread_id, run_id))
            .await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        tool_outputs: Vec<ToolOutput>,
    ) -> Result<Run, ApiError> {
        let request = SubmitToolOutputsRequest { tool_outputs };
        self.post(
            &format!("/threads/{}/runs/{}/submit_tool_outputs", thread_id, run_id),
            &request,
        )
        .await
    }

    async fn list_run_steps(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<Vec<RunStep>, ApiError> {
        let list: ListResponse<RunStep> = self
            .get(&format!(
                "/threads/{}/runs/{}/steps?order=asc",
                thread_id, run_id
            ))
            .await?;
        Ok(list.data)
    }
}
