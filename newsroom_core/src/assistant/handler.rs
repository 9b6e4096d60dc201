use std::collections::HashSet;
use std::sync::Arc;

use super::client::AssistantApi;
use super::dto::{
    Assistant, CreateAssistantRequest, CreateMessageRequest, CreateRunRequest, Digest, Run,
    RunStatus, RunStep, Thread, ToolCall, ToolSpec,
};
use super::tools::{get_all_custom_tools, ToolDispatcher};
use crate::config::PollPolicy;
use crate::error::OrchestratorError;
use crate::session::SessionStore;

pub const ASSISTANT_NAME: &str = "News Summarizer";
pub const ASSISTANT_INSTRUCTIONS: &str = "You are a personal article summarizer Assistant who knows how to take a list of article's titles and descriptions and then write a short summary of all the news articles";
pub const RUN_INSTRUCTIONS: &str = "Summarize the news";

/// One assistant session: a cached assistant, a cached thread and the run
/// currently being driven against them.
pub struct AssistantManager {
    api: Arc<dyn AssistantApi>,
    dispatcher: ToolDispatcher,
    store: SessionStore,
    model: String,
    poll: PollPolicy,
    assistant: Option<Assistant>,
    thread: Option<Thread>,
    run: Option<Run>,
    answered_calls: HashSet<String>,
    summary: Option<String>,
}

impl AssistantManager {
    pub fn new(
        api: Arc<dyn AssistantApi>,
        dispatcher: ToolDispatcher,
        store: SessionStore,
        model: impl Into<String>,
        poll: PollPolicy,
    ) -> Self {
        Self {
            api,
            dispatcher,
            store,
            model: model.into(),
            poll,
            assistant: None,
            thread: None,
            run: None,
            answered_calls: HashSet::new(),
            summary: None,
        }
    }

    pub fn assistant_id(&self) -> Option<&str> {
        self.assistant.as_ref().map(|a| a.id.as_str())
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread.as_ref().map(|t| t.id.as_str())
    }

    pub fn run(&self) -> Option<&Run> {
        self.run.as_ref()
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Create the assistant unless this session already has one. A stored id
    /// from an earlier process is resumed when the remote still knows it.
    pub async fn ensure_assistant(
        &mut self,
        name: &str,
        instructions: &str,
        tools: Vec<ToolSpec>,
    ) -> Result<String, OrchestratorError> {
        if let Some(assistant) = &self.assistant {
            return Ok(assistant.id.clone());
        }

        let assistant = match self.resume_assistant().await {
            Some(assistant) => assistant,
            None => {
                let request = CreateAssistantRequest {
                    name: name.to_string(),
                    instructions: instructions.to_string(),
                    model: self.model.clone(),
                    tools,
                };
                let assistant = self.api.create_assistant(request).await?;
                self.store.set_assistant_id(&assistant.id)?;
                log::info!("AssistantID created with id: {}", assistant.id);
                assistant
            }
        };

        let id = assistant.id.clone();
        self.assistant = Some(assistant);
        Ok(id)
    }

    async fn resume_assistant(&self) -> Option<Assistant> {
        let assistant_id = self.store.get_assistant_id()?;
        match self.api.retrieve_assistant(&assistant_id).await {
            Ok(assistant) => {
                log::info!("Resumed assistant {}", assistant.id);
                Some(assistant)
            }
            Err(e) => {
                log::warn!(
                    "Stored assistant {} could not be retrieved, creating a new one: {}",
                    assistant_id,
                    e
                );
                None
            }
        }
    }

    /// Create the conversation thread unless this session already has one.
    pub async fn ensure_thread(&mut self) -> Result<String, OrchestratorError> {
        if let Some(thread) = &self.thread {
            return Ok(thread.id.clone());
        }

        let thread = match self.resume_thread().await {
            Some(thread) => thread,
            None => {
                let thread = self.api.create_thread().await?;
                self.store.set_thread_id(&thread.id)?;
                log::info!("Thread created with id: {}", thread.id);
                thread
            }
        };

        let id = thread.id.clone();
        self.thread = Some(thread);
        Ok(id)
    }

    async fn resume_thread(&self) -> Option<Thread> {
        let thread_id = self.store.get_thread_id()?;
        match self.api.retrieve_thread(&thread_id).await {
            Ok(thread) => {
                log::info!("Resumed thread {}", thread.id);
                Some(thread)
            }
            Err(e) => {
                log::warn!(
                    "Stored thread {} could not be retrieved, creating a new one: {}",
                    thread_id,
                    e
                );
                None
            }
        }
    }

    pub async fn post_user_message(&self, text: &str) -> Result<(), OrchestratorError> {
        let thread = self.thread.as_ref().ok_or(OrchestratorError::MissingThread)?;
        let request = CreateMessageRequest {
            role: "user".to_string(),
            content: text.to_string(),
        };
        let message = self.api.create_message(&thread.id, request).await?;
        log::info!("Posted message {} to thread {}", message.id, thread.id);
        Ok(())
    }

    /// Start a fresh run of the cached assistant on the cached thread.
    pub async fn start_run(&mut self, instructions: &str) -> Result<String, OrchestratorError> {
        let thread = self.thread.as_ref().ok_or(OrchestratorError::MissingThread)?;
        let assistant = self
            .assistant
            .as_ref()
            .ok_or(OrchestratorError::MissingAssistant)?;

        let request = CreateRunRequest {
            assistant_id: assistant.id.clone(),
            instructions: instructions.to_string(),
        };
        let run = self.api.create_run(&thread.id, request).await?;
        log::info!("Run {} started with status {}", run.id, run.status);

        let id = run.id.clone();
        self.run = Some(run);
        self.summary = None;
        self.answered_calls.clear();
        Ok(id)
    }

    fn run_ids(&self) -> Result<(String, String), OrchestratorError> {
        let thread = self.thread.as_ref().ok_or(OrchestratorError::MissingThread)?;
        let run = self.run.as_ref().ok_or(OrchestratorError::MissingRun)?;
        Ok((thread.id.clone(), run.id.clone()))
    }

    /// Poll the current run until it settles.
    ///
    /// Returns the summary on `completed`, dispatches tool calls on
    /// `requires_action`, and gives up with a typed error on a failure status
    /// or once the poll budget is spent.
    pub async fn await_completion(&mut self) -> Result<String, OrchestratorError> {
        let (thread_id, run_id) = self.run_ids()?;

        for attempt in 1..=self.poll.max_attempts {
            tokio::time::sleep(self.poll.interval).await;

            let run = self.api.retrieve_run(&thread_id, &run_id).await?;
            log::info!("Run {} status: {} (poll {})", run_id, run.status, attempt);
            self.run = Some(run.clone());

            match run.status {
                RunStatus::Completed => {
                    log::info!("Completed..");
                    return self.process_messages().await;
                }
                RunStatus::RequiresAction => {
                    log::info!("Function calling...");
                    self.dispatch_tool_calls(run.pending_tool_calls()).await?;
                }
                status if status.is_failure() => {
                    let reason = run
                        .last_error
                        .map(|e| format!("{} ({})", e.message, e.code))
                        .unwrap_or_else(|| "no error reported".to_string());
                    log::error!("Run {} ended with status {}: {}", run_id, status, reason);
                    return Err(OrchestratorError::RunTerminated {
                        run_id,
                        status,
                        reason,
                    });
                }
                _ => {}
            }
        }

        Err(OrchestratorError::PollTimeout {
            run_id,
            attempts: self.poll.max_attempts,
        })
    }

    /// Answer the run's pending tool calls with one batched submission.
    /// Calls already answered for this run are skipped.
    pub async fn dispatch_tool_calls(
        &mut self,
        calls: &[ToolCall],
    ) -> Result<(), OrchestratorError> {
        let (thread_id, run_id) = self.run_ids()?;

        let pending: Vec<ToolCall> = calls
            .iter()
            .filter(|call| !self.answered_calls.contains(&call.id))
            .cloned()
            .collect();

        if pending.is_empty() {
            log::info!("Tool calls for run {} already answered, waiting", run_id);
            return Ok(());
        }

        let tool_outputs = self.dispatcher.dispatch(&pending).await?;

        log::info!("Submitting {} tool outputs back to assistant", tool_outputs.len());
        self.api
            .submit_tool_outputs(&thread_id, &run_id, tool_outputs)
            .await?;
        self.answered_calls
            .extend(pending.into_iter().map(|call| call.id));
        Ok(())
    }

    async fn process_messages(&mut self) -> Result<String, OrchestratorError> {
        let thread_id = self
            .thread_id()
            .ok_or(OrchestratorError::MissingThread)?
            .to_string();
        let messages = self.api.list_messages(&thread_id).await?;

        let reply = messages
            .first()
            .and_then(|message| message.text().map(|text| (message.role.as_str(), text)));

        match reply {
            Some((role, text)) => {
                log::info!("summary {} => {}", role, text);
                let text = text.to_string();
                self.summary = Some(text.clone());
                Ok(text)
            }
            None => Err(OrchestratorError::MissingReply { thread_id }),
        }
    }

    /// Execution steps the remote recorded for the current run.
    pub async fn list_run_steps(&self) -> Result<Vec<RunStep>, OrchestratorError> {
        let (thread_id, run_id) = self.run_ids()?;
        let steps = self.api.list_run_steps(&thread_id, &run_id).await?;
        log::info!("Run {} has {} steps", run_id, steps.len());
        Ok(steps)
    }

    /// The whole submission flow behind the form.
    pub async fn summarize_topic(&mut self, topic: &str) -> Result<Digest, OrchestratorError> {
        log::info!("=== SUMMARIZE START for topic '{}' ===", topic);

        self.ensure_assistant(ASSISTANT_NAME, ASSISTANT_INSTRUCTIONS, get_all_custom_tools())
            .await?;
        self.ensure_thread().await?;
        self.post_user_message(&format!("Summarize the news on this topic {}", topic))
            .await?;
        self.start_run(RUN_INSTRUCTIONS).await?;

        let summary = self.await_completion().await?;
        let run_steps = self.list_run_steps().await?;

        log::info!("=== SUMMARIZE END for topic '{}' ===", topic);
        Ok(Digest {
            topic: topic.to_string(),
            summary,
            run_steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::dto::{
        FunctionCall, MessageContent, RequiredAction, RunError, SubmitToolOutputs, TextContent,
        ThreadMessage, ToolOutput,
    };
    use crate::assistant::tools::GET_NEWS;
    use crate::error::{ApiError, DispatchError};
    use crate::news::NewsClient;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Scripted stand-in for the assistants service.
    #[derive(Default)]
    struct FakeApi {
        known_assistants: Mutex<HashSet<String>>,
        known_threads: Mutex<HashSet<String>>,
        assistants_created: Mutex<usize>,
        threads_created: Mutex<usize>,
        messages: Mutex<Vec<String>>,
        runs: Mutex<VecDeque<Run>>,
        polls: Mutex<usize>,
        submissions: Mutex<Vec<Vec<ToolOutput>>>,
        reply: Mutex<Option<String>>,
    }

    impl FakeApi {
        fn scripted(statuses: Vec<Run>, reply: &str) -> Self {
            let fake = FakeApi::default();
            *fake.runs.lock().unwrap() = statuses.into();
            *fake.reply.lock().unwrap() = Some(reply.to_string());
            fake
        }
    }

    #[async_trait]
    impl AssistantApi for FakeApi {
        async fn create_assistant(
            &self,
            request: CreateAssistantRequest,
        ) -> Result<Assistant, ApiError> {
            let mut created = self.assistants_created.lock().unwrap();
            *created += 1;
            Ok(Assistant {
                id: format!("asst_{}", created),
                name: Some(request.name),
                model: request.model,
            })
        }

        async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, ApiError> {
            if self.known_assistants.lock().unwrap().contains(assistant_id) {
                Ok(Assistant {
                    id: assistant_id.to_string(),
                    name: None,
                    model: String::new(),
                })
            } else {
                Err(ApiError::Status {
                    status: 404,
                    body: "not found".to_string(),
                })
            }
        }

        async fn create_thread(&self) -> Result<Thread, ApiError> {
            let mut created = self.threads_created.lock().unwrap();
            *created += 1;
            Ok(Thread {
                id: format!("thread_{}", created),
            })
        }

        async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, ApiError> {
            if self.known_threads.lock().unwrap().contains(thread_id) {
                Ok(Thread {
                    id: thread_id.to_string(),
                })
            } else {
                Err(ApiError::Status {
                    status: 404,
                    body: "not found".to_string(),
                })
            }
        }

        async fn create_message(
            &self,
            _thread_id: &str,
            request: CreateMessageRequest,
        ) -> Result<ThreadMessage, ApiError> {
            let mut messages = self.messages.lock().unwrap();
            messages.push(request.content.clone());
            Ok(text_message(&format!("msg_{}", messages.len()), &request.role, &request.content))
        }

        async fn list_messages(&self, _thread_id: &str) -> Result<Vec<ThreadMessage>, ApiError> {
            let mut listed = Vec::new();
            if let Some(reply) = self.reply.lock().unwrap().clone() {
                listed.push(text_message("msg_reply", "assistant", &reply));
            }
            for content in self.messages.lock().unwrap().iter().rev() {
                listed.push(text_message("msg_user", "user", content));
            }
            Ok(listed)
        }

        async fn create_run(
            &self,
            thread_id: &str,
            request: CreateRunRequest,
        ) -> Result<Run, ApiError> {
            let mut started = run_with("run_1", RunStatus::Queued, vec![]);
            started.thread_id = thread_id.to_string();
            started.assistant_id = request.assistant_id;
            Ok(started)
        }

        async fn retrieve_run(&self, _thread_id: &str, _run_id: &str) -> Result<Run, ApiError> {
            *self.polls.lock().unwrap() += 1;
            let mut runs = self.runs.lock().unwrap();
            let run = if runs.len() > 1 {
                runs.pop_front()
            } else {
                runs.front().cloned()
            };
            Ok(run.unwrap_or_else(|| run_with("run_1", RunStatus::InProgress, vec![])))
        }

        async fn submit_tool_outputs(
            &self,
            _thread_id: &str,
            run_id: &str,
            tool_outputs: Vec<ToolOutput>,
        ) -> Result<Run, ApiError> {
            self.submissions.lock().unwrap().push(tool_outputs);
            Ok(run_with(run_id, RunStatus::Queued, vec![]))
        }

        async fn list_run_steps(
            &self,
            _thread_id: &str,
            _run_id: &str,
        ) -> Result<Vec<RunStep>, ApiError> {
            Ok(vec![
                RunStep {
                    id: "step_1".to_string(),
                    kind: "tool_calls".to_string(),
                    status: "completed".to_string(),
                    created_at: 1,
                    step_details: json!({ "type": "tool_calls" }),
                },
                RunStep {
                    id: "step_2".to_string(),
                    kind: "message_creation".to_string(),
                    status: "completed".to_string(),
                    created_at: 2,
                    step_details: json!({ "type": "message_creation" }),
                },
            ])
        }
    }

    fn text_message(id: &str, role: &str, value: &str) -> ThreadMessage {
        ThreadMessage {
            id: id.to_string(),
            role: role.to_string(),
            content: vec![MessageContent::Text {
                text: TextContent {
                    value: value.to_string(),
                },
            }],
        }
    }

    fn news_call(id: &str, name: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: r#"{"topic": "bitcoin"}"#.to_string(),
            },
        }
    }

    fn run_with(id: &str, status: RunStatus, calls: Vec<ToolCall>) -> Run {
        let required_action = (!calls.is_empty()).then(|| RequiredAction {
            kind: "submit_tool_outputs".to_string(),
            submit_tool_outputs: SubmitToolOutputs { tool_calls: calls },
        });
        Run {
            id: id.to_string(),
            thread_id: "thread_1".to_string(),
            assistant_id: "asst_1".to_string(),
            status,
            required_action,
            last_error: None,
        }
    }

    fn fast_poll(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            interval: Duration::ZERO,
            max_attempts,
        }
    }

    async fn news_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "totalResults": 1,
                "articles": [{
                    "source": { "name": "Wire" },
                    "author": "Reporter",
                    "title": "Bitcoin moves",
                    "description": "Prices changed",
                    "url": "https://news.example/btc",
                    "content": "..."
                }]
            })))
            .mount(&server)
            .await;
        server
    }

    fn offline_dispatcher() -> ToolDispatcher {
        ToolDispatcher::new(NewsClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/v2/everything",
            "key",
        ))
    }

    fn new_manager(api: Arc<FakeApi>, dispatcher: ToolDispatcher, poll: PollPolicy) -> AssistantManager {
        let store = SessionStore::open(None).unwrap();
        AssistantManager::new(api, dispatcher, store, "gpt-test", poll)
    }

    async fn ready(manager: &mut AssistantManager) {
        manager
            .ensure_assistant(ASSISTANT_NAME, ASSISTANT_INSTRUCTIONS, get_all_custom_tools())
            .await
            .unwrap();
        manager.ensure_thread().await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_assistant_and_thread_are_idempotent() {
        let api = Arc::new(FakeApi::default());
        let mut manager = new_manager(api.clone(), offline_dispatcher(), fast_poll(1));

        let first = manager
            .ensure_assistant(ASSISTANT_NAME, ASSISTANT_INSTRUCTIONS, get_all_custom_tools())
            .await
            .unwrap();
        let second = manager
            .ensure_assistant(ASSISTANT_NAME, ASSISTANT_INSTRUCTIONS, get_all_custom_tools())
            .await
            .unwrap();
        let thread_a = manager.ensure_thread().await.unwrap();
        let thread_b = manager.ensure_thread().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(thread_a, thread_b);
        assert_eq!(*api.assistants_created.lock().unwrap(), 1);
        assert_eq!(*api.threads_created.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stored_identities_are_resumed() {
        let api = Arc::new(FakeApi::default());
        api.known_assistants.lock().unwrap().insert("asst_saved".to_string());
        api.known_threads.lock().unwrap().insert("thread_saved".to_string());

        let store = SessionStore::open(None).unwrap();
        store.set_assistant_id("asst_saved").unwrap();
        store.set_thread_id("thread_saved").unwrap();
        let mut manager = AssistantManager::new(
            api.clone(),
            offline_dispatcher(),
            store,
            "gpt-test",
            fast_poll(1),
        );

        ready(&mut manager).await;

        assert_eq!(manager.assistant_id(), Some("asst_saved"));
        assert_eq!(manager.thread_id(), Some("thread_saved"));
        assert_eq!(*api.assistants_created.lock().unwrap(), 0);
        assert_eq!(*api.threads_created.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stale_stored_assistant_is_replaced() {
        let api = Arc::new(FakeApi::default());
        let store = SessionStore::open(None).unwrap();
        store.set_assistant_id("asst_gone").unwrap();
        let mut manager = AssistantManager::new(
            api.clone(),
            offline_dispatcher(),
            store.clone(),
            "gpt-test",
            fast_poll(1),
        );

        let id = manager
            .ensure_assistant(ASSISTANT_NAME, ASSISTANT_INSTRUCTIONS, vec![])
            .await
            .unwrap();

        assert_eq!(id, "asst_1");
        assert_eq!(store.get_assistant_id().as_deref(), Some("asst_1"));
    }

    #[tokio::test]
    async fn test_preconditions_fail_fast() {
        let api = Arc::new(FakeApi::default());
        let mut manager = new_manager(api.clone(), offline_dispatcher(), fast_poll(1));

        assert!(matches!(
            manager.post_user_message("hello").await,
            Err(OrchestratorError::MissingThread)
        ));
        assert!(matches!(
            manager.start_run(RUN_INSTRUCTIONS).await,
            Err(OrchestratorError::MissingThread)
        ));

        manager.ensure_thread().await.unwrap();
        assert!(matches!(
            manager.start_run(RUN_INSTRUCTIONS).await,
            Err(OrchestratorError::MissingAssistant)
        ));
        assert!(matches!(
            manager.await_completion().await,
            Err(OrchestratorError::MissingRun)
        ));
        assert!(api.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_poll_loop_dispatches_once_then_completes() {
        let server = news_server().await;
        let news = NewsClient::new(reqwest::Client::new(), server.uri(), "key");
        let expected_output = news.fetch_articles("bitcoin").await.concat();

        let api = Arc::new(FakeApi::scripted(
            vec![
                run_with("run_1", RunStatus::Queued, vec![]),
                run_with(
                    "run_1",
                    RunStatus::RequiresAction,
                    vec![news_call("call_1", GET_NEWS)],
                ),
                run_with("run_1", RunStatus::InProgress, vec![]),
                run_with("run_1", RunStatus::Completed, vec![]),
            ],
            "Bitcoin prices moved today.",
        ));
        let mut manager = new_manager(api.clone(), ToolDispatcher::new(news), fast_poll(10));
        ready(&mut manager).await;
        manager.start_run(RUN_INSTRUCTIONS).await.unwrap();

        let summary = manager.await_completion().await.unwrap();

        assert_eq!(summary, "Bitcoin prices moved today.");
        assert_eq!(manager.summary(), Some("Bitcoin prices moved today."));
        assert_eq!(*api.polls.lock().unwrap(), 4);

        let submissions = api.submissions.lock().unwrap();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].len(), 1);
        assert_eq!(submissions[0][0].tool_call_id, "call_1");
        assert_eq!(submissions[0][0].output, expected_output);
    }

    #[tokio::test]
    async fn test_repeated_requires_action_is_submitted_once() {
        let server = news_server().await;
        let news = NewsClient::new(reqwest::Client::new(), server.uri(), "key");
        let pending = vec![news_call("call_1", GET_NEWS), news_call("call_2", GET_NEWS)];

        let api = Arc::new(FakeApi::scripted(
            vec![
                run_with("run_1", RunStatus::RequiresAction, pending.clone()),
                run_with("run_1", RunStatus::RequiresAction, pending),
                run_with("run_1", RunStatus::Completed, vec![]),
            ],
            "done",
        ));
        let mut manager = new_manager(api.clone(), ToolDispatcher::new(news), fast_poll(10));
        ready(&mut manager).await;
        manager.start_run(RUN_INSTRUCTIONS).await.unwrap();

        manager.await_completion().await.unwrap();

        let submissions = api.submissions.lock().unwrap();
        assert_eq!(submissions.len(), 1);
        let ids: Vec<_> = submissions[0].iter().map(|o| o.tool_call_id.as_str()).collect();
        assert_eq!(ids, vec!["call_1", "call_2"]);
    }

    #[tokio::test]
    async fn test_unknown_tool_aborts_without_submission() {
        let api = Arc::new(FakeApi::scripted(
            vec![
                run_with(
                    "run_1",
                    RunStatus::RequiresAction,
                    vec![news_call("call_1", "unknown_fn")],
                ),
                run_with("run_1", RunStatus::Completed, vec![]),
            ],
            "never read",
        ));
        let mut manager = new_manager(api.clone(), offline_dispatcher(), fast_poll(10));
        ready(&mut manager).await;
        manager.start_run(RUN_INSTRUCTIONS).await.unwrap();

        let err = manager.await_completion().await.unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Dispatch(DispatchError::UnknownTool(ref name)) if name == "unknown_fn"
        ));
        assert!(!err.is_transient());
        assert!(api.submissions.lock().unwrap().is_empty());
        assert_eq!(manager.summary(), None);
    }

    #[tokio::test]
    async fn test_failed_run_is_terminal() {
        let mut failed = run_with("run_1", RunStatus::Failed, vec![]);
        failed.last_error = Some(RunError {
            code: "rate_limit_exceeded".to_string(),
            message: "Rate limit reached".to_string(),
        });
        let api = Arc::new(FakeApi::scripted(
            vec![run_with("run_1", RunStatus::InProgress, vec![]), failed],
            "unused",
        ));
        let mut manager = new_manager(api.clone(), offline_dispatcher(), fast_poll(10));
        ready(&mut manager).await;
        manager.start_run(RUN_INSTRUCTIONS).await.unwrap();

        let err = manager.await_completion().await.unwrap_err();

        match err {
            OrchestratorError::RunTerminated { status, reason, .. } => {
                assert_eq!(status, RunStatus::Failed);
                assert!(reason.contains("Rate limit reached"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(*api.polls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unsettled_run_times_out() {
        let api = Arc::new(FakeApi::scripted(
            vec![run_with("run_1", RunStatus::InProgress, vec![])],
            "unused",
        ));
        let mut manager = new_manager(api.clone(), offline_dispatcher(), fast_poll(3));
        ready(&mut manager).await;
        manager.start_run(RUN_INSTRUCTIONS).await.unwrap();

        let err = manager.await_completion().await.unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::PollTimeout { attempts: 3, .. }
        ));
        assert!(err.is_transient());
        assert_eq!(*api.polls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_completed_without_text_reply() {
        let api = Arc::new(FakeApi::scripted(
            vec![run_with("run_1", RunStatus::Completed, vec![])],
            "unused",
        ));
        *api.reply.lock().unwrap() = None;
        let mut manager = new_manager(api.clone(), offline_dispatcher(), fast_poll(3));
        ready(&mut manager).await;
        manager.start_run(RUN_INSTRUCTIONS).await.unwrap();

        assert!(matches!(
            manager.await_completion().await,
            Err(OrchestratorError::MissingReply { .. })
        ));
    }

    #[tokio::test]
    async fn test_summarize_topic_runs_full_flow() {
        let server = news_server().await;
        let news = NewsClient::new(reqwest::Client::new(), server.uri(), "key");
        let api = Arc::new(FakeApi::scripted(
            vec![
                run_with(
                    "run_1",
                    RunStatus::RequiresAction,
                    vec![news_call("call_1", GET_NEWS)],
                ),
                run_with("run_1", RunStatus::Completed, vec![]),
            ],
            "A short digest.",
        ));
        let mut manager = new_manager(api.clone(), ToolDispatcher::new(news), fast_poll(5));

        let digest = manager.summarize_topic("bitcoin").await.unwrap();

        assert_eq!(digest.topic, "bitcoin");
        assert_eq!(digest.summary, "A short digest.");
        assert_eq!(digest.run_steps.len(), 2);
        assert_eq!(digest.run_steps[0].id, "step_1");
        assert_eq!(
            api.messages.lock().unwrap().as_slice(),
            ["Summarize the news on this topic bitcoin".to_string()]
        );

        // A second submission reuses the cached assistant and thread.
        *api.runs.lock().unwrap() = vec![run_with("run_1", RunStatus::Completed, vec![])].into();
        manager.summarize_topic("rust").await.unwrap();
        assert_eq!(*api.assistants_created.lock().unwrap(), 1);
        assert_eq!(*api.threads_created.lock().unwrap(), 1);
    }
}
