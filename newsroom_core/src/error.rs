use crate::assistant::dto::RunStatus;

/// Failure talking to the assistants API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("assistants API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode assistants API response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Tool dispatch errors. These point at a misconfigured assistant rather
/// than a flaky remote, so they are never retried or skipped.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Function {0} is not defined")]
    UnknownTool(String),

    #[error("invalid arguments for {name}: {source}")]
    InvalidArguments {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("no thread has been created for this session")]
    MissingThread,

    #[error("no assistant has been created for this session")]
    MissingAssistant,

    #[error("no run has been started for this session")]
    MissingRun,

    #[error("thread {thread_id} has no text reply")]
    MissingReply { thread_id: String },

    #[error("run {run_id} ended with status {status}: {reason}")]
    RunTerminated {
        run_id: String,
        status: RunStatus,
        reason: String,
    },

    #[error("run {run_id} did not settle after {attempts} polls")]
    PollTimeout { run_id: String, attempts: u32 },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("session store error: {0}")]
    Store(#[from] StoreError),
}

impl OrchestratorError {
    /// Remote or transport failures that might succeed on a later submission.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OrchestratorError::Api(_)
                | OrchestratorError::RunTerminated { .. }
                | OrchestratorError::PollTimeout { .. }
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Sled(#[from] sled::Error),

    #[error(transparent)]
    Encoding(#[from] bincode::Error),
}
