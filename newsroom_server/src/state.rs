use newsroom_core::assistant::AssistantManager;
use tokio::sync::{Mutex, MutexGuard};

/// One assistant session per process; submissions take turns on it.
pub struct ServerState {
    manager: Mutex<AssistantManager>,
}

impl From<AssistantManager> for ServerState {
    fn from(manager: AssistantManager) -> Self {
        Self {
            manager: Mutex::new(manager),
        }
    }
}

impl ServerState {
    pub async fn manager(&self) -> MutexGuard<'_, AssistantManager> {
        self.manager.lock().await
    }
}
