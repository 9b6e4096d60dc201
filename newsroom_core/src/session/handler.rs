use serde::{Deserialize, Serialize};
use sled::{Db, IVec};

use crate::error::StoreError;

const TREE_NAME: &str = "session";
const SESSION_KEY: &[u8] = b"identities";

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub assistant_id: Option<String>,
    pub thread_id: Option<String>,
}

/// Remembers the assistant and thread ids of the session.
#[derive(Clone)]
pub struct SessionStore {
    tree: sled::Tree,
}

impl SessionStore {
    pub fn new(db: &Db) -> Result<Self, StoreError> {
        let tree = db.open_tree(TREE_NAME)?;
        Ok(Self { tree })
    }

    /// Open the store at `path`, or a throwaway one that lives only as long
    /// as this process when no path is given.
    pub fn open(path: Option<&str>) -> Result<Self, StoreError> {
        let db = match path {
            Some(path) => sled::open(path)?,
            None => sled::Config::new().temporary(true).open()?,
        };
        Self::new(&db)
    }

    pub fn get_session_data(&self) -> Option<SessionData> {
        self.tree
            .get(SESSION_KEY)
            .ok()
            .flatten()
            .and_then(|ivec: IVec| bincode::deserialize(&ivec).ok())
    }

    pub fn set_session_data(&self, data: &SessionData) -> Result<(), StoreError> {
        let encoded = bincode::serialize(data)?;
        self.tree.insert(SESSION_KEY, encoded)?;
        Ok(())
    }

    pub fn get_assistant_id(&self) -> Option<String> {
        self.get_session_data().and_then(|data| data.assistant_id)
    }

    pub fn set_assistant_id(&self, assistant_id: &str) -> Result<(), StoreError> {
        let mut data = self.get_session_data().unwrap_or_default();
        data.assistant_id = Some(assistant_id.to_string());
        self.set_session_data(&data)
    }

    pub fn get_thread_id(&self) -> Option<String> {
        self.get_session_data().and_then(|data| data.thread_id)
    }

    pub fn set_thread_id(&self, thread_id: &str) -> Result<(), StoreError> {
        let mut data = self.get_session_data().unwrap_or_default();
        data.thread_id = Some(thread_id.to_string());
        self.set_session_data(&data)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.tree.remove(SESSION_KEY)?;
        Ok(())
    }
}
