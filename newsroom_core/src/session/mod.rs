pub mod handler;

pub use handler::{SessionData, SessionStore};
