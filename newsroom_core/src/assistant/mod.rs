pub mod client;
pub mod dto;
pub mod handler;
pub mod tools;

pub use client::{AssistantApi, OpenAIAssistants};
pub use handler::AssistantManager;
pub use tools::ToolDispatcher;
