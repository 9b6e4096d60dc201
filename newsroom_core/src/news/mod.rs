pub mod dto;
pub mod handler;

pub use handler::{NewsClient, PAGE_SIZE};
