pub mod assistant;
pub mod config;
pub mod error;
pub mod news;
pub mod session;
