use std::{env, str::FromStr, time::Duration};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-16k";
pub const DEFAULT_NEWS_API_URL: &str = "https://newsapi.org/v2/everything";
pub const DEFAULT_SERVER_DOMAIN: &str = "127.0.0.1:8501";

/// How long to wait for a run to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 120,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
    pub news_api_key: String,
    pub news_api_url: String,
    pub poll: PollPolicy,
    pub session_db_path: Option<String>,
    pub server_domain: String,
}

impl Config {
    /// Read the configuration from the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Self {
        let defaults = PollPolicy::default();

        Self {
            openai_api_key: required("OPENAI_API_KEY"),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string()),
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            news_api_key: required("NEWS_API_KEY"),
            news_api_url: env::var("NEWS_API_URL")
                .unwrap_or_else(|_| DEFAULT_NEWS_API_URL.to_string()),
            poll: PollPolicy {
                interval: Duration::from_secs(parsed(
                    "POLL_INTERVAL_SECS",
                    defaults.interval.as_secs(),
                )),
                max_attempts: parsed("MAX_POLL_ATTEMPTS", defaults.max_attempts),
            },
            session_db_path: env::var("SESSION_DB_PATH")
                .ok()
                .filter(|path| !path.trim().is_empty()),
            server_domain: env::var("SERVER_DOMAIN")
                .unwrap_or_else(|_| DEFAULT_SERVER_DOMAIN.to_string()),
        }
    }
}

// Missing keys are not fatal: the remote calls will fail and say so.
fn required(name: &str) -> String {
    match env::var(name) {
        Ok(value) if !value.is_empty() => value,
        _ => {
            log::warn!("{} environment variable not set", name);
            String::new()
        }
    }
}

fn parsed<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Invalid {}='{}', using {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
