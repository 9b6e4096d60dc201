use std::sync::Arc;

use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::Html,
};
use newsroom_core::assistant::dto::{Digest, RunStep};
use serde::Deserialize;
use teloxide::utils::html::escape;

use crate::{error::ErrorServer, state::ServerState};

const TITLE: &str = "News summarizer";

#[derive(Debug, Deserialize)]
pub struct TopicForm {
    #[serde(default)]
    pub topic: String,
}

pub async fn index() -> Html<String> {
    Html(render_page("", ""))
}

pub async fn submit(
    State(server_state): State<Arc<ServerState>>,
    Form(form): Form<TopicForm>,
) -> (StatusCode, Html<String>) {
    let topic = form.topic.trim();
    if topic.is_empty() {
        let body = render_error("Enter a topic to summarize.");
        return (StatusCode::BAD_REQUEST, Html(render_page(topic, &body)));
    }

    let mut manager = server_state.manager().await;
    match manager.summarize_topic(topic).await {
        Ok(digest) => (StatusCode::OK, Html(render_page(topic, &render_digest(&digest)))),
        Err(e) => {
            let error = ErrorServer::from(e);
            let status =
                StatusCode::from_u16(error.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Html(render_page(topic, &render_error(&error.message))))
        }
    }
}

fn render_page(topic: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }}
pre {{ background: #f4f4f4; padding: 1rem; overflow-x: auto; }}
.error {{ color: #a00; }}
</style>
</head>
<body>
<h1>{title}</h1>
<form method="post" action="/">
<label for="topic">Enter topic</label>
<input id="topic" name="topic" type="text" value="{topic}">
<button type="submit">Run</button>
</form>
{body}
</body>
</html>
"#,
        title = TITLE,
        topic = escape(topic).replace('"', "&quot;"),
        body = body,
    )
}

fn render_digest(digest: &Digest) -> String {
    format!(
        "<section class=\"summary\">\n<p>{}</p>\n</section>\n<h3>Run Steps</h3>\n<pre><code>{}</code></pre>\n",
        escape(&digest.summary).replace('\n', "<br>\n"),
        escape(&numbered_steps(&digest.run_steps)),
    )
}

fn render_error(message: &str) -> String {
    format!("<p class=\"error\">{}</p>\n", escape(message))
}

/// Pretty-printed run steps with line numbers.
fn numbered_steps(steps: &[RunStep]) -> String {
    let json = serde_json::to_string_pretty(steps).unwrap_or_else(|e| {
        log::error!("Failed to render run steps: {}", e);
        "[]".to_string()
    });

    let width = json.lines().count().to_string().len();
    json.lines()
        .enumerate()
        .map(|(i, line)| format!("{:>width$}  {}", i + 1, line, width = width))
        .collect::<Vec<_>>()
        .join("\n")
}
