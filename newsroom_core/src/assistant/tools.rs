use serde::Deserialize;
use serde_json::json;

use super::dto::{ToolCall, ToolOutput, ToolSpec};
use crate::error::DispatchError;
use crate::news::NewsClient;

pub const GET_NEWS: &str = "get_news";

#[derive(Debug, Deserialize)]
struct GetNewsArgs {
    topic: String,
}

/// Get news tool - lets the assistant ask for articles on a topic
pub fn get_news_tool() -> ToolSpec {
    ToolSpec::function(
        GET_NEWS,
        "Get the list of articles/news for the given topic",
        json!({
            "type": "object",
            "properties": {
                "topic": {
                    "type": "string",
                    "description": "The topic for the news, e.g. bitcoin"
                }
            },
            "required": ["topic"]
        }),
    )
}

pub fn get_all_custom_tools() -> Vec<ToolSpec> {
    vec![get_news_tool()]
}

/// Maps pending tool calls from a run to locally computed outputs.
#[derive(Clone)]
pub struct ToolDispatcher {
    news: NewsClient,
}

impl ToolDispatcher {
    pub fn new(news: NewsClient) -> Self {
        Self { news }
    }

    /// Execute every call in the batch. Fails on the first call it cannot
    /// handle, in which case no outputs are returned.
    pub async fn dispatch(&self, calls: &[ToolCall]) -> Result<Vec<ToolOutput>, DispatchError> {
        let mut tool_outputs = Vec::with_capacity(calls.len());

        for call in calls {
            let name = call.function.name.as_str();
            log::info!("Executing custom tool: {}", name);

            let output = match name {
                GET_NEWS => {
                    let args: GetNewsArgs = serde_json::from_str(&call.function.arguments)
                        .map_err(|source| DispatchError::InvalidArguments {
                            name: name.to_string(),
                            source,
                        })?;
                    let articles = self.news.fetch_articles(&args.topic).await;
                    log::info!("get_news returned {} articles for '{}'", articles.len(), args.topic);
                    articles.concat()
                }
                _ => return Err(DispatchError::UnknownTool(name.to_string())),
            };

            tool_outputs.push(ToolOutput {
                tool_call_id: call.id.clone(),
                output,
            });
        }

        Ok(tool_outputs)
    }
}
