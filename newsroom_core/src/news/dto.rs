use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    pub status: String,
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub articles: Vec<Article>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default)]
    pub source: ArticleSource,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub content: Option<String>,
    pub published_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArticleSource {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl Article {
    /// Plain-text block handed to the assistant as part of a tool output.
    pub fn to_block(&self) -> String {
        format!(
            "\nTitle: {},\nAuthor: {},\nSource: {},\nDescription: {},\nURL: {}\n\n",
            or_na(&self.title),
            or_na(&self.author),
            or_na(&self.source.name),
            or_na(&self.description),
            or_na(&self.url),
        )
    }
}

fn or_na(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("N/A")
}
