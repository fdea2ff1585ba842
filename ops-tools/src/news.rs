//! Headlines and article search from NewsAPI.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use ops_adapters::http_client::HttpsClient;
use ops_primitives::{FieldSchema, FieldType, ObjectSchema};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;
use url::Url;

use crate::fetch::{FetchError, JsonFetcher, endpoint, parse_base};
use crate::tool::{Tool, ToolError, ToolOutcome, ToolResult, decode_parameters};

/// Environment variable holding the NewsAPI key.
pub const NEWS_API_KEY_ENV: &str = "NEWS_API_KEY";

/// Production API root.
pub const DEFAULT_NEWS_BASE_URL: &str = "https://newsapi.org/v2";

/// Categories accepted by the headlines endpoint.
pub const NEWS_CATEGORIES: [&str; 6] = [
    "business",
    "technology",
    "sports",
    "entertainment",
    "health",
    "science",
];

const NAME: &str = "get_news";
const DESCRIPTION: &str = "Get latest news articles on a specific topic or from a category";
const DEFAULT_LIMIT: i64 = 5;
const MAX_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
struct NewsParams {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    category: Option<String>,
    limit: i64,
}

/// Which NewsAPI endpoint a request resolves to.
#[derive(Debug, PartialEq, Eq)]
enum Search<'a> {
    Everything(&'a str),
    Category(&'a str),
    UsHeadlines,
}

impl NewsParams {
    fn search(&self) -> Search<'_> {
        fn non_blank(value: &Option<String>) -> Option<&str> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
        }

        if let Some(query) = non_blank(&self.query) {
            Search::Everything(query)
        } else if let Some(category) = non_blank(&self.category) {
            Search::Category(category)
        } else {
            Search::UsHeadlines
        }
    }

    fn page_size(&self) -> i64 {
        self.limit.clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Listing {
    #[serde(default)]
    total_results: u64,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    source: Source,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Source {
    #[serde(default)]
    name: Option<String>,
}

fn news_schema() -> ObjectSchema {
    ObjectSchema::new("NewsParams")
        .field(
            FieldSchema::optional("query", FieldType::String).describe(
                "Search query for news articles (e.g., 'artificial intelligence', 'climate change')",
            ),
        )
        .field(
            FieldSchema::optional("category", FieldType::String)
                .describe("News category: business, technology, sports, entertainment, health, science")
                .with_choices(NEWS_CATEGORIES),
        )
        .field(
            FieldSchema::optional("limit", FieldType::Integer)
                .describe("Number of articles to return (1-10)")
                .with_default(DEFAULT_LIMIT),
        )
}

/// `get_news` tool.
pub struct NewsTool {
    api_key: String,
    base_url: Url,
    fetcher: JsonFetcher,
    schema: ObjectSchema,
}

impl fmt::Debug for NewsTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewsTool")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl NewsTool {
    /// Creates the tool with the production endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Configuration`] when `api_key` is blank.
    pub fn new(api_key: impl Into<String>, client: HttpsClient) -> ToolResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ToolError::configuration(format!(
                "{NEWS_API_KEY_ENV} environment variable is required"
            )));
        }

        Ok(Self {
            api_key,
            base_url: parse_base(DEFAULT_NEWS_BASE_URL).map_err(ToolError::configuration)?,
            fetcher: JsonFetcher::new(client, "newsapi"),
            schema: news_schema(),
        })
    }

    /// Points the tool at a different API root.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Configuration`] when `base_url` does not parse.
    pub fn with_base_url(mut self, base_url: &str) -> ToolResult<Self> {
        self.base_url = parse_base(base_url).map_err(ToolError::configuration)?;
        Ok(self)
    }

    /// Overrides the request limit.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fetcher = self.fetcher.with_timeout(timeout);
        self
    }

    fn request_url(&self, params: &NewsParams) -> Result<Url, FetchError> {
        let page_size = params.page_size().to_string();
        let url = match params.search() {
            Search::Everything(query) => {
                let mut url = endpoint(&self.base_url, "everything")?;
                url.query_pairs_mut()
                    .append_pair("q", query)
                    .append_pair("apiKey", &self.api_key)
                    .append_pair("pageSize", &page_size)
                    .append_pair("sortBy", "publishedAt")
                    .append_pair("language", "en");
                url
            }
            Search::Category(category) => {
                let mut url = endpoint(&self.base_url, "top-headlines")?;
                url.query_pairs_mut()
                    .append_pair("category", category)
                    .append_pair("apiKey", &self.api_key)
                    .append_pair("pageSize", &page_size)
                    .append_pair("language", "en");
                url
            }
            Search::UsHeadlines => {
                let mut url = endpoint(&self.base_url, "top-headlines")?;
                url.query_pairs_mut()
                    .append_pair("apiKey", &self.api_key)
                    .append_pair("pageSize", &page_size)
                    .append_pair("language", "en")
                    .append_pair("country", "us");
                url
            }
        };
        Ok(url)
    }
}

fn summarize(listing: Listing) -> Value {
    let articles: Vec<Value> = listing
        .articles
        .into_iter()
        .map(|article| {
            json!({
                "title": article.title,
                "description": article.description.unwrap_or_default(),
                "source": article.source.name,
                "author": article.author.unwrap_or_else(|| "Unknown".to_owned()),
                "published_at": article.published_at,
                "url": article.url,
            })
        })
        .collect();

    json!({
        "total_results": listing.total_results,
        "articles": articles,
    })
}

#[async_trait]
impl Tool for NewsTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn parameter_schema(&self) -> &ObjectSchema {
        &self.schema
    }

    async fn invoke(&self, parameters: &Map<String, Value>) -> ToolResult<ToolOutcome> {
        let params: NewsParams = match decode_parameters(&self.schema, parameters) {
            Ok(params) => params,
            Err(message) => return Ok(ToolOutcome::Failure(message)),
        };

        let outcome = match self.request_url(&params) {
            Ok(url) => {
                debug!(search = ?params.search(), limit = params.page_size(), "fetching news");
                match self.fetcher.get_json::<Listing>(&url, &[]).await {
                    Ok(listing) => ToolOutcome::Success(summarize(listing)),
                    Err(FetchError::Decode(reason)) => {
                        ToolOutcome::failure(format!("Unexpected error: {reason}"))
                    }
                    Err(err) => ToolOutcome::failure(format!("News API request failed: {err}")),
                }
            }
            Err(err) => ToolOutcome::failure(format!("News API request failed: {err}")),
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> NewsTool {
        NewsTool::new("news-key", HttpsClient::new()).unwrap()
    }

    fn params(query: Option<&str>, category: Option<&str>, limit: i64) -> NewsParams {
        NewsParams {
            query: query.map(str::to_owned),
            category: category.map(str::to_owned),
            limit,
        }
    }

    #[test]
    fn query_takes_precedence_over_category() {
        let url = tool()
            .request_url(&params(Some("rust language"), Some("technology"), 3))
            .unwrap();
        assert_eq!(url.path(), "/v2/everything");
        assert_eq!(
            url.query(),
            Some("q=rust+language&apiKey=news-key&pageSize=3&sortBy=publishedAt&language=en")
        );
    }

    #[test]
    fn category_uses_top_headlines() {
        let url = tool().request_url(&params(None, Some("science"), 5)).unwrap();
        assert_eq!(url.path(), "/v2/top-headlines");
        assert_eq!(
            url.query(),
            Some("category=science&apiKey=news-key&pageSize=5&language=en")
        );
    }

    #[test]
    fn no_filters_fall_back_to_us_headlines() {
        let url = tool().request_url(&params(Some("  "), None, 5)).unwrap();
        assert_eq!(url.path(), "/v2/top-headlines");
        assert!(url.query().unwrap().ends_with("country=us"));
    }

    #[test]
    fn search_trims_and_skips_blank_filters() {
        assert_eq!(
            params(Some("  rust  "), Some("science"), 5).search(),
            Search::Everything("rust")
        );
        assert_eq!(
            params(Some(""), Some(" health "), 5).search(),
            Search::Category("health")
        );
        assert_eq!(params(None, Some("   "), 5).search(), Search::UsHeadlines);
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(params(None, None, 0).page_size(), 1);
        assert_eq!(params(None, None, 50).page_size(), 10);
        assert_eq!(params(None, None, 7).page_size(), 7);
    }

    #[test]
    fn summary_fills_missing_fields() {
        let listing: Listing = serde_json::from_value(json!({
            "status": "ok",
            "totalResults": 120,
            "articles": [{
                "source": { "id": null, "name": "Example Times" },
                "author": null,
                "title": "Chips get faster",
                "description": null,
                "url": "https://example.com/chips",
                "publishedAt": "2024-05-01T10:00:00Z"
            }]
        }))
        .unwrap();

        assert_eq!(
            summarize(listing),
            json!({
                "total_results": 120,
                "articles": [{
                    "title": "Chips get faster",
                    "description": "",
                    "source": "Example Times",
                    "author": "Unknown",
                    "published_at": "2024-05-01T10:00:00Z",
                    "url": "https://example.com/chips"
                }]
            })
        );
    }

    #[test]
    fn schema_fills_default_limit() {
        let decoded: NewsParams = decode_parameters(&news_schema(), &Map::new()).unwrap();
        assert_eq!(decoded.limit, DEFAULT_LIMIT);
        assert_eq!(decoded.search(), Search::UsHeadlines);
    }
}
