//! Repository search against the GitHub REST API.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use hyper::header::{AUTHORIZATION, HeaderName, HeaderValue};
use ops_adapters::http_client::HttpsClient;
use ops_primitives::{FieldSchema, FieldType, ObjectSchema};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;
use url::Url;

use crate::fetch::{FetchError, JsonFetcher, endpoint, parse_base};
use crate::tool::{Tool, ToolError, ToolOutcome, ToolResult, decode_parameters};

/// Environment variable holding an optional GitHub token.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Production API root.
pub const DEFAULT_GITHUB_BASE_URL: &str = "https://api.github.com";

const NAME: &str = "github_search";
const DESCRIPTION: &str = "Search GitHub repositories and get repository information including stars, forks, and description";
const DEFAULT_LIMIT: i64 = 5;
const MAX_LIMIT: i64 = 10;
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    sort: String,
    limit: i64,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    items: Vec<Repository>,
}

#[derive(Debug, Deserialize)]
struct Repository {
    name: String,
    full_name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    language: Option<String>,
    html_url: String,
    #[serde(default)]
    updated_at: Option<String>,
}

fn search_schema() -> ObjectSchema {
    ObjectSchema::new("GithubSearchParams")
        .field(
            FieldSchema::required("query", FieldType::String)
                .describe("Search query for repositories (e.g., 'machine learning python')"),
        )
        .field(
            FieldSchema::optional("sort", FieldType::String)
                .describe("Sort by: stars, forks, updated")
                .with_choices(["stars", "forks", "updated"])
                .with_default("stars"),
        )
        .field(
            FieldSchema::optional("limit", FieldType::Integer)
                .describe("Number of results to return (1-10)")
                .with_default(DEFAULT_LIMIT),
        )
}

/// `github_search` tool. Works anonymously; a token raises the rate limit.
pub struct GithubSearchTool {
    token: Option<HeaderValue>,
    base_url: Url,
    fetcher: JsonFetcher,
    schema: ObjectSchema,
}

impl fmt::Debug for GithubSearchTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubSearchTool")
            .field("authenticated", &self.token.is_some())
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl GithubSearchTool {
    /// Creates the tool; blank tokens are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Configuration`] when the token is not a valid
    /// header value.
    pub fn new(token: Option<&str>, client: HttpsClient) -> ToolResult<Self> {
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| {
                let mut value = HeaderValue::from_str(&format!("token {token}")).map_err(|_| {
                    ToolError::configuration(format!("{GITHUB_TOKEN_ENV} contains invalid characters"))
                })?;
                value.set_sensitive(true);
                Ok::<_, ToolError>(value)
            })
            .transpose()?;

        Ok(Self {
            token,
            base_url: parse_base(DEFAULT_GITHUB_BASE_URL).map_err(ToolError::configuration)?,
            fetcher: JsonFetcher::new(client, "github"),
            schema: search_schema(),
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

    fn request_url(&self, params: &SearchParams) -> Result<Url, FetchError> {
        let mut url = endpoint(&self.base_url, "search/repositories")?;
        url.query_pairs_mut()
            .append_pair("q", &params.query)
            .append_pair("sort", &params.sort)
            .append_pair("order", "desc")
            .append_pair("per_page", &params.limit.clamp(1, MAX_LIMIT).to_string());
        Ok(url)
    }

    fn headers(&self) -> Vec<(HeaderName, HeaderValue)> {
        let mut headers = vec![(
            hyper::header::ACCEPT,
            HeaderValue::from_static(GITHUB_MEDIA_TYPE),
        )];
        if let Some(token) = &self.token {
            headers.push((AUTHORIZATION, token.clone()));
        }
        headers
    }
}

fn summarize(page: SearchPage) -> Value {
    let repositories: Vec<Value> = page
        .items
        .into_iter()
        .map(|repo| {
            json!({
                "name": repo.name,
                "full_name": repo.full_name,
                "description": repo.description,
                "stars": repo.stargazers_count,
                "forks": repo.forks_count,
                "language": repo.language,
                "url": repo.html_url,
                "updated_at": repo.updated_at,
            })
        })
        .collect();

    json!({
        "total_count": page.total_count,
        "repositories": repositories,
    })
}

#[async_trait]
impl Tool for GithubSearchTool {
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
        let params: SearchParams = match decode_parameters(&self.schema, parameters) {
            Ok(params) => params,
            Err(message) => return Ok(ToolOutcome::Failure(message)),
        };
        let url = match self.request_url(&params) {
            Ok(url) => url,
            Err(err) => return Ok(ToolOutcome::failure(format!("GitHub API request failed: {err}"))),
        };

        debug!(query = %params.query, sort = %params.sort, "searching repositories");
        let outcome = match self.fetcher.get_json::<SearchPage>(&url, &self.headers()).await {
            Ok(page) => ToolOutcome::Success(summarize(page)),
            Err(FetchError::Decode(reason)) => ToolOutcome::failure(format!("Unexpected error: {reason}")),
            Err(err) => ToolOutcome::failure(format!("GitHub API request failed: {err}")),
        };
        Ok(outcome)
    }
}
