//! Current conditions from the OpenWeatherMap API.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use hyper::StatusCode;
use ops_adapters::http_client::HttpsClient;
use ops_primitives::{FieldSchema, FieldType, ObjectSchema};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;
use url::Url;

use crate::fetch::{FetchError, JsonFetcher, endpoint, parse_base};
use crate::tool::{Tool, ToolError, ToolOutcome, ToolResult, decode_parameters};

/// Environment variable holding the OpenWeatherMap key.
pub const OPENWEATHER_API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Production API root.
pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const NAME: &str = "get_weather";
const DESCRIPTION: &str = "Get current weather information for a city including temperature, conditions, humidity, and wind speed";

/// Temperature unit system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Celsius, metres per second.
    #[default]
    Metric,
    /// Fahrenheit, miles per hour.
    Imperial,
}

impl Units {
    /// Query-string value understood by the API.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }

    /// Display symbol for temperatures.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Metric => "°C",
            Self::Imperial => "°F",
        }
    }
}

#[derive(Debug, Deserialize)]
struct WeatherParams {
    city: String,
    units: Units,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    name: String,
    sys: Sys,
    main: Readings,
    weather: Vec<Condition>,
    wind: Wind,
}

#[derive(Debug, Deserialize)]
struct Sys {
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct Readings {
    temp: f64,
    feels_like: f64,
    humidity: Value,
    pressure: Value,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

fn weather_schema() -> ObjectSchema {
    ObjectSchema::new("WeatherParams")
        .field(
            FieldSchema::required("city", FieldType::String)
                .describe("City name (e.g., 'London', 'New York', 'Mumbai')"),
        )
        .field(
            FieldSchema::optional("units", FieldType::String)
                .describe("Temperature units: metric (Celsius) or imperial (Fahrenheit)")
                .with_choices(["metric", "imperial"])
                .with_default("metric"),
        )
}

/// `get_weather` tool.
pub struct WeatherTool {
    api_key: String,
    base_url: Url,
    fetcher: JsonFetcher,
    schema: ObjectSchema,
}

impl fmt::Debug for WeatherTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherTool")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl WeatherTool {
    /// Creates the tool with the production endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Configuration`] when `api_key` is blank.
    pub fn new(api_key: impl Into<String>, client: HttpsClient) -> ToolResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ToolError::configuration(format!(
                "{OPENWEATHER_API_KEY_ENV} environment variable is required"
            )));
        }

        Ok(Self {
            api_key,
            base_url: parse_base(DEFAULT_WEATHER_BASE_URL).map_err(ToolError::configuration)?,
            fetcher: JsonFetcher::new(client, "openweathermap"),
            schema: weather_schema(),
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

    fn request_url(&self, params: &WeatherParams) -> Result<Url, FetchError> {
        let mut url = endpoint(&self.base_url, "weather")?;
        url.query_pairs_mut()
            .append_pair("q", &params.city)
            .append_pair("appid", &self.api_key)
            .append_pair("units", params.units.as_str());
        Ok(url)
    }
}

fn summarize(body: CurrentWeather, units: Units) -> Result<Value, String> {
    let conditions = body
        .weather
        .into_iter()
        .next()
        .map(|condition| condition.description)
        .ok_or_else(|| "Unexpected error: response carried no weather conditions".to_owned())?;

    Ok(json!({
        "city": body.name,
        "country": body.sys.country,
        "temperature": body.main.temp,
        "feels_like": body.main.feels_like,
        "humidity": body.main.humidity,
        "pressure": body.main.pressure,
        "conditions": conditions,
        "wind_speed": body.wind.speed,
        "units": units.symbol(),
    }))
}

#[async_trait]
impl Tool for WeatherTool {
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
        let params: WeatherParams = match decode_parameters(&self.schema, parameters) {
            Ok(params) => params,
            Err(message) => return Ok(ToolOutcome::Failure(message)),
        };
        let url = match self.request_url(&params) {
            Ok(url) => url,
            Err(err) => return Ok(ToolOutcome::failure(format!("Weather API request failed: {err}"))),
        };

        debug!(city = %params.city, units = params.units.as_str(), "fetching weather");
        let outcome = match self.fetcher.get_json::<CurrentWeather>(&url, &[]).await {
            Ok(body) => match summarize(body, params.units) {
                Ok(data) => ToolOutcome::Success(data),
                Err(message) => ToolOutcome::Failure(message),
            },
            Err(err) if err.status() == Some(StatusCode::NOT_FOUND) => {
                ToolOutcome::failure(format!("City '{}' not found", params.city))
            }
            Err(FetchError::Decode(reason)) => ToolOutcome::failure(format!("Unexpected error: {reason}")),
            Err(err) => ToolOutcome::failure(format!("Weather API request failed: {err}")),
        };
        Ok(outcome)
    }
}
