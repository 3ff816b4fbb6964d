//! Current-weather lookup tool backed by OpenWeatherMap.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::errors::ToolError;

use super::{optional_str, required_str, Tool, ToolOutput, TOOL_TIMEOUT};

const WEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

pub struct WeatherTool {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl WeatherTool {
    pub fn new(api_key: Option<String>) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder().timeout(TOOL_TIMEOUT).build()?;
        Ok(Self {
            api_key,
            base_url: WEATHER_API_URL.to_string(),
            client,
        })
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "weather_fetch"
    }

    fn description(&self) -> &str {
        "Get current weather information for any city. Returns temperature, conditions, \
         humidity, wind speed, and description. Use this when user asks about weather or \
         temperature in a location."
    }

    async fn execute(&self, params: &Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let city = required_str(params, "city")?;
        let units = optional_str(params, "units").unwrap_or("metric");

        // Missing key is terminal: the "not configured" wording stops retries.
        let Some(api_key) = &self.api_key else {
            return Ok(ToolOutput::fail(
                "OPENWEATHER_API_KEY not configured. Get free API key from \
                 https://openweathermap.org/api",
            ));
        };
        debug!(city, units, "fetching current weather");

        let response = match self
            .client
            .get(&self.base_url)
            .query(&[("q", city), ("appid", api_key), ("units", units)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Ok(ToolOutput::fail("Weather API request timed out"))
            }
            Err(e) => return Ok(ToolOutput::fail(format!("Weather tool error: {e}"))),
        };

        match response.status() {
            StatusCode::OK => {
                let body: Value = match response.json().await {
                    Ok(body) => body,
                    Err(e) => return Ok(ToolOutput::fail(format!("Weather tool error: {e}"))),
                };
                Ok(ToolOutput::ok(weather_payload(&body, units)))
            }
            StatusCode::UNAUTHORIZED => Ok(ToolOutput::fail("Invalid OpenWeatherMap API key")),
            StatusCode::NOT_FOUND => Ok(ToolOutput::fail(format!("City '{city}' not found"))),
            status => Ok(ToolOutput::fail(format!(
                "Weather API error: {}",
                status.as_u16()
            ))),
        }
    }
}

fn weather_payload(body: &Value, units: &str) -> Value {
    json!({
        "city": body.get("name").cloned().unwrap_or(Value::Null),
        "country": body.pointer("/sys/country").cloned().unwrap_or(Value::Null),
        "temperature": body.pointer("/main/temp").cloned().unwrap_or(Value::Null),
        "feels_like": body.pointer("/main/feels_like").cloned().unwrap_or(Value::Null),
        "humidity": body.pointer("/main/humidity").cloned().unwrap_or(Value::Null),
        "description": body
            .pointer("/weather/0/description")
            .and_then(Value::as_str)
            .unwrap_or(""),
        "wind_speed": body.pointer("/wind/speed").cloned().unwrap_or(Value::Null),
        "units": if units == "metric" { "°C" } else { "°F" },
    })
}
