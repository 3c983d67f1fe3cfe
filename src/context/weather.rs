use reqwest::{Client, Url};
use serde::Deserialize;

use super::Weather;
use crate::error::ContextError;

const PROVIDER_NAME: &str = "weatherapi";

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl WeatherClient {
    pub fn new(client: Client, endpoint: Url, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint,
            api_key,
        }
    }

    pub async fn fetch(&self, location: &str) -> Result<Weather, ContextError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ContextError::MissingCredential("WEATHER_API_KEY"))?;

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("key", api_key)
            .append_pair("q", location)
            .append_pair("aqi", "no");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ContextError::http(PROVIDER_NAME, err))?;

        if !response.status().is_success() {
            return Err(ContextError::status(PROVIDER_NAME, response.status()));
        }

        let payload: WeatherResponse = response
            .json()
            .await
            .map_err(|err| ContextError::response(PROVIDER_NAME, err.to_string()))?;

        Ok(Weather {
            description: describe_condition(&payload.current.condition.text),
            city: payload.location.name,
            region: payload.location.region,
        })
    }
}

/// Turns a provider condition label into something that reads naturally in a
/// caption.
pub fn describe_condition(condition: &str) -> String {
    let condition = condition.trim().to_lowercase();
    match condition.as_str() {
        "sunny" => "bright and sunny".to_string(),
        "cloudy" => "a bit cloudy".to_string(),
        "rainy" => "a little rainy".to_string(),
        "clear" => "clear and beautiful".to_string(),
        "snowy" => "a winter wonderland".to_string(),
        _ => condition,
    }
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    location: WeatherLocation,
    current: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct WeatherLocation {
    name: String,
    #[serde(default)]
    region: String,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    condition: Condition,
}

#[derive(Debug, Deserialize)]
struct Condition {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_conditions_get_friendly_wording() {
        assert_eq!(describe_condition("Sunny"), "bright and sunny");
        assert_eq!(describe_condition(" clear "), "clear and beautiful");
        assert_eq!(describe_condition("Patchy rain nearby"), "patchy rain nearby");
    }

    #[test]
    fn parses_weatherapi_payload() {
        let payload = r#"{
            "location": {"name": "Austin", "region": "Texas", "country": "USA"},
            "current": {"temp_c": 31.0, "condition": {"text": "Partly cloudy", "code": 1003}}
        }"#;
        let parsed: WeatherResponse = serde_json::from_str(payload).expect("parse");
        assert_eq!(parsed.location.name, "Austin");
        assert_eq!(parsed.location.region, "Texas");
        assert_eq!(parsed.current.condition.text, "Partly cloudy");
    }
}
