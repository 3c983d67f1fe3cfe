mod events;
mod news;
mod weather;

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use time::macros::format_description;
use time::Date;
use tracing::{debug, warn};

use crate::config::ContextConfig;
use crate::error::ContextError;
use crate::strategy::Strategy;

pub use events::{city_of, Coordinates, EventClient};
pub use news::{first_headline, NewsClient};
pub use weather::{describe_condition, WeatherClient};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Weather {
    pub description: String,
    pub city: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearbyEvent {
    pub title: String,
    pub venue: String,
    pub city: String,
    /// Provider timestamp, e.g. `2026-10-16T19:00:00Z`.
    pub starts_at: String,
}

impl NearbyEvent {
    pub fn start_date(&self) -> Option<Date> {
        let day = self.starts_at.get(..10)?;
        Date::parse(day, format_description!("[year]-[month]-[day]")).ok()
    }
}

/// Outcome of a best-effort context lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    Unavailable,
}

impl<T> Default for Lookup<T> {
    fn default() -> Self {
        Lookup::Unavailable
    }
}

impl<T> Lookup<T> {
    pub fn found(&self) -> Option<&T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Unavailable => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    fn from_result(result: Result<T, ContextError>, what: &'static str) -> Self {
        match result {
            Ok(value) => Lookup::Found(value),
            Err(err) => {
                warn!(lookup = what, "Context unavailable: {}", err);
                Lookup::Unavailable
            }
        }
    }
}

/// Live facts a prompt may fold in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveContext {
    pub weather: Lookup<Weather>,
    pub headline: Lookup<String>,
    pub event: Lookup<NearbyEvent>,
}

#[async_trait]
pub trait ContextEnricher: Send + Sync {
    async fn weather(&self, location: &str) -> Result<Weather, ContextError>;
    async fn headline(&self, city: &str) -> Result<String, ContextError>;
    async fn nearby_event(&self, location: &str) -> Result<NearbyEvent, ContextError>;
}

/// Collects the facts `strategy` uses. Lookup failures are logged and
/// recorded as [`Lookup::Unavailable`]; this never fails.
pub async fn gather(
    enricher: &dyn ContextEnricher,
    strategy: Strategy,
    location: &str,
) -> LiveContext {
    match strategy {
        Strategy::Baity | Strategy::Opinion => {
            let weather = Lookup::from_result(enricher.weather(location).await, "weather");
            let city = weather
                .found()
                .map(|weather| weather.city.as_str())
                .filter(|city| !city.is_empty())
                .unwrap_or_else(|| city_of(location))
                .to_string();
            let headline = Lookup::from_result(enricher.headline(&city).await, "headline");

            LiveContext {
                weather,
                headline,
                event: Lookup::Unavailable,
            }
        }
        Strategy::Event => LiveContext {
            event: Lookup::from_result(enricher.nearby_event(location).await, "event"),
            ..LiveContext::default()
        },
    }
}

/// Fetches context from weatherapi.com, Google News RSS, Nominatim and
/// PredictHQ.
#[derive(Debug, Clone)]
pub struct HttpContextEnricher {
    weather: WeatherClient,
    news: NewsClient,
    events: EventClient,
}

impl HttpContextEnricher {
    pub fn from_config(config: &ContextConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("caption-forge/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(config.request_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build context HTTP client")?;

        let parse = |raw: &str, name: &str| {
            Url::parse(raw).with_context(|| format!("Invalid {name} endpoint: {raw}"))
        };

        let weather_key = non_empty_env("WEATHER_API_KEY");
        let events_token = non_empty_env("PREDICTHQ_TOKEN");
        if weather_key.is_none() {
            debug!("Weather lookups disabled - missing WEATHER_API_KEY");
        }
        if events_token.is_none() {
            debug!("Event lookups disabled - missing PREDICTHQ_TOKEN");
        }

        Ok(Self {
            weather: WeatherClient::new(
                client.clone(),
                parse(&config.weather_endpoint, "weather")?,
                weather_key,
            ),
            news: NewsClient::new(client.clone(), parse(&config.news_endpoint, "news")?),
            events: EventClient::new(
                client,
                parse(&config.geocode_endpoint, "geocode")?,
                parse(&config.events_endpoint, "events")?,
                events_token,
                config.event_radius_km,
            ),
        })
    }
}

#[async_trait]
impl ContextEnricher for HttpContextEnricher {
    async fn weather(&self, location: &str) -> Result<Weather, ContextError> {
        self.weather.fetch(location).await
    }

    async fn headline(&self, city: &str) -> Result<String, ContextError> {
        self.news.fetch(city).await
    }

    async fn nearby_event(&self, location: &str) -> Result<NearbyEvent, ContextError> {
        self.events.fetch(location).await
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
