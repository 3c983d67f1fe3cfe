//! Context fetchers against fake providers on a random local port.

mod common;

use std::time::Duration;

use caption_forge::context::{EventClient, NewsClient, WeatherClient};
use caption_forge::ContextError;
use common::{spawn_upstream, Reply};
use reqwest::{Client, Url};

fn client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn weather_maps_condition_and_sends_key() {
    let upstream = spawn_upstream(Reply::Text("unused")).await;
    let weather = WeatherClient::new(
        client(),
        Url::parse(&upstream.url("/weather/current.json")).unwrap(),
        Some("weather-key".into()),
    );

    let result = weather.fetch("Austin, TX").await.unwrap();
    assert_eq!(result.description, "bright and sunny");
    assert_eq!(result.city, "Austin");
    assert_eq!(result.region, "Texas");

    let queries = upstream.queries_for("weather");
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0]["key"], "weather-key");
    assert_eq!(queries[0]["q"], "Austin, TX");
    assert_eq!(queries[0]["aqi"], "no");
}

#[tokio::test]
async fn weather_without_key_makes_no_request() {
    let upstream = spawn_upstream(Reply::Text("unused")).await;
    let weather = WeatherClient::new(
        client(),
        Url::parse(&upstream.url("/weather/current.json")).unwrap(),
        None,
    );

    let err = weather.fetch("Austin, TX").await.unwrap_err();
    assert!(matches!(err, ContextError::MissingCredential("WEATHER_API_KEY")));
    assert!(upstream.queries_for("weather").is_empty());
}

#[tokio::test]
async fn news_returns_first_rss_title() {
    let upstream = spawn_upstream(Reply::Text("unused")).await;
    let news = NewsClient::new(client(), Url::parse(&upstream.url("/news/rss/search")).unwrap());

    let headline = news.fetch("Austin").await.unwrap();
    assert_eq!(headline, "City council approves new bike lanes - Austin Chronicle");

    let queries = upstream.queries_for("news");
    assert_eq!(queries[0]["q"], "Austin news");
    assert_eq!(queries[0]["ceid"], "US:en");
}

#[tokio::test]
async fn events_geocode_then_search_within_radius() {
    let upstream = spawn_upstream(Reply::Text("unused")).await;
    let events = EventClient::new(
        client(),
        Url::parse(&upstream.url("/geocode/search")).unwrap(),
        Url::parse(&upstream.url("/events/v1/events/")).unwrap(),
        Some("phq-token".into()),
        25,
    );

    let event = events.fetch("Austin, TX").await.unwrap();
    assert_eq!(event.title, "Jazz on the Lawn");
    assert_eq!(event.venue, "Zilker Park");
    assert_eq!(event.city, "Austin");
    assert_eq!(event.starts_at, "2026-10-17T01:00:00Z");

    let geocode = upstream.queries_for("geocode");
    assert_eq!(geocode[0]["q"], "Austin, TX");
    assert_eq!(geocode[0]["format"], "json");
    assert_eq!(geocode[0]["limit"], "1");

    let search = upstream.queries_for("events");
    assert_eq!(search[0]["within"], "25km@30.2711286,-97.7436995");
    assert_eq!(search[0]["active"], "true");
    assert_eq!(search[0]["authorization"], "Bearer phq-token");
}

#[tokio::test]
async fn unreachable_provider_is_an_http_error() {
    let news = NewsClient::new(client(), Url::parse("http://127.0.0.1:9/rss").unwrap());
    let err = news.fetch("Austin").await.unwrap_err();
    assert!(matches!(err, ContextError::Http { .. }));
}
