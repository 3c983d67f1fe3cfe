use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use super::NearbyEvent;
use crate::error::ContextError;

const GEOCODER_NAME: &str = "nominatim";
const PROVIDER_NAME: &str = "predicthq";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone)]
pub struct EventClient {
    client: Client,
    geocode_endpoint: Url,
    events_endpoint: Url,
    token: Option<String>,
    radius_km: u32,
}

impl EventClient {
    pub fn new(
        client: Client,
        geocode_endpoint: Url,
        events_endpoint: Url,
        token: Option<String>,
        radius_km: u32,
    ) -> Self {
        Self {
            client,
            geocode_endpoint,
            events_endpoint,
            token,
            radius_km,
        }
    }

    pub async fn geocode(&self, location: &str) -> Result<Coordinates, ContextError> {
        let mut url = self.geocode_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", location)
            .append_pair("format", "json")
            .append_pair("limit", "1");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ContextError::http(GEOCODER_NAME, err))?;

        if !response.status().is_success() {
            return Err(ContextError::status(GEOCODER_NAME, response.status()));
        }

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|err| ContextError::response(GEOCODER_NAME, err.to_string()))?;

        let place = places.into_iter().next().ok_or(ContextError::Empty {
            provider: GEOCODER_NAME,
        })?;
        place.coordinates()
    }

    /// The first active event within the configured radius of `location`.
    pub async fn fetch(&self, location: &str) -> Result<NearbyEvent, ContextError> {
        let token = self
            .token
            .as_deref()
            .ok_or(ContextError::MissingCredential("PREDICTHQ_TOKEN"))?;

        let coords = self.geocode(location).await?;
        debug!(lat = coords.lat, lon = coords.lon, "Geocoded {}", location);

        let mut url = self.events_endpoint.clone();
        url.query_pairs_mut()
            .append_pair(
                "within",
                &format!("{}km@{},{}", self.radius_km, coords.lat, coords.lon),
            )
            .append_pair("active", "true")
            .append_pair("limit", "1");

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| ContextError::http(PROVIDER_NAME, err))?;

        if !response.status().is_success() {
            return Err(ContextError::status(PROVIDER_NAME, response.status()));
        }

        let payload: EventsResponse = response
            .json()
            .await
            .map_err(|err| ContextError::response(PROVIDER_NAME, err.to_string()))?;

        to_nearby_event(payload, location)
    }
}

fn to_nearby_event(payload: EventsResponse, location: &str) -> Result<NearbyEvent, ContextError> {
    let event = payload
        .results
        .into_iter()
        .next()
        .ok_or(ContextError::Empty {
            provider: PROVIDER_NAME,
        })?;

    Ok(NearbyEvent {
        title: event.title,
        venue: event.venue.and_then(|venue| venue.label).unwrap_or_default(),
        city: city_of(location).to_string(),
        starts_at: event.start,
    })
}

/// The part of a free-form location before the first comma.
pub fn city_of(location: &str) -> &str {
    location.split(',').next().unwrap_or(location).trim()
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

impl Place {
    fn coordinates(&self) -> Result<Coordinates, ContextError> {
        let parse = |raw: &str| {
            raw.trim()
                .parse::<f64>()
                .map_err(|err| ContextError::response(GEOCODER_NAME, err.to_string()))
        };
        Ok(Coordinates {
            lat: parse(&self.lat)?,
            lon: parse(&self.lon)?,
        })
    }
}

#[derive(Debug, Deserialize, Default)]
struct EventsResponse {
    #[serde(default)]
    results: Vec<EventRecord>,
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    #[serde(default)]
    title: String,
    #[serde(default)]
    start: String,
    venue: Option<Venue>,
}

#[derive(Debug, Deserialize)]
struct Venue {
    label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_is_first_location_segment() {
        assert_eq!(city_of("Austin, TX"), "Austin");
        assert_eq!(city_of("Lisbon"), "Lisbon");
    }

    #[test]
    fn parses_nominatim_coordinates() {
        let payload = r#"[{"place_id": 1, "lat": "30.2711286", "lon": "-97.7436995"}]"#;
        let places: Vec<Place> = serde_json::from_str(payload).expect("parse");
        let coords = places[0].coordinates().expect("coords");
        assert!((coords.lat - 30.2711286).abs() < 1e-9);
        assert!((coords.lon + 97.7436995).abs() < 1e-9);
    }

    #[test]
    fn maps_first_event_result() {
        let payload = r#"{"count": 2, "results": [
            {"title": "Jazz on the Lawn", "start": "2026-10-16T19:00:00Z", "venue": {"label": "Zilker Park"}},
            {"title": "Other"}
        ]}"#;
        let parsed: EventsResponse = serde_json::from_str(payload).expect("parse");
        let event = to_nearby_event(parsed, "Austin, TX").expect("event");
        assert_eq!(event.title, "Jazz on the Lawn");
        assert_eq!(event.venue, "Zilker Park");
        assert_eq!(event.city, "Austin");
        assert_eq!(event.starts_at, "2026-10-16T19:00:00Z");
    }

    #[test]
    fn no_results_is_unavailable() {
        let parsed: EventsResponse = serde_json::from_str(r#"{"results": []}"#).expect("parse");
        assert!(matches!(
            to_nearby_event(parsed, "Austin"),
            Err(ContextError::Empty { .. })
        ));
    }
}
