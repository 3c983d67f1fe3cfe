use quick_xml::de::from_str;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::ContextError;

const PROVIDER_NAME: &str = "google-news";

#[derive(Debug, Clone)]
pub struct NewsClient {
    client: Client,
    endpoint: Url,
}

impl NewsClient {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    /// Title of the top RSS result for local news about `city`.
    pub async fn fetch(&self, city: &str) -> Result<String, ContextError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", &format!("{city} news"))
            .append_pair("hl", "en-US")
            .append_pair("gl", "US")
            .append_pair("ceid", "US:en");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ContextError::http(PROVIDER_NAME, err))?;

        if !response.status().is_success() {
            return Err(ContextError::status(PROVIDER_NAME, response.status()));
        }

        let body = response
            .text()
            .await
            .map_err(|err| ContextError::http(PROVIDER_NAME, err))?;

        first_headline(&body)
    }
}

pub fn first_headline(feed: &str) -> Result<String, ContextError> {
    let rss: Rss =
        from_str(feed).map_err(|err| ContextError::response(PROVIDER_NAME, err.to_string()))?;

    rss.channel
        .items
        .into_iter()
        .filter_map(|item| item.title)
        .map(|title| title.trim().to_string())
        .find(|title| !title.is_empty())
        .ok_or(ContextError::Empty {
            provider: PROVIDER_NAME,
        })
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
}
