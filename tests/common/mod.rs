//! Shared fixtures: fake upstream providers served by axum on port 0.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;

/// What the fake completion endpoint answers with.
#[derive(Clone)]
pub enum Reply {
    Text(&'static str),
    Status(StatusCode),
}

#[derive(Clone)]
pub struct Upstream {
    reply: Reply,
    pub completions: Arc<Mutex<Vec<RecordedCall>>>,
    pub queries: Arc<Mutex<Vec<(String, HashMap<String, String>)>>>,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub authorization: Option<String>,
    pub body: Value,
}

pub struct FakeUpstream {
    pub base: String,
    pub state: Upstream,
}

impl FakeUpstream {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn completion_calls(&self) -> Vec<RecordedCall> {
        self.state.completions.lock().unwrap().clone()
    }

    pub fn queries_for(&self, path: &str) -> Vec<HashMap<String, String>> {
        self.state
            .queries
            .lock()
            .unwrap()
            .iter()
            .filter(|(recorded, _)| recorded == path)
            .map(|(_, query)| query.clone())
            .collect()
    }
}

/// Spawns one server that plays the completion backend and every context
/// provider.
pub async fn spawn_upstream(reply: Reply) -> FakeUpstream {
    let state = Upstream {
        reply,
        completions: Arc::default(),
        queries: Arc::default(),
    };

    let router = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/weather/current.json", get(weather))
        .route("/news/rss/search", get(news))
        .route("/geocode/search", get(geocode))
        .route("/events/v1/events/", get(events))
        .with_state(state.clone());

    let addr = serve(router).await;
    FakeUpstream {
        base: format!("http://{addr}"),
        state,
    }
}

pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn chat_completions(
    State(state): State<Upstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let authorization = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state
        .completions
        .lock()
        .unwrap()
        .push(RecordedCall { authorization, body });

    match state.reply {
        Reply::Text(text) => (
            StatusCode::OK,
            Json(json!({
                "id": "chatcmpl-test",
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": text},
                    "finish_reason": "stop"
                }]
            })),
        ),
        Reply::Status(status) => (
            status,
            Json(json!({"error": {"message": "upstream is overloaded", "type": "server_error"}})),
        ),
    }
}

fn record(state: &Upstream, path: &str, query: HashMap<String, String>) {
    state
        .queries
        .lock()
        .unwrap()
        .push((path.to_string(), query));
}

async fn weather(
    State(state): State<Upstream>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    record(&state, "weather", query);
    Json(json!({
        "location": {"name": "Austin", "region": "Texas", "country": "USA"},
        "current": {"temp_c": 31.0, "condition": {"text": "Sunny", "code": 1000}}
    }))
}

async fn news(
    State(state): State<Upstream>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    record(&state, "news", query);
    (
        [("content-type", "application/rss+xml; charset=utf-8")],
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>"Austin news" - Google News</title>
    <item>
      <title>City council approves new bike lanes - Austin Chronicle</title>
      <link>https://example.com/1</link>
    </item>
    <item>
      <title>Second story</title>
    </item>
  </channel>
</rss>"#,
    )
}

async fn geocode(
    State(state): State<Upstream>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    record(&state, "geocode", query);
    Json(json!([{"place_id": 1, "lat": "30.2711286", "lon": "-97.7436995", "display_name": "Austin, Texas"}]))
}

async fn events(
    State(state): State<Upstream>,
    headers: HeaderMap,
    Query(mut query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        query.insert("authorization".into(), auth.to_string());
    }
    record(&state, "events", query);
    Json(json!({
        "count": 1,
        "results": [{
            "title": "Jazz on the Lawn",
            "start": "2026-10-17T01:00:00Z",
            "venue": {"label": "Zilker Park"}
        }]
    }))
}
