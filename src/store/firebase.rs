//! Realtime Database backend
//!
//! Talks to a Firebase Realtime Database over its REST interface. Point
//! operations map to `GET`/`PUT`/`PATCH`/`DELETE` on `<base>/<path>.json`.
//! Collection subscriptions use the server-sent-events stream: `put` and
//! `patch` events are folded into a local copy of the collection, and a full
//! snapshot is emitted after each one.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::error::{FailureReason, StoreFailure};
use super::push_id::PushIdGenerator;
use super::subscription::{self, StoreEvent, Subscription, SubscriptionSink};
use super::tree;
use super::RemoteStore;

/// REST + event-stream client for one database
pub struct FirebaseStore {
    client: Client,
    base_url: String,
    auth: Option<String>,
    request_timeout: Duration,
    buffer: usize,
    keys: PushIdGenerator,
    streams: Mutex<Vec<JoinHandle<()>>>,
}

impl FirebaseStore {
    /// Create a client for the database at `base_url`.
    ///
    /// `auth` is passed through untouched as the `auth` query parameter.
    pub fn new(
        base_url: impl Into<String>,
        auth: Option<String>,
        request_timeout: Duration,
        buffer: usize,
    ) -> Result<Self, StoreFailure> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(StoreFailure::invalid_path(format!(
                "database URL must be http(s): {}",
                base_url
            )));
        }

        let client = Client::builder()
            .connect_timeout(request_timeout)
            .build()
            .map_err(|e| StoreFailure::network(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            auth,
            request_timeout,
            buffer,
            keys: PushIdGenerator::new(),
            streams: Mutex::new(Vec::new()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, tree::segments(path).join("/"))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.auth {
            Some(token) => builder.query(&[("auth", token.as_str())]),
            None => builder,
        }
    }

    /// Send a point request and check its status
    async fn execute(&self, builder: RequestBuilder) -> Result<Response, StoreFailure> {
        let response = builder
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(transport_failure)?;
        check_status(response).await
    }
}

#[async_trait]
impl RemoteStore for FirebaseStore {
    async fn subscribe_collection(&self, path: &str) -> Result<Subscription, StoreFailure> {
        let (sink, subscription) = subscription::channel(path, self.buffer);
        let request = self
            .request(Method::GET, path)
            .header(ACCEPT, "text/event-stream");

        let stream = tokio::spawn(stream_collection(request, sink, path.to_string()));

        let mut streams = self.streams.lock().await;
        streams.retain(|stream| !stream.is_finished());
        streams.push(stream);

        tracing::debug!(path = %path, open = streams.len(), "Collection stream opened");
        Ok(subscription)
    }

    async fn get_by_key(&self, path: &str, key: &str) -> Result<Option<Value>, StoreFailure> {
        tree::validate_key(key)?;
        let response = self
            .execute(self.request(Method::GET, &tree::child_path(path, key)))
            .await?;

        let value: Value = response
            .json()
            .await
            .map_err(|e| StoreFailure::serialization(e.to_string()))?;

        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn set_by_key(&self, path: &str, key: &str, value: Value) -> Result<(), StoreFailure> {
        tree::validate_key(key)?;
        let builder = self
            .request(Method::PUT, &tree::child_path(path, key))
            .query(&[("print", "silent")])
            .json(&value);
        self.execute(builder).await?;
        Ok(())
    }

    async fn update_by_key(
        &self,
        path: &str,
        key: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreFailure> {
        tree::validate_key(key)?;
        let builder = self
            .request(Method::PATCH, &tree::child_path(path, key))
            .query(&[("print", "silent")])
            .json(&fields);
        self.execute(builder).await?;
        Ok(())
    }

    async fn delete_by_key(&self, path: &str, key: &str) -> Result<(), StoreFailure> {
        tree::validate_key(key)?;
        self.execute(self.request(Method::DELETE, &tree::child_path(path, key)))
            .await?;
        Ok(())
    }

    fn generate_key(&self, _path: &str) -> Result<String, StoreFailure> {
        Ok(self.keys.next_id())
    }

    /// Abort every collection stream still running. Their consumers see the
    /// stream close.
    async fn shutdown(&self) {
        let mut streams = self.streams.lock().await;
        let aborted = streams.len();
        for stream in streams.drain(..) {
            stream.abort();
        }
        tracing::info!(
            base_url = %self.base_url,
            aborted,
            "Realtime database client released"
        );
    }
}

// =========================================================================
// Event stream
// =========================================================================

/// Run one collection stream until it fails or the consumer lets go
async fn stream_collection(request: RequestBuilder, sink: SubscriptionSink, path: String) {
    let mut watcher = sink.clone();

    let outcome = tokio::select! {
        _ = watcher.closed() => None,
        result = pump_stream(request, &sink) => Some(result),
    };

    match outcome {
        None => tracing::debug!(path = %path, "Collection stream released"),
        Some(Ok(())) => tracing::debug!(path = %path, "Collection stream ended by consumer"),
        Some(Err(failure)) => {
            tracing::warn!(path = %path, error = %failure, "Collection stream failed");
            sink.send(StoreEvent::Error(failure)).await;
        }
    }
}

async fn pump_stream(request: RequestBuilder, sink: &SubscriptionSink) -> Result<(), StoreFailure> {
    let response = request.send().await.map_err(transport_failure)?;
    let response = check_status(response).await?;

    let mut body = response.bytes_stream();
    let mut parser = SseParser::default();
    let mut collection = Value::Null;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(transport_failure)?;
        for event in parser.feed(&chunk) {
            if apply_stream_event(&mut collection, &event)? == StreamStep::Changed {
                let snapshot = collection.as_object().cloned().unwrap_or_default();
                if !sink.send(StoreEvent::Snapshot(snapshot)).await {
                    return Ok(());
                }
            }
        }
    }

    Err(StoreFailure::disconnected("event stream closed by server"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamStep {
    Changed,
    Idle,
}

#[derive(Debug, Deserialize)]
struct StreamPayload {
    path: String,
    data: Value,
}

/// Fold one stream event into the local copy of the collection
fn apply_stream_event(collection: &mut Value, event: &SseEvent) -> Result<StreamStep, StoreFailure> {
    match event.name.as_str() {
        "put" => {
            let payload: StreamPayload = serde_json::from_str(&event.data)?;
            tree::put(collection, &tree::segments(&payload.path), payload.data);
            Ok(StreamStep::Changed)
        }
        "patch" => {
            let payload: StreamPayload = serde_json::from_str(&event.data)?;
            match payload.data {
                Value::Object(fields) => {
                    tree::patch(collection, &tree::segments(&payload.path), fields);
                    Ok(StreamStep::Changed)
                }
                _ => Err(StoreFailure::serialization("patch event data is not an object")),
            }
        }
        "keep-alive" => Ok(StreamStep::Idle),
        "cancel" => Err(StoreFailure::permission_denied(format!(
            "subscription cancelled by server: {}",
            event.data
        ))),
        "auth_revoked" => Err(StoreFailure::permission_denied("credential revoked")),
        other => {
            tracing::debug!(event = %other, "Ignoring unknown stream event");
            Ok(StreamStep::Idle)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SseEvent {
    name: String,
    data: String,
}

/// Incremental `text/event-stream` decoder
#[derive(Debug, Default)]
struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    /// Feed a chunk of bytes and return every event it completes
    fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(|c| c == '\n' || c == '\r');
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            if self.event.is_none() && self.data.is_empty() {
                return None;
            }
            let name = self.event.take().unwrap_or_else(|| "message".to_string());
            let data = std::mem::take(&mut self.data).join("\n");
            return Some(SseEvent { name, data });
        }

        // Comment line
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }
}

// =========================================================================
// Failure mapping
// =========================================================================

fn transport_failure(err: reqwest::Error) -> StoreFailure {
    if err.is_timeout() {
        StoreFailure::new(FailureReason::Timeout, err.to_string())
    } else if err.is_decode() {
        StoreFailure::serialization(err.to_string())
    } else {
        StoreFailure::network(err.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, StoreFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(failure_for_status(status, &body))
}

/// Map an error response to a failure, keeping the server's message
fn failure_for_status(status: StatusCode, body: &str) -> StoreFailure {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", status));

    let reason = match status.as_u16() {
        401 | 403 => FailureReason::PermissionDenied,
        404 => FailureReason::InvalidPath,
        400 => FailureReason::Serialization,
        408 => FailureReason::Timeout,
        code if code >= 500 => FailureReason::Unavailable,
        _ => FailureReason::Network,
    };

    StoreFailure::new(reason, message)
}
