//! Classifier adapters: a remote SSE endpoint and a local fixture file.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use eventsource_stream::{Event, Eventsource};
use futures_util::{Stream, StreamExt, future, stream};

use roll_core::Source;
use roll_engine::{
    Classifier, ClassifierInput, ClassifierMap, RawSuggestion, SuggestionStream, TransportError,
};

use crate::config::{ClassifierConfig, RollConfig};

pub const RESULT_EVENT: &str = "result";
pub const DONE_EVENT: &str = "done";

// --- HTTP ---

/// POSTs the job input as JSON and reads suggestions off a server-sent-event
/// stream: one JSON suggestion per `result` event, finished by `done`.
pub struct HttpClassifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn invoke(&self, input: ClassifierInput) -> Result<SuggestionStream, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&input)
            .send()
            .await
            .map_err(|e| TransportError::new(format!("classifier request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::new(format!(
                "classifier {} returned HTTP {status}",
                self.endpoint
            )));
        }

        Ok(suggestions_from_events(response.bytes_stream().eventsource()).boxed())
    }
}

/// Decode an SSE stream into suggestions. Events other than `result` (and
/// unnamed `message` events) are ignored; `done` ends the stream.
pub fn suggestions_from_events<S, E>(
    events: S,
) -> impl Stream<Item = Result<RawSuggestion, TransportError>> + Send + 'static
where
    S: Stream<Item = Result<Event, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    events
        .take_while(|item| {
            future::ready(!matches!(item, Ok(event) if event.event == DONE_EVENT))
        })
        .filter_map(|item| {
            future::ready(match item {
                Ok(event) if event.event == RESULT_EVENT || event.event == "message" => Some(
                    serde_json::from_str::<RawSuggestion>(&event.data).map_err(|e| {
                        TransportError::new(format!("malformed result event: {e}"))
                    }),
                ),
                Ok(_) => None,
                Err(e) => Some(Err(TransportError::new(format!("event stream error: {e}")))),
            })
        })
}

// --- Fixture ---

/// Replays a fixed list of suggestions after a delay.
pub struct FixtureClassifier {
    suggestions: Vec<RawSuggestion>,
    delay: Duration,
}

impl FixtureClassifier {
    pub fn new(suggestions: Vec<RawSuggestion>, delay: Duration) -> Self {
        Self { suggestions, delay }
    }

    /// Load a JSON array of `{student_id, confidence, suggested}`.
    pub fn from_file(path: &Path, delay: Duration) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        let suggestions: Vec<RawSuggestion> = serde_json::from_str(&content)
            .with_context(|| format!("invalid fixture {}", path.display()))?;
        Ok(Self::new(suggestions, delay))
    }
}

#[async_trait]
impl Classifier for FixtureClassifier {
    async fn invoke(&self, input: ClassifierInput) -> Result<SuggestionStream, TransportError> {
        tracing::debug!(
            session_id = %input.session_id,
            suggestions = self.suggestions.len(),
            "replaying fixture"
        );
        tokio::time::sleep(self.delay).await;
        let items: Vec<Result<RawSuggestion, TransportError>> =
            self.suggestions.iter().cloned().map(Ok).collect();
        Ok(stream::iter(items).boxed())
    }
}

/// Build the classifier map from config. Unconfigured sources are absent.
pub fn build_classifiers(config: &RollConfig) -> Result<ClassifierMap> {
    let mut map: ClassifierMap = HashMap::new();
    for source in Source::ALL {
        let Some(entry) = config.classifier(source) else {
            continue;
        };
        let classifier: Arc<dyn Classifier> = match entry {
            ClassifierConfig::Http { endpoint } => Arc::new(HttpClassifier::new(endpoint.clone())),
            ClassifierConfig::Fixture { path, delay_ms } => Arc::new(
                FixtureClassifier::from_file(path, Duration::from_millis(*delay_ms))
                    .with_context(|| format!("{source} classifier"))?,
            ),
        };
        tracing::info!(%source, "classifier configured");
        map.insert(source, classifier);
    }
    Ok(map)
}
