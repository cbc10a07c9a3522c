use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::interaction::CommandKind;

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Unavailable(String),
}

/// A rendered message: text plus its interactive controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub text: String,
    pub controls: Vec<Control>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Control {
    pub command: CommandKind,
    pub label: String,
    pub disabled: bool,
    /// Stable id routed back as `(announcement id, command)`.
    pub custom_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    pub display_name: String,
    #[serde(default)]
    pub cohorts: Vec<String>,
}

/// The chat platform, as seen by the core.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn publish(&self, channel: &str, view: &View) -> Result<String, TransportError>;
    async fn edit(&self, message_ref: &str, view: &View) -> Result<(), TransportError>;
    async fn delete(&self, message_ref: &str) -> Result<(), TransportError>;
    async fn resolve_identity(&self, participant_id: &str) -> Result<Identity, TransportError>;
}

/// Timeout-bounded access to a [`Transport`]. Elapsed calls count as `Unavailable`.
pub struct Outbound<'a> {
    transport: &'a dyn Transport,
    timeout: Duration,
}

impl<'a> Outbound<'a> {
    pub fn new(transport: &'a dyn Transport, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub async fn publish(&self, channel: &str, view: &View) -> Result<String, TransportError> {
        self.bounded("publish", self.transport.publish(channel, view)).await
    }

    pub async fn edit(&self, message_ref: &str, view: &View) -> Result<(), TransportError> {
        self.bounded("edit", self.transport.edit(message_ref, view)).await
    }

    pub async fn delete(&self, message_ref: &str) -> Result<(), TransportError> {
        self.bounded("delete", self.transport.delete(message_ref)).await
    }

    pub async fn resolve_identity(&self, participant_id: &str) -> Result<Identity, TransportError> {
        self.bounded("resolve_identity", self.transport.resolve_identity(participant_id))
            .await
    }

    async fn bounded<T>(
        &self,
        op: &str,
        fut: impl Future<Output = Result<T, TransportError>>,
    ) -> Result<T, TransportError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Unavailable(format!(
                "{op} timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

/// REST client for the chat bridge that owns the platform connection.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct Published {
    id: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<reqwest::Response, TransportError> {
        let response = self
            .authorized(req)
            .send()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("Transport error {}: {}", status, text);
            return Err(TransportError::Unavailable(format!("{status}: {text}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn publish(&self, channel: &str, view: &View) -> Result<String, TransportError> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel);
        let response = self.send(self.client.post(url).json(view)).await?;
        let published: Published = response
            .json()
            .await
            .map_err(|e| TransportError::Unavailable(format!("bad publish response: {e}")))?;
        Ok(published.id)
    }

    async fn edit(&self, message_ref: &str, view: &View) -> Result<(), TransportError> {
        let url = format!("{}/messages/{}", self.base_url, message_ref);
        self.send(self.client.patch(url).json(view)).await?;
        Ok(())
    }

    async fn delete(&self, message_ref: &str) -> Result<(), TransportError> {
        let url = format!("{}/messages/{}", self.base_url, message_ref);
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn resolve_identity(&self, participant_id: &str) -> Result<Identity, TransportError> {
        let url = format!("{}/members/{}", self.base_url, participant_id);
        let response = self.send(self.client.get(url)).await?;
        response
            .json()
            .await
            .map_err(|e| TransportError::Unavailable(format!("bad member response: {e}")))
    }
}

#[cfg(test)]
pub mod recording {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Publish { channel: String, message_ref: String },
        Edit { message_ref: String },
        Delete { message_ref: String },
    }

    #[derive(Default)]
    struct Inner {
        next_id: u64,
        calls: Vec<Call>,
        messages: HashMap<String, View>,
        members: HashMap<String, Identity>,
        down: bool,
        failing_refs: HashSet<String>,
        failing_channels: HashSet<String>,
    }

    /// In-memory platform that records every call.
    #[derive(Default)]
    pub struct RecordingTransport(Mutex<Inner>);

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_member(&self, participant_id: &str, display_name: &str, cohorts: &[&str]) {
            self.0.lock().unwrap().members.insert(
                participant_id.to_string(),
                Identity {
                    display_name: display_name.to_string(),
                    cohorts: cohorts.iter().map(|c| c.to_string()).collect(),
                },
            );
        }

        pub fn remove_member(&self, participant_id: &str) {
            self.0.lock().unwrap().members.remove(participant_id);
        }

        /// Every call fails with `Unavailable` while down.
        pub fn set_down(&self, down: bool) {
            self.0.lock().unwrap().down = down;
        }

        /// Edits and deletes against `message_ref` fail with `Unavailable`.
        pub fn fail_ref(&self, message_ref: &str) {
            self.0.lock().unwrap().failing_refs.insert(message_ref.to_string());
        }

        pub fn restore_ref(&self, message_ref: &str) {
            self.0.lock().unwrap().failing_refs.remove(message_ref);
        }

        /// Publishes to `channel` fail with `Unavailable` while down.
        pub fn set_channel_down(&self, channel: &str, down: bool) {
            let mut inner = self.0.lock().unwrap();
            if down {
                inner.failing_channels.insert(channel.to_string());
            } else {
                inner.failing_channels.remove(channel);
            }
        }

        /// Remove a message as if a moderator deleted it on the platform.
        pub fn drop_message(&self, message_ref: &str) {
            self.0.lock().unwrap().messages.remove(message_ref);
        }

        pub fn calls(&self) -> Vec<Call> {
            self.0.lock().unwrap().calls.clone()
        }

        pub fn publishes_to(&self, channel: &str) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Publish { channel: ch, .. } if ch == channel))
                .count()
        }

        pub fn message(&self, message_ref: &str) -> Option<View> {
            self.0.lock().unwrap().messages.get(message_ref).cloned()
        }

        pub fn message_count(&self) -> usize {
            self.0.lock().unwrap().messages.len()
        }
    }

    fn unavailable() -> TransportError {
        TransportError::Unavailable("platform down".into())
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn publish(&self, channel: &str, view: &View) -> Result<String, TransportError> {
            let mut inner = self.0.lock().unwrap();
            if inner.down || inner.failing_channels.contains(channel) {
                return Err(unavailable());
            }
            inner.next_id += 1;
            let message_ref = format!("{channel}/{}", inner.next_id);
            inner.messages.insert(message_ref.clone(), view.clone());
            inner.calls.push(Call::Publish {
                channel: channel.to_string(),
                message_ref: message_ref.clone(),
            });
            Ok(message_ref)
        }

        async fn edit(&self, message_ref: &str, view: &View) -> Result<(), TransportError> {
            let mut inner = self.0.lock().unwrap();
            if inner.down || inner.failing_refs.contains(message_ref) {
                return Err(unavailable());
            }
            let slot = inner.messages.get_mut(message_ref).ok_or(TransportError::NotFound)?;
            *slot = view.clone();
            inner.calls.push(Call::Edit {
                message_ref: message_ref.to_string(),
            });
            Ok(())
        }

        async fn delete(&self, message_ref: &str) -> Result<(), TransportError> {
            let mut inner = self.0.lock().unwrap();
            if inner.down || inner.failing_refs.contains(message_ref) {
                return Err(unavailable());
            }
            inner.messages.remove(message_ref).ok_or(TransportError::NotFound)?;
            inner.calls.push(Call::Delete {
                message_ref: message_ref.to_string(),
            });
            Ok(())
        }

        async fn resolve_identity(&self, participant_id: &str) -> Result<Identity, TransportError> {
            let inner = self.0.lock().unwrap();
            if inner.down {
                return Err(unavailable());
            }
            inner
                .members
                .get(participant_id)
                .cloned()
                .ok_or(TransportError::NotFound)
        }
    }

    /// A platform that never answers.
    pub struct HangingTransport;

    #[async_trait]
    impl Transport for HangingTransport {
        async fn publish(&self, _channel: &str, _view: &View) -> Result<String, TransportError> {
            std::future::pending().await
        }

        async fn edit(&self, _message_ref: &str, _view: &View) -> Result<(), TransportError> {
            std::future::pending().await
        }

        async fn delete(&self, _message_ref: &str) -> Result<(), TransportError> {
            std::future::pending().await
        }

        async fn resolve_identity(
            &self,
            _participant_id: &str,
        ) -> Result<Identity, TransportError> {
            std::future::pending().await
        }
    }
}
