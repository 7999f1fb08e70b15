//! In-memory EventBus for tests and local development

use crate::{BusError, BusMessage, BusResult, EventBus};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// EventBus backed by a tokio broadcast channel
///
/// [`with_history`](Self::with_history) additionally keeps every published
/// message, so tests can assert on what was published without subscribing
/// first. The history is unbounded; long-running processes use the plain bus.
///
/// # Example
/// ```rust
/// use event_bus::{EventBus, InMemoryBus};
/// use futures::StreamExt;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = InMemoryBus::new().with_history();
/// let mut stream = bus.subscribe("inventory.events.>").await?;
///
/// bus.publish("inventory.events.ItemCreated", b"{}".to_vec()).await?;
///
/// let msg = stream.next().await.unwrap();
/// assert_eq!(msg.subject, "inventory.events.ItemCreated");
/// assert_eq!(bus.published()?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InMemoryBus {
    sender: Arc<broadcast::Sender<BusMessage>>,
    history: Option<Arc<Mutex<Vec<BusMessage>>>>,
}

impl InMemoryBus {
    /// Create a bus buffering up to 1000 undelivered messages per subscriber
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self {
            sender: Arc::new(sender),
            history: None,
        }
    }

    /// Record every published message for [`published`](Self::published)
    pub fn with_history(mut self) -> Self {
        self.history = Some(Arc::new(Mutex::new(Vec::new())));
        self
    }

    /// Every message published so far, oldest first
    ///
    /// Always empty unless the bus was built [`with_history`](Self::with_history).
    pub fn published(&self) -> BusResult<Vec<BusMessage>> {
        match &self.history {
            Some(history) => Ok(history
                .lock()
                .map_err(|_| BusError::InternalError("publish history lock poisoned".to_string()))?
                .clone()),
            None => Ok(Vec::new()),
        }
    }

    /// Check if a subject matches a NATS-style subscription pattern
    ///
    /// - `inventory.events.>` matches `inventory.events.ItemCreated`
    /// - `*.events.ItemCreated` matches `inventory.events.ItemCreated`
    /// - `inventory.*` does NOT match `inventory.events.ItemCreated`
    pub fn subject_matches(subject: &str, pattern: &str) -> bool {
        let subject_tokens: Vec<&str> = subject.split('.').collect();
        let pattern_tokens: Vec<&str> = pattern.split('.').collect();

        let mut s_idx = 0;
        let mut p_idx = 0;

        while s_idx < subject_tokens.len() && p_idx < pattern_tokens.len() {
            match pattern_tokens[p_idx] {
                ">" => return true,
                "*" => {}
                token if token == subject_tokens[s_idx] => {}
                _ => return false,
            }
            s_idx += 1;
            p_idx += 1;
        }

        s_idx == subject_tokens.len() && p_idx == pattern_tokens.len()
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        let msg = BusMessage::new(subject.to_string(), payload);

        if let Some(history) = &self.history {
            history
                .lock()
                .map_err(|_| BusError::InternalError("publish history lock poisoned".to_string()))?
                .push(msg.clone());
        }

        // No receivers is not an error
        let _ = self.sender.send(msg);

        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> BusResult<BoxStream<'static, BusMessage>> {
        if pattern.is_empty() {
            return Err(BusError::InvalidSubject("empty pattern".to_string()));
        }

        let mut receiver = self.sender.subscribe();
        let pattern = pattern.to_string();

        let stream = async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(msg) => {
                        if Self::subject_matches(&msg.subject, &pattern) {
                            yield msg;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(pattern = %pattern, skipped, "InMemoryBus subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };

        Ok(stream.boxed())
    }
}
