//! # EventBus Abstraction
//!
//! The publish side of the ERP event-delivery pipeline. Producers never talk
//! to a transport directly: the outbox drain loop and the best-effort domain
//! event dispatcher both hand fully-formed integration events to an
//! [`EventBus`], and everything past "accepted for send" is the transport's
//! concern.
//!
//! ## Implementations
//!
//! - **NatsBus**: production transport backed by NATS
//! - **InMemoryBus**: broadcast channels for tests and local development
//!
//! ## Usage
//!
//! ```rust,no_run
//! use event_bus::{publish_envelope, EventBus, EventEnvelope, InMemoryBus, IntegrationEvent};
//! use serde::Serialize;
//! use std::sync::Arc;
//!
//! #[derive(Serialize)]
//! struct ItemCreated {
//!     item_id: String,
//! }
//!
//! impl IntegrationEvent for ItemCreated {
//!     fn event_type(&self) -> &'static str { "ItemCreated" }
//!     fn schema_version(&self) -> u32 { 1 }
//!     fn source_module(&self) -> &'static str { "inventory" }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new());
//! let envelope = EventEnvelope::for_event("tenant-1", ItemCreated { item_id: "itm-1".into() });
//! publish_envelope(bus.as_ref(), &envelope).await?;
//! # Ok(())
//! # }
//! ```

mod envelope;
mod inmemory_bus;
mod nats_bus;

pub use envelope::{publish_envelope, validate_envelope_fields, EventEnvelope, IntegrationEvent};
pub use inmemory_bus::InMemoryBus;
pub use nats_bus::NatsBus;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::fmt;

/// A message delivered by the bus to a subscriber
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// Subject the message was published on
    pub subject: String,
    /// Raw payload (a serialized [`EventEnvelope`] for integration events)
    pub payload: Vec<u8>,
    pub headers: Option<HashMap<String, String>>,
    pub reply_to: Option<String>,
}

impl BusMessage {
    pub fn new(subject: String, payload: Vec<u8>) -> Self {
        Self {
            subject,
            payload,
            headers: None,
            reply_to: None,
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_reply_to(mut self, reply_to: String) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    /// Decode the payload as an envelope with a typed body
    pub fn envelope<T: serde::de::DeserializeOwned>(&self) -> BusResult<EventEnvelope<T>> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| BusError::SerializationError(e.to_string()))
    }
}

/// Errors raised by event bus implementations
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("failed to publish message: {0}")]
    PublishError(String),

    #[error("failed to subscribe to subject: {0}")]
    SubscribeError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("invalid subject pattern: {0}")]
    InvalidSubject(String),

    #[error("publish timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("internal error: {0}")]
    InternalError(String),
}

pub type BusResult<T> = Result<T, BusError>;

/// Publish/subscribe transport used by the event-delivery pipeline
///
/// `publish` either completes (the event counts as delivered) or fails (the
/// caller records the failure). Consumers must tolerate duplicates: the
/// pipeline delivers at least once and consumers deduplicate on `event_id`.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish raw bytes on a subject such as `inventory.events.ItemCreated`
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()>;

    /// Subscribe to a subject pattern
    ///
    /// Wildcards follow NATS rules: `*` matches exactly one token and `>`
    /// matches every remaining token.
    async fn subscribe(&self, subject: &str) -> BusResult<BoxStream<'static, BusMessage>>;
}

impl fmt::Debug for dyn EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventBus")
    }
}
