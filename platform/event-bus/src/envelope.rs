//! # Event Envelope
//!
//! Wire format for every integration event leaving a module, whether it goes
//! out through the outbox drain loop or the best-effort dispatcher.
//!
//! ## Envelope Fields
//!
//! - `event_id`: idempotency key consumers deduplicate on
//! - `event_type`: schema discriminator (e.g. `ItemCreated`)
//! - `schema_version`: version of the payload shape, starting at 1
//! - `occurred_at`: when the producing unit of work raised the event
//! - `tenant_id`: multi-tenant isolation
//! - `source_module` / `source_version`: producing module and its build version
//! - `correlation_id` / `causation_id`: optional causality links
//! - `payload`: the event body at `schema_version`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{BusError, BusResult, EventBus};

/// A wire-level event body with a stable type name and schema version
pub trait IntegrationEvent: Serialize + Send + Sync {
    /// Discriminator stored alongside the payload (`ItemCreated`, `InvoicePosted`, ...)
    fn event_type(&self) -> &'static str;

    /// Schema version this value serializes as
    fn schema_version(&self) -> u32;

    /// Module namespace used to build the bus subject
    fn source_module(&self) -> &'static str;
}

/// Standard envelope wrapping an integration event body
///
/// # Examples
///
/// ```rust
/// use event_bus::{EventEnvelope, IntegrationEvent};
/// use serde::Serialize;
///
/// #[derive(Debug, Serialize)]
/// struct PaymentRecorded {
///     payment_id: String,
///     amount_minor: i64,
/// }
///
/// impl IntegrationEvent for PaymentRecorded {
///     fn event_type(&self) -> &'static str { "PaymentRecorded" }
///     fn schema_version(&self) -> u32 { 1 }
///     fn source_module(&self) -> &'static str { "ar" }
/// }
///
/// let envelope = EventEnvelope::for_event(
///     "tenant-123",
///     PaymentRecorded { payment_id: "pay_1".into(), amount_minor: 1000 },
/// )
/// .with_correlation_id(Some("corr-456".to_string()));
///
/// assert_eq!(envelope.subject(), "ar.events.PaymentRecorded");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    pub event_id: Uuid,

    pub event_type: String,

    pub schema_version: u32,

    pub occurred_at: DateTime<Utc>,

    pub tenant_id: String,

    pub source_module: String,

    pub source_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<String>,

    pub payload: T,
}

impl<T: IntegrationEvent> EventEnvelope<T> {
    /// Wrap an integration event with a fresh `event_id` and `occurred_at`
    pub fn for_event(tenant_id: impl Into<String>, event: T) -> Self {
        Self::with_event_id(Uuid::new_v4(), tenant_id, event)
    }

    /// Wrap an integration event with an explicit `event_id`
    pub fn with_event_id(event_id: Uuid, tenant_id: impl Into<String>, event: T) -> Self {
        Self {
            event_id,
            event_type: event.event_type().to_string(),
            schema_version: event.schema_version(),
            occurred_at: Utc::now(),
            tenant_id: tenant_id.into(),
            source_module: event.source_module().to_string(),
            source_version: env!("CARGO_PKG_VERSION").to_string(),
            correlation_id: None,
            causation_id: None,
            payload: event,
        }
    }
}

impl<T> EventEnvelope<T> {
    pub fn with_source_version(mut self, version: String) -> Self {
        self.source_version = version;
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Option<String>) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn with_causation_id(mut self, causation_id: Option<String>) -> Self {
        self.causation_id = causation_id;
        self
    }

    /// Swap the body, keeping all envelope metadata
    ///
    /// Used after a stored payload has been upgraded and decoded: the
    /// envelope keeps its `event_id` while the body moves to `schema_version`.
    pub fn replace_payload<U>(self, payload: U, schema_version: u32) -> EventEnvelope<U> {
        EventEnvelope {
            event_id: self.event_id,
            event_type: self.event_type,
            schema_version,
            occurred_at: self.occurred_at,
            tenant_id: self.tenant_id,
            source_module: self.source_module,
            source_version: self.source_version,
            correlation_id: self.correlation_id,
            causation_id: self.causation_id,
            payload,
        }
    }

    /// Bus subject: `<source_module>.events.<event_type>`
    pub fn subject(&self) -> String {
        format!("{}.events.{}", self.source_module, self.event_type)
    }
}

impl<T: Serialize> EventEnvelope<T> {
    pub fn to_bytes(&self) -> BusResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| BusError::SerializationError(e.to_string()))
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Serialize an envelope and publish it on its subject
pub async fn publish_envelope<T: Serialize>(
    bus: &dyn EventBus,
    envelope: &EventEnvelope<T>,
) -> BusResult<()> {
    let subject = envelope.subject();
    let bytes = envelope.to_bytes()?;
    bus.publish(&subject, bytes).await?;

    tracing::debug!(
        event_id = %envelope.event_id,
        event_type = %envelope.event_type,
        schema_version = envelope.schema_version,
        subject = %subject,
        "Envelope published"
    );

    Ok(())
}

/// Validate the envelope fields of a raw JSON event
///
/// # Validation Rules
///
/// - `event_id`: present, a UUID string
/// - `event_type`: non-empty
/// - `schema_version`: integer >= 1
/// - `occurred_at`: present
/// - `tenant_id`, `source_module`, `source_version`: non-empty
pub fn validate_envelope_fields(envelope: &serde_json::Value) -> Result<(), String> {
    let event_id = envelope
        .get("event_id")
        .and_then(|v| v.as_str())
        .ok_or("Missing or invalid event_id")?;

    Uuid::parse_str(event_id).map_err(|_| format!("event_id is not a UUID: {event_id}"))?;

    let schema_version = envelope
        .get("schema_version")
        .and_then(|v| v.as_u64())
        .ok_or("Missing or invalid schema_version")?;

    if schema_version == 0 {
        return Err("schema_version must be at least 1".to_string());
    }

    envelope
        .get("occurred_at")
        .and_then(|v| v.as_str())
        .ok_or("Missing or invalid occurred_at")?;

    for field in ["event_type", "tenant_id", "source_module", "source_version"] {
        let value = envelope
            .get(field)
            .and_then(|v| v.as_str())
            .ok_or_else(|| format!("Missing or invalid {field}"))?;

        if value.is_empty() {
            return Err(format!("{field} cannot be empty"));
        }
    }

    Ok(())
}
