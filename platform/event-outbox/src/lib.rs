//! # Transactional Outbox
//!
//! Makes "state changed" and "event published" agree across crashes.
//! Producers enqueue an [`EventEnvelope`](event_bus::EventEnvelope) through
//! an [`OutboxWriter`] inside the same transaction as their domain writes;
//! the [`OutboxDrainLoop`] later reads pending records, upgrades payloads
//! written at older schema versions through the [`VersionRegistry`], decodes
//! them with the [`EventTypeRegistry`] and publishes them on the event bus.
//!
//! Delivery is at-least-once. A record is marked processed only after the
//! bus accepted it, so a crash between publish and flush re-delivers it on
//! the next cycle; consumers deduplicate on `event_id`.
//!
//! ## Limitations
//!
//! One drain loop per outbox table. Nothing coordinates replicas: two
//! processes draining the same table race for the same pending rows and
//! duplicate delivery becomes likely rather than merely possible.

pub mod config;
pub mod drain;
pub mod error;
pub mod record;
pub mod registry;
pub mod retry;
pub mod store;
pub mod versioning;

pub use config::DrainConfig;
pub use drain::{DeliveryFailure, DrainReport, OutboxDrainLoop};
pub use error::OutboxError;
pub use record::{NewOutboxRecord, OutboxRecord};
pub use registry::{decode_into, DecodeFn, EventTypeRegistry};
pub use retry::RetryPolicy;
pub use store::memory::{InMemoryOutboxStore, InMemoryUnitOfWork};
pub use store::postgres::{PgOutboxStore, MIGRATOR};
pub use store::{enqueue_event, BatchChanges, OutboxStore, OutboxWriter, RecordChange};
pub use versioning::{StepConverter, UpgradeStep, VersionConverter, VersionError, VersionRegistry};

/// Records fetched per drain cycle unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Seconds between drain cycles unless configured otherwise
pub const DEFAULT_DRAIN_INTERVAL_SECS: u64 = 30;
