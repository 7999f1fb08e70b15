//! Event schema versioning
//!
//! Every event type starts at version 1. When its wire shape changes, the
//! owning module registers a [`VersionConverter`] whose `latest_version` is
//! the new current version; payloads still stored at an older version are
//! upgraded before they are decoded and published.
//!
//! Conversions are pure transformations over JSON. A stored payload can jump
//! straight to the latest version in one call.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("unsupported version {version} for {event_type} (latest is {latest})")]
    UnsupportedVersion {
        event_type: String,
        version: u32,
        latest: u32,
    },

    #[error("{event_type} v{version} payload is missing field `{field}`")]
    MissingField {
        event_type: String,
        version: u32,
        field: String,
    },

    #[error("{event_type} v{version} payload has invalid field `{field}`: {reason}")]
    InvalidField {
        event_type: String,
        version: u32,
        field: String,
        reason: String,
    },
}

/// Upgrades serialized payloads of one event type to its latest schema
pub trait VersionConverter: Send + Sync {
    /// Current schema version of the event type
    fn latest_version(&self) -> u32;

    /// Upgrade `payload` written at `from_version` to `latest_version()`
    ///
    /// Must accept every version in `1..latest_version()` and fail with
    /// [`VersionError::UnsupportedVersion`] for anything else.
    fn upgrade(&self, payload: Value, from_version: u32) -> Result<Value, VersionError>;
}

/// One step: payload at version `n` in, payload at version `n + 1` out
pub type UpgradeStep = fn(Value) -> Result<Value, VersionError>;

/// Converter composed of consecutive single-version steps
///
/// The first step upgrades v1 to v2, the second v2 to v3, and so on, so
/// `latest_version` is the number of steps plus one. Upgrading from `v`
/// runs steps `v..latest` in order, which is exactly the chain of
/// single-step upgrades.
#[derive(Clone)]
pub struct StepConverter {
    event_type: String,
    steps: Vec<UpgradeStep>,
}

impl StepConverter {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            steps: Vec::new(),
        }
    }

    /// Append the step from the current latest version to the next one
    pub fn step(mut self, upgrade: UpgradeStep) -> Self {
        self.steps.push(upgrade);
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }
}

impl VersionConverter for StepConverter {
    fn latest_version(&self) -> u32 {
        u32::try_from(self.steps.len()).map_or(u32::MAX, |n| n.saturating_add(1))
    }

    fn upgrade(&self, payload: Value, from_version: u32) -> Result<Value, VersionError> {
        let latest = self.latest_version();
        if from_version == 0 || from_version >= latest {
            return Err(VersionError::UnsupportedVersion {
                event_type: self.event_type.clone(),
                version: from_version,
                latest,
            });
        }

        let first = (from_version - 1) as usize;
        self.steps[first..]
            .iter()
            .try_fold(payload, |payload, step| step(payload))
    }
}

/// Converters keyed by event type
#[derive(Clone, Default)]
pub struct VersionRegistry {
    converters: HashMap<String, Arc<dyn VersionConverter>>,
}

impl VersionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        event_type: impl Into<String>,
        converter: impl VersionConverter + 'static,
    ) -> &mut Self {
        self.converters.insert(event_type.into(), Arc::new(converter));
        self
    }

    /// Latest schema version of `event_type`; 1 when it has never evolved
    pub fn current_version(&self, event_type: &str) -> u32 {
        self.converters
            .get(event_type)
            .map_or(1, |converter| converter.latest_version())
    }

    /// Upgrade a stored payload to the latest version of its type
    ///
    /// Returns `Ok(None)` when no converter is registered for `event_type`
    /// (the caller logs and skips). A payload already at the latest version
    /// is returned unchanged.
    pub fn upgrade(
        &self,
        event_type: &str,
        payload: Value,
        source_version: u32,
    ) -> Result<Option<Value>, VersionError> {
        let Some(converter) = self.converters.get(event_type) else {
            return Ok(None);
        };

        if source_version == converter.latest_version() {
            return Ok(Some(payload));
        }

        converter.upgrade(payload, source_version).map(Some)
    }
}

/// Borrow a payload as a JSON object, for use inside upgrade steps
pub fn payload_object<'a>(
    payload: &'a mut Value,
    event_type: &str,
    version: u32,
) -> Result<&'a mut Map<String, Value>, VersionError> {
    payload
        .as_object_mut()
        .ok_or_else(|| VersionError::InvalidField {
            event_type: event_type.to_string(),
            version,
            field: "$".to_string(),
            reason: "payload is not an object".to_string(),
        })
}
