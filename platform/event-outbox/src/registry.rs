//! Event type registry
//!
//! Maps the `event_type` string stored on an outbox record to the function
//! that decodes its (already upgraded) payload into the typed event. The
//! registry is populated once at startup; a name missing from it is a
//! configuration problem, reported on the record as `type not found`.

use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Decodes a payload at the latest schema version into `E`
pub type DecodeFn<E> = fn(serde_json::Value) -> Result<E, serde_json::Error>;

/// Generic decoder for a concrete contract type wrapped into `E`
///
/// ```rust
/// # use event_outbox::{decode_into, EventTypeRegistry};
/// # use serde::Deserialize;
/// #[derive(Deserialize)]
/// struct ItemCreated { item_id: String }
///
/// enum Wire { ItemCreated(ItemCreated) }
///
/// impl From<ItemCreated> for Wire {
///     fn from(e: ItemCreated) -> Self { Wire::ItemCreated(e) }
/// }
///
/// let mut registry = EventTypeRegistry::<Wire>::new();
/// registry.register("ItemCreated", decode_into::<ItemCreated, Wire>);
/// assert!(registry.contains("ItemCreated"));
/// ```
pub fn decode_into<T, E>(payload: serde_json::Value) -> Result<E, serde_json::Error>
where
    T: DeserializeOwned + Into<E>,
{
    serde_json::from_value::<T>(payload).map(Into::into)
}

pub struct EventTypeRegistry<E> {
    decoders: HashMap<String, DecodeFn<E>>,
}

impl<E> EventTypeRegistry<E> {
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Register (or replace) the decoder for `event_type`
    pub fn register(&mut self, event_type: impl Into<String>, decode: DecodeFn<E>) -> &mut Self {
        self.decoders.insert(event_type.into(), decode);
        self
    }

    pub fn resolve(&self, event_type: &str) -> Option<DecodeFn<E>> {
        self.decoders.get(event_type).copied()
    }

    /// `None` when the type is unknown, otherwise the decode result
    pub fn decode(
        &self,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Option<Result<E, serde_json::Error>> {
        self.resolve(event_type).map(|decode| decode(payload))
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }

    /// Registered type names, sorted
    pub fn event_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<E> Default for EventTypeRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}
