//! Stock module contracts

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `ItemCreated` as first published
///
/// Still written by producers that predate units of measure; upgraded to
/// [`ItemCreatedV2`] before delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemCreatedV1 {
    pub item_id: Uuid,
    pub sku: String,
    pub name: String,
}

/// Current `ItemCreated` contract
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemCreatedV2 {
    pub item_id: Uuid,
    pub sku: String,
    pub name: String,

    /// Stocking unit, e.g. "EA", "KG", "BOX"
    pub unit_of_measure: String,

    /// Catalog category; [`super::PLACEHOLDER`] until the item is classified
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockAdjustedV1 {
    pub item_id: Uuid,
    pub warehouse_id: Uuid,

    /// Signed change in on-hand quantity
    pub quantity_delta: i64,

    pub reason: String,
}
