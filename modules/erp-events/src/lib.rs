//! # ERP integration events
//!
//! The domain events raised by the ERP modules, the versioned contracts
//! they are published as, and the translation between the two. Domain code
//! calls [`enqueue_domain_events`] inside its transaction; the
//! `outbox-relay` binary drains the outbox onto the bus.

pub mod config;
pub mod contracts;
pub mod db;
pub mod domain;
pub mod translator;
pub mod versions;

pub use contracts::{IntegrationEvent, PLACEHOLDER};
pub use domain::DomainEvent;
pub use translator::{
    enqueue_domain_events, prepare, translate, DispatchContext, DispatchError,
    DomainEventDispatcher,
};
pub use versions::version_registry;
