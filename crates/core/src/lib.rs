//! `procura-core` — domain foundation shared by the procurement crates.
//!
//! Pure domain primitives only: identifiers, the domain error model and the
//! aggregate/entity/event traits. Nothing here performs IO.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod event;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use event::Event;
pub use id::{AggregateId, TenantId, UserId};
