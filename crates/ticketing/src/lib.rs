//! Ticket reservation service.
//!
//! Demonstrates the coordination core against a relational store: every
//! reserve/book mutation of a ticket row is serialized through the named-lock
//! service, so two clients racing for the same ticket cannot both win.

pub mod api;
pub mod error;
pub mod lock_client;
pub mod service;
pub mod store;

pub use api::TicketServiceConfig;
pub use error::{Error, Result};
pub use lock_client::{HttpLockClient, LockClient};
pub use service::TicketingService;
pub use store::{MemoryTicketStore, PgTicketStore, Ticket, TicketState, TicketStore};
