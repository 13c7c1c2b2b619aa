//! Courier back-office core
//!
//! Order intake, driver assignment, delivery-run tracking, and
//! synchronization with an external warehouse-management system.
//!
//! - [`store`]: one typed entity store over SQLite or PostgreSQL
//! - [`sync`]: the orchestrator sequencing push, persist, and audit
//! - [`auth`]: admin/driver bearer tokens and password hashing
//! - [`lifecycle`]: order and run state machines
//! - [`audit`]: append-only trail of outbound gateway calls
//! - [`api`]: the driver-facing HTTP surface

pub mod api;
pub mod audit;
pub mod auth;
pub mod core;
pub mod lifecycle;
pub mod store;
pub mod sync;
pub mod wms;

pub use crate::core::{AppError, Config, Result, ServerState};
