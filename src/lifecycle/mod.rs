//! Order and run lifecycle state machines
//!
//! Every status mutation in the system goes through these rules. The store
//! layer persists whatever it is told; callers are expected to check a
//! transition here first.

pub mod order;
pub mod run;

pub use order::OrderStatus;
pub use run::RunStatus;
