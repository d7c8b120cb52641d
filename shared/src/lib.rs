//! Shared types and logic for the restaurant back office
//!
//! Everything in this crate is free of I/O: domain models, pagination types,
//! field validation and the reconciliation rules (pricing, settlement and
//! expense links) that the backend executes inside database transactions.

pub mod expense_link;
pub mod models;
pub mod pricing;
pub mod settlement;
pub mod types;
pub mod validation;

pub use models::*;
pub use settlement::PaymentStatus;
pub use types::*;
