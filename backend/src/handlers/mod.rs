//! HTTP request handlers

pub mod branch;
pub mod expense;
pub mod health;
pub mod ingredient;
pub mod purchase;
pub mod stock;
pub mod vendor;
pub mod vendor_payment;

pub use branch::*;
pub use expense::*;
pub use health::*;
pub use ingredient::*;
pub use purchase::*;
pub use stock::*;
pub use vendor::*;
pub use vendor_payment::*;
