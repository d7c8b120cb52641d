//! Domain models for the restaurant back office

mod branch;
mod expense;
mod ingredient;
mod payment;
mod purchase;
mod stock;
mod user;
mod vendor;
mod vendor_payment;

pub use branch::*;
pub use expense::*;
pub use ingredient::*;
pub use payment::*;
pub use purchase::*;
pub use stock::*;
pub use user::*;
pub use vendor::*;
pub use vendor_payment::*;
