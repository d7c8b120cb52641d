//! Business logic services for the restaurant back office

pub mod branch;
pub mod expense;
pub mod ingredient;
pub mod purchase;
pub mod stock;
pub mod vendor;
pub mod vendor_payment;

pub use branch::BranchService;
pub use expense::ExpenseService;
pub use ingredient::IngredientService;
pub use purchase::PurchaseService;
pub use stock::StockService;
pub use vendor::VendorService;
pub use vendor_payment::VendorPaymentService;
