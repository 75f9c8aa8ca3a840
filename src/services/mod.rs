pub mod admin_orders;
pub mod appointments;
pub mod catalog;
pub mod checkout;
pub mod identity_sync;
pub mod payment_pipeline;
