pub mod appointment_repo;
pub mod audit_repo;
pub mod catalog_repo;
pub mod order_repo;
pub mod payment_repo;
pub mod user_repo;
