pub mod appointment;
pub mod audit;
pub mod catalog;
pub mod error;
pub mod id;
pub mod money;
pub mod order;
pub mod payment;
pub mod settlement;
pub mod user;
