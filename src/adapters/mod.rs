pub mod esewa;
pub mod identity;
