pub mod actor;
pub mod notify;
pub mod payment;
