pub mod auth_service;
pub mod order_service;

pub use auth_service::*;
pub use order_service::*;
