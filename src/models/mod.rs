pub mod auth;
pub mod common;
pub mod order;
pub mod user;

pub use auth::*;
pub use common::*;
pub use order::*;
pub use user::*;
