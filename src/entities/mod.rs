pub mod orders;
pub mod users;
pub mod verification_codes;

pub use orders::OrderStatus;

pub use orders as order_entity;
pub use users as user_entity;
pub use verification_codes as verification_code_entity;
