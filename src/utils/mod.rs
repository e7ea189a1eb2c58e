pub mod code_generator;
pub mod phone;
pub mod session;

pub use code_generator::{generate_nonce, generate_six_digit_code};
pub use phone::*;
pub use session::*;
