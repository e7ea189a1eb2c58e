use crate::error::{AppError, AppResult};

pub const MIN_PHONE_LENGTH: usize = 10;

/// Trims the input and checks it is long enough to be a phone number.
/// Returns the trimmed value, which is what gets stored and matched on.
pub fn normalize_phone(phone: &str) -> AppResult<&str> {
    let phone = phone.trim();
    if phone.is_empty() || phone.chars().count() < MIN_PHONE_LENGTH {
        return Err(AppError::ValidationError("Invalid phone number".to_string()));
    }
    Ok(phone)
}
