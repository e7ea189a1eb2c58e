use rand::Rng;
use rand::rngs::OsRng;

pub const CODE_LENGTH: usize = 6;

/// 6 independent uniform digits from the OS CSPRNG. Leading zeros allowed.
pub fn generate_six_digit_code() -> String {
    let mut rng = OsRng;
    (0..CODE_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Session nonce, 100000..=999999.
pub fn generate_nonce() -> u32 {
    OsRng.gen_range(100_000..=999_999)
}
