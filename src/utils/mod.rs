pub mod password;

pub use password::{hash_password, verify_password, Password, PasswordHashString};

use rand::Rng;

/// Random 128-bit identifier, hex encoded. Used for session ids, token ids
/// and OAuth state nonces.
pub fn generate_random_id() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Random zero-padded six-digit one-time code.
pub fn generate_six_digit_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_hex_and_distinct() {
        let a = generate_random_id();
        let b = generate_random_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn six_digit_codes_are_zero_padded() {
        for _ in 0..64 {
            let code = generate_six_digit_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
