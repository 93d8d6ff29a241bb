use rand::{rngs::OsRng, RngCore};

use crate::error::AuthError;

const TOKEN_SIZE_BYTES: usize = 32;

/// Label given to the token created alongside a new user.
pub const DEFAULT_TOKEN_NAME: &str = "Default Token";

/// 32 bytes from the OS CSPRNG, lowercase hex encoded (64 chars).
pub fn generate_token_secret() -> Result<String, AuthError> {
    let mut bytes = [0u8; TOKEN_SIZE_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(AuthError::EntropyUnavailable)?;
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn secret_is_64_lowercase_hex_chars() {
        let secret = generate_token_secret().unwrap();
        assert_eq!(secret.len(), 64);
        assert!(secret
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn ten_thousand_secrets_are_distinct() {
        let secrets: HashSet<String> = (0..10_000)
            .map(|_| generate_token_secret().unwrap())
            .collect();
        assert_eq!(secrets.len(), 10_000);
        assert!(secrets.iter().all(|s| s.len() == 64));
    }
}
