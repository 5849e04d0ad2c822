use crate::error::{CredentialError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

/// Random bytes per token (256 bits)
const TOKEN_BYTES: usize = 32;

/// Generate an opaque, URL-safe token from the operating system RNG.
///
/// Fails with [`CredentialError::Generation`] when the entropy source is
/// unavailable; callers must not retry internally.
pub fn secure_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CredentialError::Generation(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_secure_token_shape() {
        let token = secure_token().unwrap();
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_secure_token_no_repeats() {
        let tokens: HashSet<String> = (0..1000).map(|_| secure_token().unwrap()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
