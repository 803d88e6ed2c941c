use rand::rngs::OsRng;
use rand::RngCore;

/// Bytes of entropy behind each issued token string (256 bits).
const TOKEN_ENTROPY_BYTES: usize = 32;

/// Generate an opaque token string from the OS CSPRNG.
///
/// Hex keeps the string URL-safe; collisions are negligible at this width,
/// so token strings double as primary keys.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_ENTROPY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tokens_are_hex_of_expected_width() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_ENTROPY_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
