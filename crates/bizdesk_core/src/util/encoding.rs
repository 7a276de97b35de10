//! Base64 helpers over the standard alphabet with padding.

use base64::engine::general_purpose::STANDARD;
use base64::{DecodeError, Engine as _};

pub fn base64_encode(bytes: impl AsRef<[u8]>) -> String {
    STANDARD.encode(bytes)
}

pub fn base64_decode(text: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD.decode(text.trim())
}

#[cfg(test)]
mod tests {
    use super::{base64_decode, base64_encode};

    #[test]
    fn encodes_known_vector() {
        assert_eq!(base64_encode("bizdesk"), "Yml6ZGVzaw==");
        assert_eq!(base64_decode("Yml6ZGVzaw==").unwrap(), b"bizdesk");
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(base64_decode("not base64!").is_err());
    }
}
