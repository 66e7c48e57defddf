use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 over the UTF-8 bytes of `text`.
pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn stable_across_invocations() {
        let text = "What color was the bicycle?\n\nContext: D1:2";
        assert_eq!(sha256_hex(text), sha256_hex(text));
    }
}
