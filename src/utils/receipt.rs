use rand::Rng;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Gateway receipt ids, e.g. `rcpt_demo_x8k2m4p1q7`.
pub fn receipt_id(kind: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..10)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("rcpt_{kind}_{suffix}")
}

/// Single-use token for set-password email links.
pub fn password_token() -> String {
    let mut rng = rand::thread_rng();
    (0..48)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_id_shape() {
        let id = receipt_id("demo");
        assert!(id.starts_with("rcpt_demo_"));
        assert_eq!(id.len(), "rcpt_demo_".len() + 10);
    }

    #[test]
    fn test_password_tokens_differ() {
        // Collisions are possible in principle; at 48 chars they are not a concern.
        assert_ne!(password_token(), password_token());
        assert_eq!(password_token().len(), 48);
    }
}
