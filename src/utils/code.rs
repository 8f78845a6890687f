use rand::Rng;

pub const CODE_PREFIX: &str = "RES-";
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 5;

/// Generate a shareable reservation code such as `RES-7K2QA`.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("{}{}", CODE_PREFIX, suffix)
}

/// Canonicalize a code typed by a customer: trims, uppercases and makes
/// sure the `RES-` prefix appears exactly once. Returns `None` when nothing
/// is left after removing the prefix.
pub fn normalize_code(input: &str) -> Option<String> {
    let upper = input.trim().to_uppercase();
    let body = upper.strip_prefix(CODE_PREFIX).unwrap_or(&upper).trim();

    if body.is_empty() {
        return None;
    }

    Some(format!("{}{}", CODE_PREFIX, body))
}
