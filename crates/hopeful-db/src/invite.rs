use rand::Rng;

/// Invite code alphabet; drops 0, O, 1 and I so codes survive being read aloud.
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const INVITE_CODE_LEN: usize = 8;

/// Attempts at a collision-free code before group creation gives up.
pub const MAX_INVITE_CODE_ATTEMPTS: u32 = 5;

/// Generate a random invite code, e.g. `K7QH2MZP`.
pub fn generate_invite_code() -> String {
    let mut rng = rand::rng();
    (0..INVITE_CODE_LEN)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Codes are matched case-insensitively and ignore surrounding whitespace.
pub fn normalize_invite_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
