use rand::Rng;

/// Safe character set for tokens (excludes 0/O, 1/I/L to avoid confusion)
const TOKEN_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

pub const PARTICIPANT_ID_LENGTH: usize = 8;
pub const ANSWER_ID_LENGTH: usize = 6;

/// Generate a random token of `length` characters
pub fn generate_token<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| TOKEN_CHARS[rng.random_range(0..TOKEN_CHARS.len())] as char)
        .collect()
}

/// Generate a token for which `taken` returns false
pub fn generate_unique_token<R, F>(rng: &mut R, length: usize, taken: F) -> String
where
    R: Rng + ?Sized,
    F: Fn(&str) -> bool,
{
    loop {
        let token = generate_token(rng, length);
        if !taken(&token) {
            return token;
        }
        // Collision - try again (extremely rare with 31^6 combinations)
    }
}
