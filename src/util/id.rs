use rand::Rng;

// 4-char account prefix + 12-char id stays within FreeBSD's 16-character
// username limit.
pub const ID_LENGTH: usize = 12;
const ID_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A random fixed-length identifier over a small, filesystem- and
/// username-safe alphabet. Also used for generated passwords and one-shot
/// environment variable names.
pub fn generate_id() -> String {
    let mut rng = rand::rng();
    (0..ID_LENGTH)
        .map(|_| ID_CHARS[rng.random_range(0..ID_CHARS.len())] as char)
        .collect()
}
