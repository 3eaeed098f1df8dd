//! Note GUID generation.

use rand::Rng;
use rand::rngs::OsRng;

/// The base91 alphabet used for note GUIDs.
pub const GUID_ALPHABET: &[u8; 91] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&()*+,-./:;<=>?@[]^_`{|}~";

/// Length of a generated GUID.
pub const GUID_LEN: usize = 10;

/// Generate a random GUID from the operating system's secure RNG.
pub fn generate() -> String {
    (0..GUID_LEN)
        .map(|_| char::from(GUID_ALPHABET[OsRng.gen_range(0..GUID_ALPHABET.len())]))
        .collect()
}
