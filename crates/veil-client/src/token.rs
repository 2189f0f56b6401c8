use rand::Rng;

use veil_types::link_id::{LINK_ID_ALPHABET, LINK_ID_LEN};

/// Mint a fresh random link id. Collisions are not checked here; the store's
/// unique constraint rejects them.
pub fn generate_link_id() -> String {
    let mut rng = rand::rng();
    (0..LINK_ID_LEN)
        .map(|_| LINK_ID_ALPHABET[rng.random_range(0..LINK_ID_ALPHABET.len())] as char)
        .collect()
}
