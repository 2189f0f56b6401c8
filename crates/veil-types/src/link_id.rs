//! Link ids are the public tokens that route to an owner's inbox.

/// Length of every link id.
pub const LINK_ID_LEN: usize = 10;

/// URL-safe alphabet link ids are drawn from.
pub const LINK_ID_ALPHABET: &[u8; 64] =
    b"useandom-26T198340PX75pxJACKVERYMINDBUSHWOLF_GQZbfghjklqvwyzrict";

/// Returns true if `id` has the exact length and only uses the link id alphabet.
pub fn is_valid_link_id(id: &str) -> bool {
    id.len() == LINK_ID_LEN && id.bytes().all(|b| LINK_ID_ALPHABET.contains(&b))
}
