//! Stable digest of an identifier, used only to seed colors.

use md5::{Digest, Md5};

pub const DIGEST_LEN: usize = 16;

/// Maps `identifier` to a 16-byte digest. Same input, same bytes, always.
pub fn digest(identifier: &str) -> [u8; DIGEST_LEN] {
    let hash = Md5::digest(identifier.as_bytes());
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&hash);
    out
}
