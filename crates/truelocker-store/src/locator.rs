//! Locator scheme used by the local content stores.
//!
//! Locators are CIDv1 strings over a BLAKE3 digest of the content:
//! `b` + base32lower(0x01 || 0x55 || 0x1e || 0x20 || digest).
//! The scheme is the store's own and is unrelated to the SHA-256
//! fingerprint the ledger publishes.

use truelocker_core::ContentLocator;

/// CID version byte.
const CID_V1: u8 = 0x01;
/// Multicodec for raw bytes.
const RAW_CODEC: u8 = 0x55;
/// Multihash code for BLAKE3.
const BLAKE3_MULTIHASH: u8 = 0x1e;
/// Digest length.
const DIGEST_LEN: u8 = 0x20;

/// Streaming locator computation.
#[derive(Default)]
pub struct LocatorHasher {
    hasher: blake3::Hasher,
}

impl LocatorHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    pub fn finalize(&self) -> ContentLocator {
        cid_for_digest(self.hasher.finalize().as_bytes())
    }
}

/// Locator for an in-memory blob.
pub fn locator_for(data: &[u8]) -> ContentLocator {
    cid_for_digest(blake3::hash(data).as_bytes())
}

/// Whether a locator could have been produced by this scheme.
///
/// Filesystem stores use this to refuse locators that would escape the
/// store directory.
pub fn is_well_formed(locator: &ContentLocator) -> bool {
    let s = locator.as_str();
    s.len() == 59
        && s.starts_with('b')
        && s[1..]
            .bytes()
            .all(|b| b.is_ascii_lowercase() || (b'2'..=b'7').contains(&b))
}

fn cid_for_digest(digest: &[u8; 32]) -> ContentLocator {
    let mut cid_bytes = Vec::with_capacity(36);
    cid_bytes.push(CID_V1);
    cid_bytes.push(RAW_CODEC);
    cid_bytes.push(BLAKE3_MULTIHASH);
    cid_bytes.push(DIGEST_LEN);
    cid_bytes.extend_from_slice(digest);

    // 59 ASCII characters, always within the locator bound.
    ContentLocator::new(format!("b{}", base32_encode(&cid_bytes)))
        .unwrap_or_else(|_| unreachable!("CID locators are never empty or oversized"))
}

/// RFC 4648 base32, lowercase, no padding.
fn base32_encode(data: &[u8]) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz234567";
    let mut result = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;

    for &byte in data {
        buffer = (buffer << 8) | (byte as u64);
        bits_in_buffer += 8;

        while bits_in_buffer >= 5 {
            bits_in_buffer -= 5;
            let index = ((buffer >> bits_in_buffer) & 0x1f) as usize;
            result.push(ALPHABET[index] as char);
        }
    }

    if bits_in_buffer > 0 {
        let index = ((buffer << (5 - bits_in_buffer)) & 0x1f) as usize;
        result.push(ALPHABET[index] as char);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base32_rfc4648_vectors() {
        assert_eq!(base32_encode(b""), "");
        assert_eq!(base32_encode(b"f"), "my");
        assert_eq!(base32_encode(b"fo"), "mzxq");
        assert_eq!(base32_encode(b"foo"), "mzxw6");
        assert_eq!(base32_encode(b"foobar"), "mzxw6ytboi");
    }

    #[test]
    fn test_locator_shape() {
        let locator = locator_for(b"evidence");
        assert!(locator.as_str().starts_with("bafk"));
        assert!(is_well_formed(&locator));
    }

    #[test]
    fn test_streaming_matches_oneshot() {
        let mut hasher = LocatorHasher::new();
        hasher.update(b"evi");
        hasher.update(b"dence");
        assert_eq!(hasher.finalize(), locator_for(b"evidence"));
    }

    #[test]
    fn test_rejects_foreign_locators() {
        let traversal = ContentLocator::new("../../etc/passwd").unwrap();
        assert!(!is_well_formed(&traversal));
        let ipfs = ContentLocator::new("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG").unwrap();
        assert!(!is_well_formed(&ipfs));
    }

    proptest! {
        #[test]
        fn prop_locators_are_well_formed(data in prop::collection::vec(any::<u8>(), 0..2048), split in 0usize..2048) {
            let locator = locator_for(&data);
            prop_assert!(is_well_formed(&locator));

            let split = split.min(data.len());
            let mut hasher = LocatorHasher::new();
            hasher.update(&data[..split]);
            hasher.update(&data[split..]);
            prop_assert_eq!(hasher.finalize(), locator);
        }
    }
}
