//! Content fingerprints.
//!
//! A fingerprint is the SHA-256 digest of the raw evidence bytes. The
//! external form is 64 lowercase hex characters, which is what gets
//! published to the ledger. Parsing accepts any letter case.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Read};

use crate::error::{CoreError, Result};

/// Default read size when streaming content into the hasher.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A 32-byte SHA-256 content fingerprint.
///
/// Equality is exact byte comparison.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Length of the hex representation.
    pub const HEX_LEN: usize = 64;

    /// Fingerprint an in-memory byte slice.
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Fingerprinter::new();
        hasher.update(data);
        hasher.finalize()
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex, ignoring letter case.
    pub fn from_hex(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.len() != Self::HEX_LEN {
            return Err(CoreError::InvalidFingerprint(format!(
                "expected {} hex characters, got {}",
                Self::HEX_LEN,
                trimmed.len()
            )));
        }
        let mut arr = [0u8; 32];
        hex::decode_to_slice(trimmed.to_ascii_lowercase(), &mut arr)
            .map_err(|e| CoreError::InvalidFingerprint(e.to_string()))?;
        Ok(Self(arr))
    }

    /// Compare against an externally supplied hex string.
    ///
    /// Returns false for malformed input rather than failing.
    pub fn matches_hex(&self, s: &str) -> bool {
        Self::from_hex(s).map(|other| other == *self).unwrap_or(false)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Fingerprint {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Fingerprint {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_hex()
    }
}

impl std::str::FromStr for Fingerprint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

/// Incremental fingerprint computation.
///
/// Feeding the same bytes in any split produces the same fingerprint.
#[derive(Clone, Default)]
pub struct Fingerprinter {
    hasher: Sha256,
    consumed: u64,
}

impl Fingerprinter {
    /// Start a new computation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb the next chunk of content.
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.consumed += chunk.len() as u64;
    }

    /// Number of bytes absorbed so far.
    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    /// Finish and return the fingerprint.
    pub fn finalize(self) -> Fingerprint {
        Fingerprint(self.hasher.finalize().into())
    }
}

impl fmt::Debug for Fingerprinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fingerprinter")
            .field("consumed", &self.consumed)
            .finish()
    }
}

/// Deterministic, chunked fingerprinting of byte streams.
///
/// All byte sequences are valid input, including the empty one. The only
/// failure mode is the reader itself failing before end of stream.
#[derive(Debug, Clone, Copy)]
pub struct FingerprintEngine {
    chunk_size: usize,
}

impl FingerprintEngine {
    /// Create an engine that reads `chunk_size` bytes at a time.
    ///
    /// A chunk size of zero is treated as one.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// The read size used when streaming.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Fingerprint an in-memory slice.
    pub fn fingerprint_bytes(&self, data: &[u8]) -> Fingerprint {
        Fingerprint::of(data)
    }

    /// Fingerprint everything a reader yields until end of stream.
    pub fn fingerprint_reader<R: Read>(&self, mut reader: R) -> io::Result<Fingerprint> {
        let mut hasher = Fingerprinter::new();
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finalize())
    }
}

impl Default for FingerprintEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    /// A reader that fails after yielding a prefix.
    struct FailingReader {
        remaining: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "file vanished"));
            }
            let n = buf.len().min(self.remaining);
            buf[..n].fill(0x5a);
            self.remaining -= n;
            Ok(n)
        }
    }

    /// A reader that reports `Interrupted` before every real read.
    struct InterruptingReader<'a> {
        data: &'a [u8],
        interrupt: bool,
    }

    impl Read for InterruptingReader<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
            }
            self.data.read(buf)
        }
    }

    #[test]
    fn test_reference_vectors() {
        assert_eq!(Fingerprint::of(b"").to_hex(), EMPTY_SHA256);
        assert_eq!(Fingerprint::of(b"abc").to_hex(), ABC_SHA256);
    }

    #[test]
    fn test_hex_parse_is_case_insensitive() {
        let fp = Fingerprint::from_hex(&ABC_SHA256.to_uppercase()).unwrap();
        assert_eq!(fp.to_hex(), ABC_SHA256);
        assert!(fp.matches_hex(ABC_SHA256));
        assert!(fp.matches_hex("BA7816BF8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015AD"));
    }

    #[test]
    fn test_hex_parse_rejects_bad_input() {
        assert!(Fingerprint::from_hex("abc").is_err());
        assert!(Fingerprint::from_hex(&"zz".repeat(32)).is_err());
        assert!(!Fingerprint::of(b"abc").matches_hex("not hex"));
    }

    #[test]
    fn test_reader_error_surfaces() {
        let engine = FingerprintEngine::new(16);
        let err = engine
            .fingerprint_reader(FailingReader { remaining: 40 })
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_interrupted_reads_are_retried() {
        let engine = FingerprintEngine::new(2);
        let fp = engine
            .fingerprint_reader(InterruptingReader {
                data: b"abc",
                interrupt: false,
            })
            .unwrap();
        assert_eq!(fp.to_hex(), ABC_SHA256);
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() {
        let engine = FingerprintEngine::new(0);
        assert_eq!(engine.chunk_size(), 1);
        assert_eq!(engine.fingerprint_reader(&b"abc"[..]).unwrap().to_hex(), ABC_SHA256);
    }

    #[test]
    fn test_serde_uses_hex() {
        let fp = Fingerprint::of(b"abc");
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, format!("\"{}\"", ABC_SHA256));
        let back: Fingerprint = serde_json::from_str(&json.to_uppercase()).unwrap();
        assert_eq!(back, fp);
    }

    proptest! {
        #[test]
        fn test_chunking_does_not_change_fingerprint(
            data in prop::collection::vec(any::<u8>(), 0..4096),
            chunk in 1usize..600,
        ) {
            let whole = Fingerprint::of(&data);
            let streamed = FingerprintEngine::new(chunk).fingerprint_reader(&data[..]).unwrap();
            prop_assert_eq!(whole, streamed);

            let mut manual = Fingerprinter::new();
            for piece in data.chunks(chunk) {
                manual.update(piece);
            }
            prop_assert_eq!(manual.bytes_consumed(), data.len() as u64);
            prop_assert_eq!(manual.finalize(), whole);
        }

        #[test]
        fn test_distinct_content_distinct_fingerprint(
            a in prop::collection::vec(any::<u8>(), 0..256),
            b in prop::collection::vec(any::<u8>(), 0..256),
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(Fingerprint::of(&a), Fingerprint::of(&b));
        }
    }
}
