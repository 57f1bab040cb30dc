//! Golden fingerprint vectors.
//!
//! Published SHA-256 test vectors (FIPS 180-2 and the common pangram).
//! A fingerprint that disagrees with any of these is not interoperable with
//! anything else that checks the ledger.

use truelocker_core::{CoreError, Fingerprint, FingerprintEngine};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Input block.
    pub block: &'static [u8],
    /// How many times the block is repeated to form the input.
    pub repeat: usize,
    /// Expected fingerprint (lowercase hex).
    pub expected_hex: &'static str,
}

impl GoldenVector {
    /// The full input.
    pub fn input(&self) -> Vec<u8> {
        self.block.repeat(self.repeat)
    }

    pub fn expected(&self) -> Result<Fingerprint, CoreError> {
        Fingerprint::from_hex(self.expected_hex)
    }
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "empty",
            block: b"",
            repeat: 1,
            expected_hex: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        },
        GoldenVector {
            name: "abc",
            block: b"abc",
            repeat: 1,
            expected_hex: "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        },
        GoldenVector {
            name: "quick brown fox",
            block: b"The quick brown fox jumps over the lazy dog",
            repeat: 1,
            expected_hex: "d7a8fbb307d7809469ca9abcb0082e4f8d5651e46d3cdb762d02d0bf37c9e592",
        },
        GoldenVector {
            name: "448-bit message",
            block: b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq",
            repeat: 1,
            expected_hex: "248d6a61d20638b8e5c026930c3e6039a33ce45964ff2167f6ecedd419db06c1",
        },
        GoldenVector {
            name: "one million a",
            block: b"a",
            repeat: 1_000_000,
            expected_hex: "cdc76e5c9914fb9281a1c7e284d73e67f1809a48a497200e046d39ccc7112cd0",
        },
    ]
}

/// Check every vector against `engine`, reading through its chunked path.
///
/// Returns the names of the vectors that did not match.
pub fn verify_all_vectors(engine: &FingerprintEngine) -> Vec<&'static str> {
    all_vectors()
        .into_iter()
        .filter(|vector| {
            let input = vector.input();
            let oneshot = engine.fingerprint_bytes(&input).to_hex();
            let streamed = engine.fingerprint_reader(input.as_slice()).map(|fp| fp.to_hex());
            oneshot != vector.expected_hex || streamed.ok().as_deref() != Some(vector.expected_hex)
        })
        .map(|vector| vector.name)
        .collect()
}
