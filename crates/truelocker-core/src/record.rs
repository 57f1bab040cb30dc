//! Evidence records: the unit persisted on the ledger.
//!
//! A record is created by the ledger when it commits an append and is
//! immutable afterwards. There is no update or delete.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::fingerprint::Fingerprint;
use crate::types::{ContentLocator, Identity, SequenceId};

/// Field keys for the canonical CBOR encoding.
///
/// Keys follow the wire field order so the encoding is stable.
mod keys {
    pub const LOCATOR: u64 = 0;
    pub const FINGERPRINT: u64 = 1;
    pub const SUBMITTER: u64 = 2;
    pub const RECORDED_AT: u64 = 3;
    pub const SEQUENCE_ID: u64 = 4;
}

/// A committed ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EvidenceRecord {
    /// Where the content bytes can be retrieved from.
    pub locator: ContentLocator,

    /// Fingerprint published at registration time.
    pub fingerprint: Fingerprint,

    /// Account that submitted the record.
    pub submitter: Identity,

    /// Ledger commit time (Unix seconds). Assigned by the ledger.
    pub recorded_at: u64,

    /// Ledger-assigned position.
    pub sequence_id: SequenceId,
}

impl EvidenceRecord {
    /// Convert to the external wire form.
    pub fn to_wire(&self) -> LedgerRecord {
        LedgerRecord::from(self)
    }

    /// Whether this record was registered with the given content fingerprint.
    pub fn attests(&self, fingerprint: &Fingerprint) -> bool {
        self.fingerprint == *fingerprint
    }
}

/// The external representation of a record, as the ledger stores it.
///
/// Field order matches the ledger schema: locator, fingerprint, submitter,
/// recorded_at, sequence_id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    pub locator: String,
    pub fingerprint: String,
    pub submitter: String,
    pub recorded_at: u64,
    pub sequence_id: u64,
}

impl From<&EvidenceRecord> for LedgerRecord {
    fn from(record: &EvidenceRecord) -> Self {
        Self {
            locator: record.locator.as_str().to_string(),
            fingerprint: record.fingerprint.to_hex(),
            submitter: record.submitter.as_str().to_string(),
            recorded_at: record.recorded_at,
            sequence_id: record.sequence_id.value(),
        }
    }
}

impl TryFrom<LedgerRecord> for EvidenceRecord {
    type Error = CoreError;

    fn try_from(wire: LedgerRecord) -> Result<Self> {
        Ok(Self {
            locator: ContentLocator::new(wire.locator)?,
            fingerprint: Fingerprint::from_hex(&wire.fingerprint)?,
            submitter: Identity::new(wire.submitter)?,
            recorded_at: wire.recorded_at,
            sequence_id: SequenceId::new(wire.sequence_id),
        })
    }
}

/// Encode a record to deterministic CBOR bytes.
///
/// The encoding is a definite-length map with small integer keys in
/// ascending order. The fingerprint is encoded as raw bytes, so two
/// records that differ only in the letter case of their published hex
/// encode identically.
pub fn canonical_record_bytes(record: &EvidenceRecord) -> Result<Vec<u8>> {
    let value = Value::Map(vec![
        (
            Value::Integer(keys::LOCATOR.into()),
            Value::Text(record.locator.as_str().to_string()),
        ),
        (
            Value::Integer(keys::FINGERPRINT.into()),
            Value::Bytes(record.fingerprint.as_bytes().to_vec()),
        ),
        (
            Value::Integer(keys::SUBMITTER.into()),
            Value::Text(record.submitter.as_str().to_string()),
        ),
        (
            Value::Integer(keys::RECORDED_AT.into()),
            Value::Integer(record.recorded_at.into()),
        ),
        (
            Value::Integer(keys::SEQUENCE_ID.into()),
            Value::Integer(record.sequence_id.value().into()),
        ),
    ]);

    let mut buf = Vec::new();
    ciborium::into_writer(&value, &mut buf)
        .map_err(|e| CoreError::EncodingError(format!("{:?}", e)))?;
    Ok(buf)
}
