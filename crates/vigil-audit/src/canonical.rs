//! Canonical byte encoding for entry hashing.
//!
//! Two entries that differ in any field must produce different
//! canonical forms, and the same entry must always produce the same
//! bytes regardless of platform. Every field is length-prefixed with a
//! 4-byte big-endian length and concatenated in a fixed order, which
//! makes the encoding injective: the stream can be unambiguously split
//! back into fields, so no two field sequences collide.
//!
//! The field order must never change once entries have been hashed -
//! reordering would silently break every existing chain.

use vigil_crypto::{AuthTag, ChainHash, TagKey};

use crate::entry::DraftEntry;

/// Sentinel byte for `None` optional ids. Real UUID fields are always
/// exactly 16 bytes, so a single zero byte cannot collide with one.
const NONE_SENTINEL: &[u8] = &[0x00];

/// Length-prefix a field with a 4-byte big-endian length.
#[allow(clippy::cast_possible_truncation)]
fn push_field(buf: &mut Vec<u8>, data: &[u8]) {
    // Entry fields are domains, paths, reasons, and fixed-size ids -
    // all far below u32::MAX bytes.
    buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
    buf.extend_from_slice(data);
}

/// Build the hash preimage: `(sequence, prior_hash, all entry fields)`.
///
/// `entry_hash` and `auth_tag` are excluded - they are derived from
/// this encoding, not part of it.
fn preimage(prior_hash: &ChainHash, sequence: u64, record: &DraftEntry) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);

    push_field(&mut buf, &sequence.to_be_bytes());
    push_field(&mut buf, prior_hash.as_bytes());
    push_field(&mut buf, record.entry_id.as_bytes());
    push_field(&mut buf, &record.timestamp.as_micros().to_be_bytes());
    push_field(&mut buf, record.agent_id.as_bytes());
    push_field(&mut buf, record.domain.as_bytes());
    push_field(&mut buf, &[record.decision.verdict.as_u8()]);
    push_field(
        &mut buf,
        record
            .decision
            .matched_policy_id
            .as_ref()
            .map_or(NONE_SENTINEL, |id| id.as_bytes().as_slice()),
    );
    push_field(
        &mut buf,
        record
            .decision
            .matched_rule_id
            .as_ref()
            .map_or(NONE_SENTINEL, |id| id.as_bytes().as_slice()),
    );
    push_field(&mut buf, record.decision.reason.as_bytes());
    push_field(&mut buf, &[record.method.as_u8()]);
    push_field(&mut buf, record.path.as_bytes());
    push_field(&mut buf, record.source_ip.as_bytes());
    push_field(&mut buf, &record.latency_us.to_be_bytes());

    buf
}

/// Compute an entry's hash: BLAKE3 over the canonical encoding.
///
/// Unkeyed, so chain breaks are detectable by anyone holding the
/// entries; the keyed check is [`seal_entry`].
#[must_use]
pub fn hash_entry(prior_hash: &ChainHash, sequence: u64, record: &DraftEntry) -> ChainHash {
    ChainHash::hash(&preimage(prior_hash, sequence, record))
}

/// Seal an entry hash with the writer's secret key.
///
/// An attacker who rewrites an entry and recomputes the chain still
/// cannot produce matching tags without the key.
#[must_use]
pub fn seal_entry(entry_hash: &ChainHash, key: &TagKey) -> AuthTag {
    key.seal(entry_hash.as_bytes())
}
