//! Chain and tag verification.
//!
//! Verification is read-only and recomputes everything from the raw
//! entry fields. Hash-chain checks need no key; the tag check is the
//! separate, key-dependent pass. A tag mismatch on an entry whose hash
//! verifies points at key compromise or tag corruption rather than
//! altered content, so the two are reported distinctly.

use std::fmt;
use tracing::warn;
use vigil_crypto::{ChainHash, TagKey};

use crate::entry::AuditEntry;

/// How an entry failed chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TamperKind {
    /// The sequence numbers are not contiguous - an entry was removed
    /// or the slice was reordered.
    SequenceGap {
        /// The sequence number that should appear here.
        expected: u64,
        /// The sequence number found.
        actual: u64,
    },
    /// `prior_hash` does not match the predecessor's `entry_hash`.
    LinkBroken {
        /// The predecessor's entry hash.
        expected: ChainHash,
        /// The stored prior hash.
        actual: ChainHash,
    },
    /// The stored `entry_hash` does not match a fresh recomputation -
    /// the entry's content was altered.
    HashMismatch {
        /// The recomputed hash.
        expected: ChainHash,
        /// The stored hash.
        actual: ChainHash,
    },
}

impl fmt::Display for TamperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SequenceGap { expected, actual } => {
                write!(f, "sequence gap: expected {expected}, found {actual}")
            },
            Self::LinkBroken { .. } => {
                write!(f, "prior hash does not match predecessor")
            },
            Self::HashMismatch { .. } => {
                write!(f, "entry content does not match stored hash")
            },
        }
    }
}

/// Result of a chain verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStatus {
    /// Every entry in the supplied range verified.
    Valid {
        /// Number of entries checked.
        entries_verified: usize,
    },
    /// The first entry that failed, and how.
    TamperedAt {
        /// Sequence number of the first mismatch.
        sequence: u64,
        /// What failed.
        kind: TamperKind,
    },
}

impl ChainStatus {
    /// Whether the whole range verified.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

/// Result of a tag verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagStatus {
    /// Every tag in the supplied range matched.
    Valid {
        /// Number of entries checked.
        entries_verified: usize,
    },
    /// The first entry whose tag did not match the key.
    MismatchAt {
        /// Sequence number of the first mismatch.
        sequence: u64,
    },
}

impl TagStatus {
    /// Whether every tag matched.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

/// Verify a full chain from the genesis sentinel.
///
/// Walks every entry in order, checking sequence contiguity, prior-hash
/// linkage, and a fresh hash recomputation. Stops at the first
/// mismatch. Does not require the secret key.
#[must_use]
pub fn verify_chain(entries: &[AuditEntry]) -> ChainStatus {
    // A full chain starts at sequence 0; anything else is a gap.
    verify_from(entries, &ChainHash::GENESIS, 0)
}

/// Verify a contiguous slice of the chain against a trusted checkpoint.
///
/// The first entry's `prior_hash` is checked against `trusted_prior`
/// instead of the genesis sentinel, so a verifier holding a checkpoint
/// hash can validate later entries without replaying the whole chain.
#[must_use]
pub fn verify_range(entries: &[AuditEntry], trusted_prior: &ChainHash) -> ChainStatus {
    verify_from(entries, trusted_prior, entries.first().map_or(0, |e| e.sequence))
}

fn verify_from(entries: &[AuditEntry], trusted_prior: &ChainHash, first_seq: u64) -> ChainStatus {
    let mut expected_prior = *trusted_prior;
    let mut expected_seq = first_seq;
    let mut verified = 0usize;

    for entry in entries {
        if entry.sequence != expected_seq {
            warn!(
                expected = expected_seq,
                actual = entry.sequence,
                "chain verification found a sequence gap"
            );
            return ChainStatus::TamperedAt {
                sequence: entry.sequence,
                kind: TamperKind::SequenceGap {
                    expected: expected_seq,
                    actual: entry.sequence,
                },
            };
        }

        if entry.prior_hash != expected_prior {
            warn!(
                sequence = entry.sequence,
                "chain verification found a broken link"
            );
            return ChainStatus::TamperedAt {
                sequence: entry.sequence,
                kind: TamperKind::LinkBroken {
                    expected: expected_prior,
                    actual: entry.prior_hash,
                },
            };
        }

        let recomputed = entry.recompute_hash();
        if recomputed != entry.entry_hash {
            warn!(
                sequence = entry.sequence,
                "chain verification found altered entry content"
            );
            return ChainStatus::TamperedAt {
                sequence: entry.sequence,
                kind: TamperKind::HashMismatch {
                    expected: recomputed,
                    actual: entry.entry_hash,
                },
            };
        }

        expected_prior = entry.entry_hash;
        expected_seq = expected_seq.saturating_add(1);
        verified = verified.saturating_add(1);
    }

    ChainStatus::Valid {
        entries_verified: verified,
    }
}

/// Verify authentication tags against the writer's key.
///
/// The stronger, key-dependent check: a chain that verifies but whose
/// tags do not match was re-hashed by someone without the key.
#[must_use]
pub fn verify_tags(entries: &[AuditEntry], key: &TagKey) -> TagStatus {
    let mut verified = 0usize;

    for entry in entries {
        if !entry.tag_matches(key) {
            warn!(sequence = entry.sequence, "authentication tag mismatch");
            return TagStatus::MismatchAt {
                sequence: entry.sequence,
            };
        }
        verified = verified.saturating_add(1);
    }

    TagStatus::Valid {
        entries_verified: verified,
    }
}
