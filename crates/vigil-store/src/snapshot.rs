//! Snapshot persistence for the columnar store.
//!
//! No on-disk format is mandated for the pipeline; when a store IS
//! persisted, the columnar layout must survive intact - one contiguous
//! sequence per field, sequence-ordered - so that chain continuity can
//! be re-established from the last stored entry. The snapshot is the
//! column struct serialized as JSON.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, warn};

use crate::columnar::{Columns, ColumnarStore};
use crate::error::{StoreError, StoreResult};

impl ColumnarStore {
    /// Write the store to a snapshot file, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] or [`StoreError::Encoding`] on
    /// failure; the store itself is untouched.
    pub fn save(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let file = File::create(path.as_ref())?;
        let writer = BufWriter::new(file);
        self.with_columns(|columns| serde_json::to_writer(writer, columns))?;
        debug!(path = %path.as_ref().display(), entries = self.len(), "saved store snapshot");
        Ok(())
    }

    /// Load a store from a snapshot file.
    ///
    /// Validates the structural invariants before accepting the data:
    /// every column must have the same length and timestamps must be
    /// non-decreasing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] / [`StoreError::Encoding`] on read
    /// failure, or [`StoreError::CorruptSnapshot`] if the invariants do
    /// not hold.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        let columns: Columns = serde_json::from_reader(reader)?;

        validate(&columns)?;
        debug!(path = %path.as_ref().display(), entries = columns.len(), "loaded store snapshot");
        Ok(Self::from_columns(columns))
    }
}

fn validate(columns: &Columns) -> StoreResult<()> {
    let len = columns.len();
    let widths = [
        ("entry_ids", columns.entry_ids.len()),
        ("agent_ids", columns.agent_ids.len()),
        ("domains", columns.domains.len()),
        ("verdicts", columns.verdicts.len()),
        ("reasons", columns.reasons.len()),
        ("policy_ids", columns.policy_ids.len()),
        ("rule_ids", columns.rule_ids.len()),
        ("methods", columns.methods.len()),
        ("paths", columns.paths.len()),
        ("source_ips", columns.source_ips.len()),
        ("latencies", columns.latencies.len()),
        ("prior_hashes", columns.prior_hashes.len()),
        ("entry_hashes", columns.entry_hashes.len()),
        ("auth_tags", columns.auth_tags.len()),
    ];
    for (name, width) in widths {
        if width != len {
            warn!(column = name, expected = len, actual = width, "ragged snapshot");
            return Err(StoreError::CorruptSnapshot {
                reason: format!("column {name} has {width} rows, expected {len}"),
            });
        }
    }

    if !columns.timestamps.is_sorted() {
        return Err(StoreError::CorruptSnapshot {
            reason: "timestamp column is not sorted".to_string(),
        });
    }

    Ok(())
}
