//! Folding raw source records into unified users.
//!
//! Records are grouped by [`canonical_username`]. The first record seen
//! fixes the display casing and, if it has one, the email. Later records
//! only fill a missing email and extend the provenance sets. Iteration order
//! is the order of the batches, then the order of records inside each batch,
//! so the output is deterministic for a fixed server ordering.
//!
//! Provenance is taken from the batch, not from the record's own
//! `source_server_id`.

use super::{RawSourceUser, UnifiedUser, canonical_username};
use log::{debug, warn};
use std::collections::HashMap;

/// All records one server returned during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBatch {
    pub server_id: String,
    pub users: Vec<RawSourceUser>,
}

impl SourceBatch {
    pub fn new(server_id: impl Into<String>, users: Vec<RawSourceUser>) -> Self {
        Self {
            server_id: server_id.into(),
            users,
        }
    }
}

/// Merge every batch into one unified user per distinct username.
///
/// Output order is first-seen order. Records with a blank username cannot be
/// keyed and are dropped with a warning.
pub fn merge(raw_by_source: &[SourceBatch]) -> Vec<UnifiedUser> {
    let mut unified: Vec<UnifiedUser> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for batch in raw_by_source {
        debug!(
            "Merging {} records from server '{}'",
            batch.users.len(),
            batch.server_id
        );

        for record in &batch.users {
            let key = canonical_username(&record.username);
            if key.is_empty() {
                warn!(
                    "Ignoring record with blank username from server '{}' (native id {})",
                    record.source_server_id, record.native_id
                );
                continue;
            }
            if record.source_server_id != batch.server_id {
                warn!(
                    "Record '{}' from server '{}' is labelled '{}'; attributing it to '{}'",
                    record.username, batch.server_id, record.source_server_id, batch.server_id
                );
            }

            match index.get(&key) {
                Some(&position) => unified[position].absorb(&batch.server_id, record),
                None => {
                    index.insert(key.clone(), unified.len());
                    unified.push(UnifiedUser::from_first_record(key, &batch.server_id, record));
                }
            }
        }
    }

    debug!(
        "Merged {} batches into {} unified users",
        raw_by_source.len(),
        unified.len()
    );
    unified
}
