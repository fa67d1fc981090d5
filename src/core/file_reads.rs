//! Bookkeeping for file reads that finish after the user kept editing.
//!
//! A read is started with [`FileReadTracker::begin`] and its result is only
//! applied if the ticket is still the newest one for its slot and the slot
//! still exists in the current tree.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::core::builder::{FormBuilder, FormCommand};
use crate::domain::{EntryId, FieldId, FieldType, FileValue, KvValue};
use crate::errors::{FormError, FormResult};

/// Slot that receives the file once it has been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileTarget {
    FieldAttachment(FieldId),
    PairValue(EntryId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTicket {
    pub target: FileTarget,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Applied(FormBuilder),
    Stale,
}

#[derive(Debug, Default)]
pub struct FileReadTracker {
    latest: HashMap<FileTarget, u64>,
    next_generation: u64,
}

impl FileReadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a read for `target`, superseding any read already pending for it.
    pub fn begin(&mut self, target: FileTarget) -> ReadTicket {
        self.next_generation += 1;
        self.latest.insert(target, self.next_generation);
        ReadTicket {
            target,
            generation: self.next_generation,
        }
    }

    /// Marks any pending read for `target` as stale, e.g. after the slot was
    /// overwritten directly.
    pub fn invalidate(&mut self, target: FileTarget) {
        self.latest.remove(&target);
    }

    pub fn cancel_all(&mut self) {
        self.latest.clear();
    }

    pub fn pending(&self) -> usize {
        self.latest.len()
    }

    /// Applies the read result to `builder` if the ticket is still current.
    pub fn complete(
        &mut self,
        ticket: ReadTicket,
        mut files: Vec<FileValue>,
        builder: &FormBuilder,
    ) -> FormResult<ReadOutcome> {
        if self.latest.get(&ticket.target) != Some(&ticket.generation) {
            debug!(slot = ?ticket.target, "discarding superseded file read");
            return Ok(ReadOutcome::Stale);
        }
        self.latest.remove(&ticket.target);

        let index = builder.node_index();
        let command = match ticket.target {
            FileTarget::FieldAttachment(field) => {
                let Some(position) = index.field_position(field) else {
                    warn!(%field, "field removed before file read completed");
                    return Ok(ReadOutcome::Stale);
                };
                if builder.field(position)?.field_type != FieldType::File {
                    warn!(%field, "field is no longer a file field; discarding read");
                    return Ok(ReadOutcome::Stale);
                }
                if files.len() != 1 {
                    return Err(FormError::InvalidOperation(format!(
                        "a file field takes exactly one file, got {}",
                        files.len()
                    )));
                }
                FormCommand::SetAttachment {
                    field,
                    file: files.pop(),
                }
            }
            FileTarget::PairValue(entry) => {
                if index.locate_entry(entry).is_none() {
                    warn!(%entry, "key/value entry removed before file read completed");
                    return Ok(ReadOutcome::Stale);
                }
                let value = match files.len() {
                    0 => {
                        return Err(FormError::InvalidOperation(
                            "file read produced no files".into(),
                        ))
                    }
                    1 => KvValue::File(files.remove(0)),
                    _ => KvValue::Files(files),
                };
                FormCommand::SetPairValue { entry, value }
            }
        };
        builder.apply(command).map(ReadOutcome::Applied)
    }
}
