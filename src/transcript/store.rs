//! In-memory segment store shared between the capture task and readers.
//!
//! Appends happen only from the capture task, so start times arrive
//! non-decreasing; the store enforces this rather than trusting it.
//! Readers always work from a snapshot, never from the live vector.

use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::{EchonoteError, Result};
use crate::transcript::segment::{Segment, SegmentDraft};

#[derive(Debug, Clone, Default)]
pub struct SegmentStore {
    inner: Arc<RwLock<Vec<Segment>>>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a draft, assigning the next contiguous id.
    ///
    /// Rejects drafts whose start time precedes the last stored start
    /// time; equal start times are fine.
    pub fn append(&self, draft: SegmentDraft) -> Result<u64> {
        let mut segments = self.inner.write().unwrap();

        if let Some(last) = segments.last() {
            if draft.start_time < last.start_time {
                return Err(EchonoteError::OrderingViolation {
                    last: last.start_time,
                    attempted: draft.start_time,
                });
            }
        }

        let id = segments.len() as u64;
        debug!(id, start = %draft.start_time, "Appending segment");
        segments.push(Segment {
            id,
            start_time: draft.start_time,
            end_time: draft.end_time,
            text: draft.text,
            confidence: draft.confidence,
        });
        Ok(id)
    }

    /// Point-in-time copy of all segments, in append order.
    pub fn snapshot(&self) -> Vec<Segment> {
        self.inner.read().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }

    /// Drops all segments; the next append gets id 0 again.
    pub fn clear(&self) {
        self.inner.write().unwrap().clear();
    }
}
