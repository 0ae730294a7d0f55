use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future;
use serde::Serialize;
use tracing::{debug, warn};

use super::window::Window;
use crate::config::MergePolicy;
use crate::error::{EchonoteError, Result};
use crate::summarize::{BatchItem, Summarizer};
use crate::transcript::Segment;

/// Summary marker for a batch whose summarization call failed.
pub const UNAVAILABLE_SUMMARY: &str = "[summary unavailable]";

/// One window after reorder-and-summarize.
#[derive(Debug, Clone, Serialize)]
pub struct WindowDigest {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Segments in proposed reading order; batches that failed keep
    /// their original order.
    pub segments: Vec<Segment>,
    pub summary: String,
    pub failed_batches: usize,
}

/// Sends window segments to the summarizer in bounded batches and
/// assembles the replies.
///
/// Slicing preserves order: segment k stays ahead of segment k+n
/// across batch boundaries, and the summarizer may only rearrange
/// within a batch. A failed batch is isolated, never the window.
pub struct BatchReorderer {
    summarizer: Arc<dyn Summarizer>,
    batch_limit: usize,
    merge_policy: MergePolicy,
}

impl BatchReorderer {
    pub fn new(
        summarizer: Arc<dyn Summarizer>,
        batch_limit: usize,
        merge_policy: MergePolicy,
    ) -> Self {
        Self {
            summarizer,
            batch_limit: batch_limit.max(1),
            merge_policy,
        }
    }

    /// Processes every window, dispatching all batches concurrently.
    pub async fn process_all(&self, windows: Vec<Window>) -> Vec<WindowDigest> {
        future::join_all(windows.into_iter().map(|w| self.process_window(w))).await
    }

    pub async fn process_window(&self, window: Window) -> WindowDigest {
        let batches: Vec<&[Segment]> = window.segments.chunks(self.batch_limit).collect();
        debug!(
            "Window {} has {} segments in {} batches",
            window.index,
            window.segments.len(),
            batches.len()
        );

        let replies =
            future::join_all(batches.iter().map(|batch| self.process_batch(batch))).await;

        let mut segments = Vec::with_capacity(window.segments.len());
        let mut summaries = Vec::with_capacity(replies.len());
        let mut failed_batches = 0;

        for (batch, reply) in batches.iter().zip(replies) {
            match reply {
                Ok((reordered, summary)) => {
                    segments.extend(reordered);
                    summaries.push(summary);
                }
                Err(e) => {
                    warn!("Batch failed, keeping original order: {}", e);
                    segments.extend(batch.iter().cloned());
                    summaries.push(UNAVAILABLE_SUMMARY.to_string());
                    failed_batches += 1;
                }
            }
        }

        let summary = self.merge_summaries(summaries, failed_batches > 0).await;

        WindowDigest {
            window_start: window.window_start,
            window_end: window.window_end,
            segments,
            summary,
            failed_batches,
        }
    }

    async fn process_batch(&self, batch: &[Segment]) -> Result<(Vec<Segment>, String)> {
        let items: Vec<BatchItem> = batch
            .iter()
            .map(|segment| BatchItem {
                id: segment.id,
                text: segment.text.clone(),
            })
            .collect();

        let reply = self.summarizer.reorder_and_summarize(&items).await?;

        match apply_order(batch, &reply.order) {
            Some(reordered) => Ok((reordered, reply.summary)),
            None => Err(EchonoteError::Summarization {
                message: format!(
                    "reply order {:?} is not a permutation of the batch ids",
                    reply.order
                ),
            }),
        }
    }

    async fn merge_summaries(&self, summaries: Vec<String>, any_failed: bool) -> String {
        match self.merge_policy {
            MergePolicy::SecondPass if !any_failed && summaries.len() > 1 => {
                match self.summarizer.condense(&summaries).await {
                    Ok(merged) => merged,
                    Err(e) => {
                        warn!("Second-pass merge failed ({}), concatenating instead", e);
                        summaries.join(" / ")
                    }
                }
            }
            _ => summaries.join(" / "),
        }
    }
}

/// Rearranges `batch` into `proposed` order, or returns None when the
/// proposal is not a permutation of the batch ids (wrong length,
/// duplicate, or unknown id).
fn apply_order(batch: &[Segment], proposed: &[u64]) -> Option<Vec<Segment>> {
    if proposed.len() != batch.len() {
        return None;
    }

    let by_id: HashMap<u64, &Segment> = batch.iter().map(|s| (s.id, s)).collect();
    let mut seen = HashSet::with_capacity(proposed.len());
    let mut reordered = Vec::with_capacity(proposed.len());

    for id in proposed {
        if !seen.insert(*id) {
            return None;
        }
        reordered.push((*by_id.get(id)?).clone());
    }

    Some(reordered)
}
