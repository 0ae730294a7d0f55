use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{EchonoteError, Result};

/// One segment as presented to the summarizer.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub id: u64,
    pub text: String,
}

/// The summarizer's answer for one batch: a proposed reading order
/// (ids from the request, each exactly once) and a prose summary.
#[derive(Debug, Clone)]
pub struct BatchReply {
    pub order: Vec<u64>,
    pub summary: String,
}

/// Reorder-and-summarize service boundary.
///
/// One call per batch; a failure affects only that batch.
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn reorder_and_summarize(&self, items: &[BatchItem]) -> Result<BatchReply>;

    /// Condenses several batch summaries into one (second-pass merge).
    async fn condense(&self, summaries: &[String]) -> Result<String>;

    /// Get implementation name for logging
    fn name(&self) -> &str;
}

/// Per-call behavior of the mock summarizer.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Echo the request order back.
    Identity,
    /// Reverse the request order.
    Reverse,
    /// Return exactly this order, valid or not.
    FixedOrder(Vec<u64>),
    /// Fail the call.
    Fail(String),
}

/// Scripted summarizer for tests.
///
/// Behaviors are consumed in call order; once the script runs dry,
/// calls behave as [`MockBehavior::Identity`]. Summaries are
/// deterministic ("recap first-last") so merged output is checkable.
#[derive(Default)]
pub struct MockSummarizer {
    script: Mutex<VecDeque<MockBehavior>>,
    calls: AtomicUsize,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(self, behavior: MockBehavior) -> Self {
        self.script.lock().unwrap().push_back(behavior);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_behavior(&self) -> MockBehavior {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockBehavior::Identity)
    }
}

fn recap(order: &[u64]) -> String {
    match (order.first(), order.last()) {
        (Some(first), Some(last)) => format!("recap {}-{}", first, last),
        _ => "recap empty".to_string(),
    }
}

#[async_trait::async_trait]
impl Summarizer for MockSummarizer {
    async fn reorder_and_summarize(&self, items: &[BatchItem]) -> Result<BatchReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let request_order: Vec<u64> = items.iter().map(|item| item.id).collect();

        let order = match self.next_behavior() {
            MockBehavior::Identity => request_order,
            MockBehavior::Reverse => request_order.into_iter().rev().collect(),
            MockBehavior::FixedOrder(order) => order,
            MockBehavior::Fail(message) => {
                return Err(EchonoteError::Summarization { message })
            }
        };

        let summary = recap(&order);
        Ok(BatchReply { order, summary })
    }

    async fn condense(&self, summaries: &[String]) -> Result<String> {
        match self.next_behavior() {
            MockBehavior::Fail(message) => Err(EchonoteError::Summarization { message }),
            _ => Ok(format!("condensed: {}", summaries.join(" | "))),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
