pub mod http;
pub mod summarizer;

pub use http::HttpSummarizer;
pub use summarizer::{BatchItem, BatchReply, MockBehavior, MockSummarizer, Summarizer};
