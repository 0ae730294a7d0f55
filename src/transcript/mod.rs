pub mod segment;
pub mod store;

pub use segment::{Segment, SegmentDraft};
pub use store::SegmentStore;
