pub mod reorder;
pub mod window;

pub use reorder::{BatchReorderer, WindowDigest, UNAVAILABLE_SUMMARY};
pub use window::{partition, Window, WindowWidth};
