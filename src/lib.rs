pub mod audio;
pub mod clock;
pub mod config;
pub mod error;
pub mod grouping;
pub mod http;
pub mod session;
pub mod stt;
pub mod summarize;
pub mod transcript;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, Credentials};
pub use error::{EchonoteError, Result};
pub use grouping::{WindowDigest, WindowWidth};
pub use http::{create_router, AppState};
pub use session::{SessionController, SessionSettings, SessionState, SessionStatus};
pub use transcript::{Segment, SegmentStore};
