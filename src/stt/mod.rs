pub mod http;
pub mod transcription;

pub use http::HttpTranscription;
pub use transcription::{MockTranscription, Transcription, Utterance};
