pub mod backend;
pub mod chunk;
pub mod file;
pub mod wav;

#[cfg(feature = "microphone")]
pub mod microphone;

pub use backend::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource,
    DefaultBackendFactory, MockAudioBackend, MockBackendFactory,
};
pub use chunk::{AudioChunk, Chunker};
pub use file::{AudioFile, FileBackend};
