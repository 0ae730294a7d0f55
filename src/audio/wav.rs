//! In-memory WAV encoding for chunk upload.

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use super::chunk::AudioChunk;
use crate::error::Result;

/// Encodes 16-bit PCM samples as a complete WAV file in memory.
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

pub fn encode_chunk(chunk: &AudioChunk) -> Result<Vec<u8>> {
    encode_wav(&chunk.samples, chunk.sample_rate, chunk.channels)
}
