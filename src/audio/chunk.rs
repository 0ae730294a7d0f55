use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::backend::AudioFrame;

/// A fixed-duration span of captured audio, ready for transcription.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Chunk number (0-indexed)
    pub index: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioChunk {
    pub fn duration_seconds(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

/// Slices the incoming sample stream into fixed-duration chunks.
///
/// Chunk timestamps are derived from the session epoch plus sample
/// counts, never from frame arrival times, so consecutive chunks abut
/// exactly and start times are non-decreasing by construction.
pub struct Chunker {
    epoch: DateTime<Utc>,
    sample_rate: u32,
    channels: u16,
    /// Interleaved samples per complete chunk
    samples_per_chunk: usize,
    /// Gain multiplier applied as samples enter, clamped to 0.0-10.0
    gain: f32,
    buffer: Vec<i16>,
    chunk_index: usize,
}

impl Chunker {
    pub fn new(
        epoch: DateTime<Utc>,
        chunk_seconds: u64,
        sample_rate: u32,
        channels: u16,
        gain: f32,
    ) -> Self {
        let samples_per_chunk = chunk_seconds as usize * sample_rate as usize * channels as usize;
        Self {
            epoch,
            sample_rate,
            channels,
            samples_per_chunk,
            gain: gain.clamp(0.0, 10.0),
            buffer: Vec::with_capacity(samples_per_chunk),
            chunk_index: 0,
        }
    }

    /// Consumes a frame, returning any chunks it completed.
    ///
    /// A frame larger than the remaining chunk capacity can complete
    /// more than one chunk at once.
    pub fn push(&mut self, frame: &AudioFrame) -> Vec<AudioChunk> {
        let mut completed = Vec::new();

        for &sample in &frame.samples {
            self.buffer.push(scale(sample, self.gain));
            if self.buffer.len() == self.samples_per_chunk {
                completed.push(self.take_chunk());
            }
        }

        completed
    }

    /// Emits the partial chunk accumulated since the last boundary.
    pub fn flush(&mut self) -> Option<AudioChunk> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(self.take_chunk())
    }

    fn take_chunk(&mut self) -> AudioChunk {
        let samples = std::mem::replace(
            &mut self.buffer,
            Vec::with_capacity(self.samples_per_chunk),
        );

        let consumed_before = (self.chunk_index * self.samples_per_chunk) as u64;
        let start_time = self.epoch + Duration::milliseconds(self.offset_ms(consumed_before));
        let end_time =
            self.epoch + Duration::milliseconds(self.offset_ms(consumed_before + samples.len() as u64));

        let chunk = AudioChunk {
            index: self.chunk_index,
            start_time,
            end_time,
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
        };

        info!(
            "Chunk {} complete: {:.1}s of audio ({} samples)",
            chunk.index,
            chunk.duration_seconds(),
            chunk.samples.len()
        );

        self.chunk_index += 1;
        chunk
    }

    fn offset_ms(&self, samples: u64) -> i64 {
        (samples * 1000 / (self.sample_rate as u64 * self.channels as u64)) as i64
    }
}

fn scale(sample: i16, gain: f32) -> i16 {
    if gain == 1.0 {
        return sample;
    }
    (sample as f32 * gain).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
    }

    fn frame(samples: Vec<i16>) -> AudioFrame {
        AudioFrame {
            samples,
            sample_rate: 16_000,
            channels: 1,
        }
    }

    #[test]
    fn test_chunk_completes_exactly_at_boundary() {
        // 1s chunks at 16kHz mono: 16000 samples per chunk
        let mut chunker = Chunker::new(epoch(), 1, 16_000, 1, 1.0);

        for _ in 0..9 {
            assert!(chunker.push(&frame(vec![0; 1600])).is_empty());
        }
        let chunks = chunker.push(&frame(vec![0; 1600]));

        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.index, 0);
        assert_eq!(chunk.samples.len(), 16_000);
        assert_eq!(chunk.start_time, epoch());
        assert_eq!(chunk.end_time, epoch() + Duration::seconds(1));
    }

    #[test]
    fn test_oversized_frame_completes_multiple_chunks() {
        let mut chunker = Chunker::new(epoch(), 1, 16_000, 1, 1.0);

        let chunks = chunker.push(&frame(vec![0; 40_000]));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[1].index, 1);
        // 8000 samples remain buffered
        let partial = chunker.flush().unwrap();
        assert_eq!(partial.samples.len(), 8_000);
        assert_eq!(partial.end_time, epoch() + Duration::milliseconds(2500));
    }

    #[test]
    fn test_consecutive_chunks_abut_exactly() {
        let mut chunker = Chunker::new(epoch(), 1, 16_000, 1, 1.0);
        let chunks = chunker.push(&frame(vec![0; 32_000]));

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].end_time, chunks[1].start_time);
        assert!(chunks[0].start_time <= chunks[1].start_time);
    }

    #[test]
    fn test_flush_emits_partial_chunk() {
        let mut chunker = Chunker::new(epoch(), 10, 16_000, 1, 1.0);
        chunker.push(&frame(vec![0; 8_000]));

        let partial = chunker.flush().unwrap();
        assert_eq!(partial.samples.len(), 8_000);
        assert_eq!(partial.start_time, epoch());
        assert_eq!(partial.end_time, epoch() + Duration::milliseconds(500));

        assert!(chunker.flush().is_none());
    }

    #[test]
    fn test_flush_on_empty_buffer_is_none() {
        let mut chunker = Chunker::new(epoch(), 10, 16_000, 1, 1.0);
        assert!(chunker.flush().is_none());
    }

    #[test]
    fn test_stereo_arithmetic_counts_interleaved_samples() {
        // 1s chunks at 16kHz stereo: 32000 interleaved samples per chunk
        let mut chunker = Chunker::new(epoch(), 1, 16_000, 2, 1.0);
        assert!(chunker
            .push(&AudioFrame {
                samples: vec![0; 16_000],
                sample_rate: 16_000,
                channels: 2,
            })
            .is_empty());
        let chunks = chunker.push(&AudioFrame {
            samples: vec![0; 16_000],
            sample_rate: 16_000,
            channels: 2,
        });
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].end_time, epoch() + Duration::seconds(1));
    }

    #[test]
    fn test_gain_scales_samples() {
        let mut chunker = Chunker::new(epoch(), 1, 16_000, 1, 2.0);
        chunker.push(&frame(vec![100, -100]));
        let partial = chunker.flush().unwrap();
        assert_eq!(&partial.samples[..2], &[200, -200]);
    }

    #[test]
    fn test_gain_saturates_instead_of_wrapping() {
        let mut chunker = Chunker::new(epoch(), 1, 16_000, 1, 10.0);
        chunker.push(&frame(vec![i16::MAX, i16::MIN]));
        let partial = chunker.flush().unwrap();
        assert_eq!(&partial.samples[..2], &[i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_out_of_range_gain_is_clamped() {
        // 50x requested, clamped to 10x
        let mut chunker = Chunker::new(epoch(), 1, 16_000, 1, 50.0);
        chunker.push(&frame(vec![1000]));
        assert_eq!(chunker.flush().unwrap().samples[0], 10_000);

        // Negative gain clamps to silence
        let mut muted = Chunker::new(epoch(), 1, 16_000, 1, -3.0);
        muted.push(&frame(vec![1000]));
        assert_eq!(muted.flush().unwrap().samples[0], 0);
    }
}
