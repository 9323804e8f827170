//! Segment recording driven by VAD edges
//!
//! [`SegmentRecorder`] owns the open/sealed lifecycle of audio segments. At
//! most one segment is open at a time: a start while one is open is a no-op,
//! and an end without one is a no-op. A sealed segment is immutable and
//! consumed exactly once by transcription.

use super::capture::samples_to_wav;
use crate::Result;

/// One continuous captured span of audio from speech-start to speech-end
///
/// Sealed at creation; chunks are only accumulated inside the recorder while
/// the segment is open.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    chunks: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioSegment {
    /// Total number of samples across all chunks
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Segment duration derived from the sample count
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        let samples = u64::try_from(self.sample_count()).unwrap_or(u64::MAX);
        samples.saturating_mul(1000) / u64::from(self.sample_rate)
    }

    /// Whether the segment captured any audio at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(Vec::is_empty)
    }

    /// Flatten the chunk sequence into one contiguous sample buffer
    #[must_use]
    pub fn samples(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.sample_count());
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }

    /// Encode the segment as WAV bytes (content type `audio/wav`)
    ///
    /// # Errors
    ///
    /// Returns error if WAV encoding fails
    pub fn to_wav(&self) -> Result<Vec<u8>> {
        samples_to_wav(&self.samples(), self.sample_rate)
    }
}

/// Accumulates capture chunks into segments between VAD edges
#[derive(Debug)]
pub struct SegmentRecorder {
    open: Option<AudioSegment>,
    sample_rate: u32,
}

impl SegmentRecorder {
    /// Create a recorder for streams at `sample_rate`
    #[must_use]
    pub const fn new(sample_rate: u32) -> Self {
        Self {
            open: None,
            sample_rate,
        }
    }

    /// Open a new empty segment; no-op if one is already open
    pub fn on_speech_started(&mut self) {
        if self.open.is_some() {
            tracing::trace!("speech start ignored: segment already open");
            return;
        }
        self.open = Some(AudioSegment {
            chunks: Vec::new(),
            sample_rate: self.sample_rate,
        });
        tracing::debug!("segment opened");
    }

    /// Append a capture chunk to the open segment; dropped if none is open
    pub fn push_chunk(&mut self, chunk: Vec<f32>) {
        if let Some(segment) = &mut self.open {
            segment.chunks.push(chunk);
        }
    }

    /// Seal and return the open segment; `None` if none is open
    pub fn on_speech_ended(&mut self) -> Option<AudioSegment> {
        let segment = self.open.take()?;
        tracing::debug!(
            samples = segment.sample_count(),
            duration_ms = segment.duration_ms(),
            "segment sealed"
        );
        Some(segment)
    }

    /// Whether a segment is currently open
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.open.is_some()
    }

    /// Discard the open segment, if any (session stop)
    pub fn discard(&mut self) {
        if self.open.take().is_some() {
            tracing::debug!("open segment discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_start_opens_one_segment() {
        let mut rec = SegmentRecorder::new(16000);
        rec.on_speech_started();
        rec.push_chunk(vec![0.1; 160]);
        rec.on_speech_started(); // must not reset the open segment
        rec.push_chunk(vec![0.2; 160]);

        let segment = rec.on_speech_ended().unwrap();
        assert_eq!(segment.sample_count(), 320);
    }

    #[test]
    fn end_without_open_segment_is_noop() {
        let mut rec = SegmentRecorder::new(16000);
        assert!(rec.on_speech_ended().is_none());
    }

    #[test]
    fn chunks_outside_open_segment_are_dropped() {
        let mut rec = SegmentRecorder::new(16000);
        rec.push_chunk(vec![0.1; 160]);
        rec.on_speech_started();
        rec.push_chunk(vec![0.2; 160]);

        let segment = rec.on_speech_ended().unwrap();
        assert_eq!(segment.sample_count(), 160);
    }

    #[test]
    fn sealed_segment_reports_duration() {
        let mut rec = SegmentRecorder::new(16000);
        rec.on_speech_started();
        rec.push_chunk(vec![0.0; 16000]);
        let segment = rec.on_speech_ended().unwrap();
        assert_eq!(segment.duration_ms(), 1000);
        assert!(!rec.is_recording());
    }

    #[test]
    fn discard_clears_open_segment() {
        let mut rec = SegmentRecorder::new(16000);
        rec.on_speech_started();
        rec.push_chunk(vec![0.1; 160]);
        rec.discard();
        assert!(!rec.is_recording());
        assert!(rec.on_speech_ended().is_none());
    }
}
