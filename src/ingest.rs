/*
 *  ingest.rs
 *
 *  LyMonS - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Decoder side: elementary streams in, peak snapshots into the registry
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use log::{error, info, warn};

use crate::error::PeakError;
use crate::notify::{PeakEvent, PeakNotifier};
use crate::peak::{extract_peaks, PeakSnapshot, SampleFormat};
use crate::registry::{EnqueueOutcome, StreamHandle, StreamRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EsCategory {
    Audio,
    Video,
    Other,
}

/// Description of an elementary stream offered by the demuxer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EsFormat {
    pub id: i32,
    pub category: EsCategory,
    pub channels: usize,
    pub language: Option<String>,
    pub sample_format: SampleFormat,
}

impl EsFormat {
    pub fn audio(id: i32, channels: usize, sample_format: SampleFormat) -> Self {
        Self { id, category: EsCategory::Audio, channels, language: None, sample_format }
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }
}

/// One decoded block of interleaved PCM
#[derive(Debug, Clone, Copy)]
pub struct AudioBlock<'a> {
    pub format: SampleFormat,
    pub channels: usize,
    pub data: &'a [u8],
}

/// `"<id>"`, or `"<id> [<lang>]"` when the stream carries a language
pub fn stream_display_name(id: i32, language: Option<&str>) -> String {
    match language.map(str::trim).filter(|l| !l.is_empty()) {
        Some(lang) => format!("{id} [{lang}]"),
        None => id.to_string(),
    }
}

/// Accepts elementary streams and turns the audio ones into registry
/// entries.
#[derive(Debug)]
pub struct BargraphInput {
    registry: StreamRegistry,
    notifier: Option<PeakNotifier>,
}

impl BargraphInput {
    pub fn new(registry: StreamRegistry) -> Self {
        Self { registry, notifier: None }
    }

    pub fn with_notifier(mut self, notifier: PeakNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    /// Register an audio stream. Video and other streams are not metered
    /// and yield None, as does a stream the registry refuses.
    pub fn add(&self, fmt: &EsFormat) -> Option<AudioInput> {
        match fmt.category {
            EsCategory::Audio => {}
            EsCategory::Video => {
                warn!("video stream {} discarded", fmt.id);
                return None;
            }
            EsCategory::Other => {
                error!("stream {} is neither audio nor video, discarded", fmt.id);
                return None;
            }
        }

        let name = stream_display_name(fmt.id, fmt.language.as_deref());
        let handle = match self.registry.add_stream(fmt.id, fmt.channels, &name) {
            Ok(h) => h,
            Err(e) => {
                error!("cannot meter stream {}: {e}", fmt.id);
                return None;
            }
        };
        info!("metering audio stream {name}, {} channels, {}", fmt.channels, fmt.sample_format);
        if let Some(n) = &self.notifier {
            n.notify(PeakEvent::StreamAdded { stream_id: fmt.id });
        }
        Some(AudioInput { handle, notifier: self.notifier.clone() })
    }

    pub fn del(&self, input: AudioInput) {
        let stream_id = input.handle.stream_id();
        info!("stop metering audio stream {stream_id}");
        self.registry.remove_stream(input.handle);
        if let Some(n) = &self.notifier {
            n.notify(PeakEvent::StreamRemoved { stream_id });
        }
    }
}

/// Per-stream producer, owned by that stream's decoder thread.
#[derive(Debug)]
pub struct AudioInput {
    handle: StreamHandle,
    notifier: Option<PeakNotifier>,
}

impl AudioInput {
    pub fn stream_id(&self) -> i32 {
        self.handle.stream_id()
    }

    pub fn handle(&self) -> &StreamHandle {
        &self.handle
    }

    /// Measure a block and queue its peaks.
    ///
    /// A block the extractor cannot read still queues silence so the meter
    /// keeps moving; the error is returned for the caller to count.
    pub fn push_block(&self, block: &AudioBlock<'_>) -> Result<EnqueueOutcome, PeakError> {
        let (snapshot, result) = match extract_peaks(block.format, block.data, block.channels) {
            Ok(s) => (s, Ok(())),
            Err(e) => {
                error!("stream {}: {e}", self.handle.stream_id());
                (PeakSnapshot::silence(self.handle.channel_count()), Err(e))
            }
        };
        let outcome = self.handle.enqueue_peak(snapshot);
        if let Some(n) = &self.notifier {
            n.notify(PeakEvent::PeaksAvailable { stream_id: self.handle.stream_id() });
        }
        result.map(|()| outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::peak_channel;

    fn s16(frames: &[i16]) -> Vec<u8> {
        frames.iter().flat_map(|s| s.to_ne_bytes()).collect()
    }

    #[test]
    fn test_display_names() {
        assert_eq!(stream_display_name(4, None), "4");
        assert_eq!(stream_display_name(4, Some("fre")), "4 [fre]");
        assert_eq!(stream_display_name(4, Some("  ")), "4");
    }

    #[test]
    fn test_only_audio_is_registered() {
        let input = BargraphInput::new(StreamRegistry::new());
        let video = EsFormat { category: EsCategory::Video, ..EsFormat::audio(1, 0, SampleFormat::U8) };
        let other = EsFormat { category: EsCategory::Other, ..EsFormat::audio(2, 0, SampleFormat::U8) };
        assert!(input.add(&video).is_none());
        assert!(input.add(&other).is_none());
        let audio = input.add(&EsFormat::audio(3, 2, SampleFormat::S16N).with_language("eng"));
        assert_eq!(audio.as_ref().map(|a| a.handle().display_name()), Some("3 [eng]"));
        assert_eq!(input.registry().stream_ids(), vec![3]);
        // same id twice is refused
        assert!(input.add(&EsFormat::audio(3, 1, SampleFormat::S16N)).is_none());
    }

    #[test]
    fn test_push_block_and_notify() {
        let (tx, rx) = peak_channel();
        let input = BargraphInput::new(StreamRegistry::new()).with_notifier(tx);
        let audio = input.add(&EsFormat::audio(9, 2, SampleFormat::S16N)).unwrap();
        let data = s16(&[16384, -8192]);
        let block = AudioBlock { format: SampleFormat::S16N, channels: 2, data: &data };
        assert_eq!(audio.push_block(&block), Ok(EnqueueOutcome::Queued));

        let snap = input.registry().snapshot_all();
        assert_eq!(snap.streams[0].peaks, vec![0.5, 0.25]);
        let events = rx.drain();
        assert_eq!(
            events,
            vec![PeakEvent::StreamAdded { stream_id: 9 }, PeakEvent::PeaksAvailable { stream_id: 9 }]
        );

        input.del(audio);
        assert_eq!(input.registry().stream_count(), 0);
        assert_eq!(rx.drain(), vec![PeakEvent::StreamRemoved { stream_id: 9 }]);
    }

    #[test]
    fn test_unsupported_block_queues_silence() {
        let input = BargraphInput::new(StreamRegistry::new());
        let audio = input.add(&EsFormat::audio(1, 2, SampleFormat::F32L)).unwrap();
        let block = AudioBlock { format: SampleFormat::from_fourcc(b"a52 "), channels: 2, data: &[1, 2, 3, 4] };
        assert!(matches!(audio.push_block(&block), Err(PeakError::UnsupportedFormat(_))));
        assert_eq!(audio.handle().pending(), 1);
        let snap = input.registry().snapshot_all();
        assert_eq!(snap.streams[0].peaks, vec![0.0, 0.0]);
    }
}
