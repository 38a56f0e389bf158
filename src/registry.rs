/*
 *  registry.rs
 *
 *  LyMonS - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Shared multi-stream peak registry
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

//! Decoder threads register their audio streams here and push one peak
//! snapshot per decoded block; the render thread takes a snapshot of every
//! stream's latest levels on each tick.
//!
//! Lock order: the registry lock always comes before a stream's queue lock.
//! Enqueue only ever takes the queue lock.

use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::RegistryError;
use crate::peak::{MAX_CHANNELS, PeakSnapshot};

/// Peak snapshots held per stream before the oldest is dropped.
pub const PEAK_QUEUE_CAPACITY: usize = 100;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Lock, recovering the data if a holder panicked. A meter must never take
/// the host pipeline down with it.
pub(crate) fn lock_or_recover<'a, T>(m: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    m.lock().unwrap_or_else(|poisoned| {
        warn!("{what} lock poisoned, recovering");
        poisoned.into_inner()
    })
}

/// One registered audio stream.
#[derive(Debug)]
pub struct StreamRecord {
    stream_id: i32,
    display_name: String,
    channel_count: usize,
    pending: Mutex<VecDeque<PeakSnapshot>>,
}

impl StreamRecord {
    pub fn stream_id(&self) -> i32 { self.stream_id }
    pub fn display_name(&self) -> &str { &self.display_name }
    pub fn channel_count(&self) -> usize { self.channel_count }
}

/// What happened to a pushed snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    /// queue was full, the oldest snapshot was evicted to make room
    DroppedOldest,
}

/// Exclusive producer handle for one stream, returned by `add_stream`.
///
/// Not `Clone`: each stream has exactly one producer.
#[derive(Debug)]
pub struct StreamHandle {
    record: Arc<StreamRecord>,
    registry_id: u64,
}

impl StreamHandle {
    pub fn stream_id(&self) -> i32 { self.record.stream_id }
    pub fn channel_count(&self) -> usize { self.record.channel_count }
    pub fn display_name(&self) -> &str { &self.record.display_name }

    /// Append a snapshot, evicting the oldest one when the queue is full.
    ///
    /// The snapshot is conformed to the stream's channel count. Only the
    /// stream's own queue lock is taken, so this never waits on a render.
    pub fn enqueue_peak(&self, mut snapshot: PeakSnapshot) -> EnqueueOutcome {
        snapshot.conform(self.record.channel_count);
        let mut queue = lock_or_recover(&self.record.pending, "peak queue");
        let mut outcome = EnqueueOutcome::Queued;
        while queue.len() >= PEAK_QUEUE_CAPACITY {
            queue.pop_front();
            outcome = EnqueueOutcome::DroppedOldest;
        }
        queue.push_back(snapshot);
        if outcome == EnqueueOutcome::DroppedOldest {
            debug!("stream {}: drop peak data", self.record.stream_id);
        }
        outcome
    }

    /// Convenience over [`enqueue_peak`](Self::enqueue_peak) for raw values
    pub fn push_peak(&self, values: &[f32]) -> EnqueueOutcome {
        self.enqueue_peak(PeakSnapshot::from_values(values))
    }

    /// Snapshots waiting to be consumed
    pub fn pending(&self) -> usize {
        lock_or_recover(&self.record.pending, "peak queue").len()
    }

    /// Copy of the queued snapshots, oldest first
    pub fn pending_snapshots(&self) -> Vec<PeakSnapshot> {
        lock_or_recover(&self.record.pending, "peak queue").iter().cloned().collect()
    }
}

/// Latest levels for one stream as seen by a render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamLevels {
    pub stream_id: i32,
    pub display_name: String,
    pub channel_count: usize,
    pub peaks: Vec<f32>,
}

/// Owned, ordered view of every stream at the start of a render pass.
/// Safe to use after the registry lock has been released.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrySnapshot {
    pub streams: Vec<StreamLevels>,
    pub total_channel_count: usize,
}

impl RegistrySnapshot {
    pub fn channel_counts(&self) -> impl Iterator<Item = usize> + '_ {
        self.streams.iter().map(|s| s.channel_count)
    }
}

#[derive(Debug, Default)]
struct Streams {
    records: Vec<Arc<StreamRecord>>,
    total_channel_count: usize,
}

impl Streams {
    fn resort(&mut self) {
        self.records.sort_by_key(|r| r.stream_id);
    }
}

#[derive(Debug)]
struct Shared {
    id: u64,
    streams: Mutex<Streams>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let attached = match self.streams.get_mut() {
            Ok(streams) => streams.records.len(),
            Err(poisoned) => poisoned.into_inner().records.len(),
        };
        debug!("registry {} freed with {} stream(s) still attached", self.id, attached);
    }
}

/// Shared registry of audio streams and their pending peaks.
///
/// Cloning (or [`retain`](Self::retain)) adds a holder; dropping (or
/// [`release`](Self::release)) removes one. Storage goes away with the last
/// holder.
#[derive(Debug, Clone)]
pub struct StreamRegistry {
    shared: Arc<Shared>,
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamRegistry {
    pub fn new() -> Self {
        let id = NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: Arc::new(Shared { id, streams: Mutex::new(Streams::default()) }),
        }
    }

    /// Another holder of the same registry
    pub fn retain(&self) -> Self {
        self.clone()
    }

    /// Give up this holder; frees the registry if it was the last one
    pub fn release(self) {
        debug!("release registry {} ({} holders)", self.shared.id, self.holders());
        drop(self);
    }

    /// Number of live holders
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.shared)
    }

    /// Two handles to the same underlying registry
    pub fn same_as(&self, other: &StreamRegistry) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    fn streams(&self) -> MutexGuard<'_, Streams> {
        lock_or_recover(&self.shared.streams, "registry")
    }

    /// Register a stream and hand back its producer handle.
    pub fn add_stream(
        &self,
        stream_id: i32,
        channel_count: usize,
        display_name: impl Into<String>,
    ) -> Result<StreamHandle, RegistryError> {
        if channel_count > MAX_CHANNELS {
            return Err(RegistryError::TooManyChannels { requested: channel_count, max: MAX_CHANNELS });
        }
        let record = Arc::new(StreamRecord {
            stream_id,
            display_name: display_name.into(),
            channel_count,
            pending: Mutex::new(VecDeque::with_capacity(PEAK_QUEUE_CAPACITY)),
        });

        let mut streams = self.streams();
        if streams.records.iter().any(|r| r.stream_id == stream_id) {
            return Err(RegistryError::DuplicateStream(stream_id));
        }
        streams.records.push(Arc::clone(&record));
        streams.resort();
        streams.total_channel_count += channel_count;
        info!(
            "add audio stream {} '{}' ({} channels, {} total)",
            stream_id, record.display_name, channel_count, streams.total_channel_count
        );
        drop(streams);

        Ok(StreamHandle { record, registry_id: self.shared.id })
    }

    /// Unregister a stream. Its queue and name are dropped with the handle.
    ///
    /// A handle from another registry, or one already removed, is a caller
    /// bug: asserts in debug builds, logged and ignored otherwise.
    pub fn remove_stream(&self, handle: StreamHandle) {
        if handle.registry_id != self.shared.id {
            error!("stream {} does not belong to this registry", handle.stream_id());
            debug_assert!(false, "registry/record mismatch");
            return;
        }
        let mut streams = self.streams();
        let Some(pos) = streams.records.iter().position(|r| Arc::ptr_eq(r, &handle.record)) else {
            drop(streams);
            error!("stream {} is not registered", handle.stream_id());
            debug_assert!(false, "removing unregistered stream");
            return;
        };
        let record = streams.records.remove(pos);
        streams.resort();
        streams.total_channel_count -= record.channel_count;
        info!(
            "del audio stream {} ({} total channels left)",
            record.stream_id, streams.total_channel_count
        );
    }

    /// Drain every stream's queue and keep the newest snapshot.
    ///
    /// Streams with nothing pending report silence on every channel.
    pub fn snapshot_all(&self) -> RegistrySnapshot {
        let streams = self.streams();
        let levels = streams
            .records
            .iter()
            .map(|record| {
                let latest = {
                    let mut queue = lock_or_recover(&record.pending, "peak queue");
                    let newest = queue.drain(..).last();
                    newest
                };
                let mut latest = latest.unwrap_or_else(|| PeakSnapshot::silence(record.channel_count));
                latest.conform(record.channel_count);
                StreamLevels {
                    stream_id: record.stream_id,
                    display_name: record.display_name.clone(),
                    channel_count: record.channel_count,
                    peaks: latest.values().to_vec(),
                }
            })
            .collect();
        RegistrySnapshot { streams: levels, total_channel_count: streams.total_channel_count }
    }

    pub fn stream_count(&self) -> usize {
        self.streams().records.len()
    }

    pub fn total_channel_count(&self) -> usize {
        self.streams().total_channel_count
    }

    /// Registered ids, ascending
    pub fn stream_ids(&self) -> Vec<i32> {
        self.streams().records.iter().map(|r| r.stream_id).collect()
    }

    /// Sorted order and channel total both hold
    pub fn check_invariants(&self) -> bool {
        let streams = self.streams();
        let sorted = streams.records.windows(2).all(|w| w[0].stream_id <= w[1].stream_id);
        let total: usize = streams.records.iter().map(|r| r.channel_count).sum();
        sorted && total == streams.total_channel_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_is_empty() {
        let reg = StreamRegistry::new();
        assert_eq!(reg.holders(), 1);
        assert_eq!(reg.stream_count(), 0);
        assert_eq!(reg.total_channel_count(), 0);
        assert!(reg.snapshot_all().streams.is_empty());
    }

    #[test]
    fn test_retain_release() {
        let reg = StreamRegistry::new();
        let other = reg.retain();
        assert_eq!(reg.holders(), 2);
        assert!(reg.same_as(&other));
        other.release();
        assert_eq!(reg.holders(), 1);
    }

    #[test]
    fn test_streams_kept_sorted_and_counted() {
        let reg = StreamRegistry::new();
        let c = reg.add_stream(30, 2, "30").unwrap();
        let a = reg.add_stream(10, 6, "10").unwrap();
        let b = reg.add_stream(20, 1, "20").unwrap();
        assert_eq!(reg.stream_ids(), vec![10, 20, 30]);
        assert_eq!(reg.total_channel_count(), 9);
        assert!(reg.check_invariants());

        reg.remove_stream(a);
        assert_eq!(reg.stream_ids(), vec![20, 30]);
        assert_eq!(reg.total_channel_count(), 3);
        reg.remove_stream(c);
        reg.remove_stream(b);
        assert_eq!(reg.total_channel_count(), 0);
        assert!(reg.check_invariants());
    }

    #[test]
    fn test_duplicate_and_oversized_streams_rejected() {
        let reg = StreamRegistry::new();
        let _a = reg.add_stream(1, 2, "1").unwrap();
        assert_eq!(reg.add_stream(1, 2, "dup").unwrap_err(), RegistryError::DuplicateStream(1));
        assert_eq!(
            reg.add_stream(2, MAX_CHANNELS + 1, "wide").unwrap_err(),
            RegistryError::TooManyChannels { requested: MAX_CHANNELS + 1, max: MAX_CHANNELS }
        );
        assert_eq!(reg.total_channel_count(), 2);
    }

    #[test]
    fn test_queue_drops_oldest_at_capacity() {
        let reg = StreamRegistry::new();
        let h = reg.add_stream(1, 1, "1").unwrap();
        for i in 0..PEAK_QUEUE_CAPACITY {
            assert_eq!(h.push_peak(&[i as f32 / 1000.0]), EnqueueOutcome::Queued);
        }
        assert_eq!(h.push_peak(&[0.5]), EnqueueOutcome::DroppedOldest);
        assert_eq!(h.pending(), PEAK_QUEUE_CAPACITY);

        let queued = h.pending_snapshots();
        // first one (0.0) is gone, second one (0.001) is now the oldest
        assert!((queued[0].values()[0] - 0.001).abs() < 1e-6);
        assert_eq!(queued.last().unwrap().values(), &[0.5]);
    }

    #[test]
    fn test_snapshot_takes_latest_and_drains() {
        let reg = StreamRegistry::new();
        let h = reg.add_stream(7, 2, "7 [en]").unwrap();
        h.push_peak(&[0.1, 0.2]);
        h.push_peak(&[0.3, 0.4]);

        let snap = reg.snapshot_all();
        assert_eq!(snap.total_channel_count, 2);
        assert_eq!(snap.streams[0].display_name, "7 [en]");
        assert_eq!(snap.streams[0].peaks, vec![0.3, 0.4]);
        assert_eq!(h.pending(), 0);

        // nothing new: silence
        let snap = reg.snapshot_all();
        assert_eq!(snap.streams[0].peaks, vec![0.0, 0.0]);
    }

    #[test]
    fn test_snapshot_conforms_channel_count() {
        let reg = StreamRegistry::new();
        let h = reg.add_stream(1, 3, "1").unwrap();
        h.push_peak(&[0.9]);
        assert_eq!(reg.snapshot_all().streams[0].peaks, vec![0.9, 0.0, 0.0]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "registry/record mismatch")]
    fn test_foreign_handle_asserts() {
        let reg = StreamRegistry::new();
        let other = StreamRegistry::new();
        let h = other.add_stream(1, 2, "1").unwrap();
        reg.remove_stream(h);
    }

    #[test]
    fn test_snapshot_survives_removal() {
        let reg = StreamRegistry::new();
        let h = reg.add_stream(1, 2, "1").unwrap();
        h.push_peak(&[1.0, 1.0]);
        let snap = reg.snapshot_all();
        reg.remove_stream(h);
        assert_eq!(snap.streams.len(), 1);
        assert_eq!(snap.streams[0].peaks, vec![1.0, 1.0]);
        assert_eq!(reg.stream_count(), 0);
    }
}
