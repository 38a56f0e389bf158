/*
 *  notify.rs
 *
 *  LyMonS - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Typed "new peak data" notifications from decoder threads to the overlay
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

use crossbeam::channel::{self, Receiver, Sender, TrySendError};

/// Events buffered before producers stop queueing more. A full channel
/// already means a redraw is due, so extra events carry nothing.
pub const NOTIFY_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakEvent {
    PeaksAvailable { stream_id: i32 },
    StreamAdded { stream_id: i32 },
    StreamRemoved { stream_id: i32 },
}

/// Producer side, one clone per decoder thread.
#[derive(Debug, Clone)]
pub struct PeakNotifier {
    tx: Sender<PeakEvent>,
}

/// Consumer side, owned by the overlay.
#[derive(Debug)]
pub struct PeakEvents {
    rx: Receiver<PeakEvent>,
}

pub fn peak_channel() -> (PeakNotifier, PeakEvents) {
    let (tx, rx) = channel::bounded(NOTIFY_DEPTH);
    (PeakNotifier { tx }, PeakEvents { rx })
}

impl PeakNotifier {
    /// Never blocks. Returns false when the event was not queued (channel
    /// full or the overlay is gone).
    pub fn notify(&self, event: PeakEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

impl PeakEvents {
    /// Take everything queued so far
    pub fn drain(&self) -> Vec<PeakEvent> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_flow_and_bound() {
        let (tx, rx) = peak_channel();
        for id in 0..(NOTIFY_DEPTH as i32 + 5) {
            tx.notify(PeakEvent::PeaksAvailable { stream_id: id });
        }
        let events = rx.drain();
        assert_eq!(events.len(), NOTIFY_DEPTH);
        assert_eq!(events[0], PeakEvent::PeaksAvailable { stream_id: 0 });
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn test_notify_after_consumer_dropped() {
        let (tx, rx) = peak_channel();
        drop(rx);
        assert!(!tx.notify(PeakEvent::StreamAdded { stream_id: 1 }));
    }
}
