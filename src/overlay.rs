/*
 *  overlay.rs
 *
 *  LyMonS - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Bargraph overlay: live settings, redraw tracking and subpicture assembly
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

use log::{debug, info};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use crate::color::{self, Rgba};
use crate::notify::{peak_channel, PeakEvents, PeakNotifier};
use crate::registry::{lock_or_recover, StreamRegistry};
use crate::render::config::{self as rcfg, Align, Position, RenderConfig};
use crate::render::{BarGraphRenderer, OutputFormat, PixelLayout, RenderedImage};

/// A live settings change, applied between frames.
#[derive(Debug, Clone)]
pub enum ConfigChange {
    X(i32),
    Y(i32),
    Transparency(i32),
    /// `0=center, 1=left, 2=right, 4=top, 8=bottom`, negative is absolute
    Position(i32),
    BarWidth(i32),
    BarHeight(i32),
    Alarm(bool),
    /// start drawing this registry, replacing any previous one
    Attach(StreamRegistry),
    Detach,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRegion {
    pub x: i32,
    pub y: i32,
    pub align: Align,
    pub image: RenderedImage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRegion {
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub align: Align,
    pub font_size: u32,
    pub color: Rgba,
}

/// What the compositor blends over the next video frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subpicture {
    pub start: Instant,
    /// shown until the next subpicture replaces it
    pub ephemeral: bool,
    pub absolute: bool,
    pub alpha: u8,
    pub image: Option<ImageRegion>,
    pub texts: Vec<TextRegion>,
}

impl Subpicture {
    /// An empty subpicture clears whatever was displayed
    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.texts.is_empty()
    }
}

/// Place a text label against the graph, honouring the position anchors.
///
/// Right (bottom) anchored text is mirrored across the graph so it keeps
/// its place relative to the bars.
pub fn align_text(
    x: i32,
    y: i32,
    position: Position,
    graph: (u32, u32),
    font: (u32, u32),
) -> (i32, i32, Align) {
    let Some(raw) = position.align() else {
        return (x, y, Align::LEFT | Align::TOP);
    };
    let mut out = (x, y);
    if raw.contains(Align::RIGHT) && !raw.contains(Align::LEFT) {
        out.0 = graph.0 as i32 - x - font.0 as i32;
    }
    if raw.contains(Align::BOTTOM) && !raw.contains(Align::TOP) {
        out.1 = graph.1 as i32 - y - font.1 as i32;
    }
    (out.0, out.1, raw.normalized())
}

struct OverlayState {
    config: RenderConfig,
    registry: Option<StreamRegistry>,
    dirty: bool,
}

/// Owns the settings and the renderer, produces subpictures on demand.
/// Safe to share between the control thread and the video thread.
/// Settings and renderer sit behind separate locks so a settings change
/// never waits on painting.
pub struct BarGraphOverlay {
    state: Mutex<OverlayState>,
    renderer: Mutex<BarGraphRenderer>,
    notifier: PeakNotifier,
    events: PeakEvents,
    pixel_layout: PixelLayout,
}

impl BarGraphOverlay {
    pub fn new(config: RenderConfig) -> Self {
        let (notifier, events) = peak_channel();
        Self {
            state: Mutex::new(OverlayState {
                config,
                registry: None,
                dirty: true,
            }),
            renderer: Mutex::new(BarGraphRenderer::new()),
            notifier,
            events,
            pixel_layout: PixelLayout::Rgba,
        }
    }

    pub fn with_pixel_layout(mut self, layout: PixelLayout) -> Self {
        self.pixel_layout = layout;
        self
    }

    /// Sender for decoder threads
    pub fn notifier(&self) -> PeakNotifier {
        self.notifier.clone()
    }

    fn lock(&self) -> MutexGuard<'_, OverlayState> {
        lock_or_recover(&self.state, "overlay")
    }

    pub fn config(&self) -> RenderConfig {
        self.lock().config.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    /// A new holder on the attached registry, if any
    pub fn registry(&self) -> Option<StreamRegistry> {
        self.lock().registry.as_ref().map(StreamRegistry::retain)
    }

    /// Apply one change and schedule a redraw
    pub fn apply(&self, change: ConfigChange) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let cfg = &mut state.config;
        match change {
            ConfigChange::X(x) => cfg.offset_x = x,
            ConfigChange::Y(y) => cfg.offset_y = y,
            ConfigChange::Transparency(a) => cfg.alpha = rcfg::clamp_alpha(a),
            ConfigChange::Position(p) => cfg.position = Position::from_bitmask(p),
            ConfigChange::BarWidth(w) => cfg.bar_width = rcfg::clamp_bar_width(w),
            ConfigChange::BarHeight(h) => cfg.bar_height = rcfg::clamp_bar_height(h),
            ConfigChange::Alarm(on) => cfg.alarm = on,
            ConfigChange::Attach(registry) => {
                info!("bargraph attached to registry with {} streams", registry.stream_count());
                if let Some(old) = state.registry.replace(registry) {
                    old.release();
                }
            }
            ConfigChange::Detach => {
                if let Some(old) = state.registry.take() {
                    info!("bargraph detached");
                    old.release();
                }
            }
        }
        state.dirty = true;
    }

    /// Build the subpicture for `now`, or None when nothing changed since
    /// the last one or there is nothing to draw from.
    pub fn tick(&self, now: Instant) -> Option<Subpicture> {
        let events = self.events.drain();
        let (snapshot, config) = {
            let mut state = self.lock();
            if !events.is_empty() {
                state.dirty = true;
            }
            if !state.dirty {
                return None;
            }
            let snapshot = state.registry.as_ref()?.snapshot_all();
            // a change arriving while we paint marks the next tick dirty again
            state.dirty = false;
            (snapshot, state.config.clone())
        };

        let image = lock_or_recover(&self.renderer, "overlay renderer").render(
            &snapshot,
            &config,
            OutputFormat::Raster,
            self.pixel_layout,
        );

        let mut spu = Subpicture {
            start: now,
            ephemeral: true,
            absolute: config.position == Position::Absolute,
            alpha: config.alpha,
            image: None,
            texts: Vec::new(),
        };
        let Some(image) = image else {
            debug!("no bargraph image, sending empty subpicture");
            return Some(spu);
        };
        if config.alpha == 0 {
            return Some(spu);
        }

        let graph = (image.width, image.height);
        let font = (
            (config.bar_width as f32 * 0.5) as u32,
            (config.bar_width as f32 * 0.35) as u32,
        );
        spu.texts = image
            .labels
            .iter()
            .map(|label| {
                let (x, y, align) = align_text(
                    label.x + config.offset_x,
                    label.y + config.offset_y,
                    config.position,
                    graph,
                    font,
                );
                TextRegion {
                    text: label.text.clone(),
                    x,
                    y,
                    align,
                    font_size: label.font_size,
                    color: color::WHITE,
                }
            })
            .collect();
        let align = match config.position.align() {
            Some(a) => a.normalized(),
            None => Align::RIGHT | Align::TOP,
        };
        spu.image = Some(ImageRegion { x: config.offset_x, y: config.offset_y, align, image });
        Some(spu)
    }
}

impl Drop for BarGraphOverlay {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|p| p.into_inner());
        if let Some(registry) = state.registry.take() {
            registry.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::PeakEvent;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn attached() -> (BarGraphOverlay, StreamRegistry) {
        let overlay = BarGraphOverlay::new(RenderConfig::default());
        let registry = StreamRegistry::new();
        overlay.apply(ConfigChange::Attach(registry.retain()));
        (overlay, registry)
    }

    #[test]
    fn test_nothing_without_registry() {
        let overlay = BarGraphOverlay::new(RenderConfig::default());
        assert!(overlay.tick(Instant::now()).is_none());
    }

    #[test]
    fn test_dirty_cycle() {
        let (overlay, registry) = attached();
        let _h = registry.add_stream(3, 2, "3").unwrap();
        let spu = overlay.tick(Instant::now()).unwrap();
        assert!(!spu.is_empty());
        assert!(overlay.tick(Instant::now()).is_none());

        overlay.notifier().notify(PeakEvent::PeaksAvailable { stream_id: 3 });
        assert!(overlay.tick(Instant::now()).is_some());

        overlay.apply(ConfigChange::Alarm(true));
        assert!(overlay.is_dirty());
        assert!(overlay.tick(Instant::now()).is_some());
    }

    #[test]
    fn test_clamped_changes() {
        let overlay = BarGraphOverlay::new(RenderConfig::default());
        overlay.apply(ConfigChange::Transparency(999));
        overlay.apply(ConfigChange::BarWidth(-3));
        overlay.apply(ConfigChange::Position(0x25));
        let cfg = overlay.config();
        assert_eq!(cfg.alpha, 255);
        assert_eq!(cfg.bar_width, 1);
        assert_eq!(cfg.position, Position::TopLeft);
        overlay.apply(ConfigChange::Position(-7));
        assert_eq!(overlay.config().position, Position::Absolute);
    }

    #[test]
    fn test_zero_alpha_clears() {
        let (overlay, _registry) = attached();
        overlay.apply(ConfigChange::Transparency(0));
        let spu = overlay.tick(Instant::now()).unwrap();
        assert!(spu.is_empty());
        assert!(spu.ephemeral);
    }

    #[test]
    fn test_absolute_alignment() {
        let (overlay, _registry) = attached();
        overlay.apply(ConfigChange::X(12));
        overlay.apply(ConfigChange::Y(7));
        let spu = overlay.tick(Instant::now()).unwrap();
        assert!(spu.absolute);
        let image = spu.image.unwrap();
        assert_eq!(image.align, Align::RIGHT | Align::TOP);
        assert_eq!((image.x, image.y), (12, 7));
        // scale labels only, no streams
        assert_eq!(spu.texts.len(), 6);
        assert_eq!(spu.texts[0].x, 12);
        assert_eq!(spu.texts[0].align, Align::LEFT | Align::TOP);
    }

    #[test]
    fn test_text_mirroring() {
        let pos = Position::from_bitmask(10);
        let (x, y, align) = align_text(5, 20, pos, (100, 330), (15, 10));
        assert_eq!((x, y), (100 - 5 - 15, 330 - 20 - 10));
        assert_eq!(align, Align::BOTTOM | Align::RIGHT);

        let (x, y, align) = align_text(5, 20, Position::Center, (100, 330), (15, 10));
        assert_eq!((x, y), (5, 20));
        assert_eq!(align, Align::LEFT | Align::TOP);
    }

    #[test]
    fn test_changes_do_not_wait_on_painting() {
        let (overlay, _registry) = attached();
        let overlay = Arc::new(overlay);
        let painting = overlay.renderer.lock().unwrap();

        let (done_tx, done_rx) = crossbeam::channel::bounded(1);
        let control = Arc::clone(&overlay);
        let worker = thread::spawn(move || {
            control.apply(ConfigChange::BarHeight(120));
            let _ = done_tx.send(());
        });
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
        drop(painting);
        worker.join().unwrap();
        assert_eq!(overlay.config().bar_height, 120);
        assert!(overlay.is_dirty());
    }

    #[test]
    fn test_detach_stops_output() {
        let (overlay, registry) = attached();
        assert_eq!(registry.holders(), 2);
        overlay.apply(ConfigChange::Detach);
        assert_eq!(registry.holders(), 1);
        assert!(overlay.tick(Instant::now()).is_none());
    }
}
