/*
 *  render/geometry.rs
 *
 *  LyMonS - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Bargraph layout: canvas size, scale ticks, bar placement and colour tiers
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

use crate::color::{self, Rgba};
use crate::dbfs::{iec_scale, peak_to_scale};
use crate::registry::RegistrySnapshot;
use crate::render::canvas::{Canvas, LabelKind, TextLabel};

/// Gap between adjacent bars
pub const SEPARATOR: u32 = 5;
/// Rows reserved around the bars: alarm strip, labels and the top bevel
pub const MARGIN: u32 = 30;
/// First bar line above the bottom edge
pub const BAR_BASE: i32 = 20;
/// Height of the alarm strip under each bar
pub const INDICATOR_ROWS: u32 = 8;
/// Scale ticks, dBFS
pub const SCALE_MARKS_DB: [i32; 6] = [-10, -20, -30, -40, -50, -60];

pub const YELLOW_FROM_DB: f32 = -18.0;
pub const RED_FROM_DB: f32 = -8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Green,
    Yellow,
    Red,
}

impl Tier {
    /// Colour of a lit row
    pub fn lit(self) -> Rgba {
        match self {
            Tier::Green => color::BRIGHT_GREEN,
            Tier::Yellow => color::BRIGHT_YELLOW,
            Tier::Red => color::BRIGHT_RED,
        }
    }

    /// Colour of an unlit row
    pub fn dark(self) -> Rgba {
        match self {
            Tier::Green => color::GREEN,
            Tier::Yellow => color::YELLOW,
            Tier::Red => color::RED,
        }
    }
}

/// `(width, height)` of the canvas for the given bar size and per-stream
/// channel counts. Saturates rather than wrapping on absurd input.
pub fn canvas_size(bar_width: u32, bar_height: u32, channel_counts: impl IntoIterator<Item = usize>) -> (u32, u32) {
    let step = bar_width as u64 + SEPARATOR as u64;
    let width = channel_counts
        .into_iter()
        .fold(bar_width as u64, |w, c| w.saturating_add((c as u64 + 1).saturating_mul(step)));
    (
        u32::try_from(width).unwrap_or(u32::MAX),
        bar_height.saturating_add(MARGIN),
    )
}

/// Bar line of a dB level: `trunc(iec(db) * bar_height) + BAR_BASE`
pub fn scale_line(db: f32, bar_height: u32) -> i32 {
    ((iec_scale(db) * bar_height as f32) as i32).saturating_add(BAR_BASE)
}

/// Lit rows of a bar for a normalized peak. A partly covered row stays dark.
pub fn filled_height(peak: f32, bar_height: u32) -> u32 {
    let rows = (peak_to_scale(peak) * bar_height as f32).clamp(0.0, bar_height as f32);
    rows as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleTick {
    pub db: i32,
    pub line: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelBar {
    pub x: i32,
    pub peak: f32,
    pub filled: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamColumn {
    pub stream_id: i32,
    pub name: String,
    pub x: i32,
    pub bars: Vec<ChannelBar>,
}

/// Where everything goes for one frame. Backend independent.
#[derive(Debug, Clone, PartialEq)]
pub struct BarGraphLayout {
    pub bar_width: u32,
    pub bar_height: u32,
    pub width: u32,
    pub height: u32,
    pub yellow_line: i32,
    pub red_line: i32,
    pub ticks: Vec<ScaleTick>,
    pub columns: Vec<StreamColumn>,
}

impl BarGraphLayout {
    pub fn new(snapshot: &RegistrySnapshot, bar_width: u32, bar_height: u32) -> Self {
        let (width, height) = canvas_size(bar_width, bar_height, snapshot.channel_counts());
        let step = i32::try_from(bar_width.saturating_add(SEPARATOR)).unwrap_or(i32::MAX);

        let mut cursor = i32::try_from(bar_width).unwrap_or(i32::MAX);
        let mut columns = Vec::with_capacity(snapshot.streams.len());
        for stream in &snapshot.streams {
            let x = cursor;
            let bars = stream
                .peaks
                .iter()
                .map(|&peak| {
                    let bar = ChannelBar { x: cursor, peak, filled: filled_height(peak, bar_height) };
                    cursor = cursor.saturating_add(step);
                    bar
                })
                .collect();
            cursor = cursor.saturating_add(step);
            columns.push(StreamColumn {
                stream_id: stream.stream_id,
                name: stream.display_name.clone(),
                x,
                bars,
            });
        }

        let ticks = SCALE_MARKS_DB
            .iter()
            .map(|&db| ScaleTick { db, line: scale_line(db as f32, bar_height) })
            .collect();

        Self {
            bar_width,
            bar_height,
            width,
            height,
            yellow_line: scale_line(YELLOW_FROM_DB, bar_height),
            red_line: scale_line(RED_FROM_DB, bar_height),
            ticks,
            columns,
        }
    }

    pub fn tier_for_line(&self, line: i32) -> Tier {
        if line < self.yellow_line {
            Tier::Green
        } else if line < self.red_line {
            Tier::Yellow
        } else {
            Tier::Red
        }
    }

    /// Canvas row of a bar line, line 0 being the bottom row
    #[inline]
    pub fn row_for_line(&self, line: i32) -> i32 {
        self.height as i32 - line - 1
    }

    pub fn font_size(&self) -> u32 {
        (self.bar_width as f32 * 0.5) as u32
    }

    pub fn font_height(&self) -> u32 {
        (self.bar_width as f32 * 0.35) as u32
    }

    /// Scale figures first, then one name per stream
    pub fn labels(&self) -> Vec<TextLabel> {
        let font_size = self.font_size();
        let h = self.height as i32;
        let scale = self.ticks.iter().map(|t| TextLabel {
            kind: LabelKind::Scale,
            text: (-t.db).to_string(),
            x: 0,
            y: h - t.line - 4,
            font_size,
        });
        let names = self.columns.iter().map(|c| TextLabel {
            kind: LabelKind::Stream,
            text: c.name.clone(),
            x: c.x,
            y: self.bar_height as i32 + BAR_BASE,
            font_size,
        });
        scale.chain(names).collect()
    }

    /// Draw the whole frame onto `canvas`, which must already be sized
    /// `width` x `height`.
    pub fn paint<C: Canvas + ?Sized>(&self, canvas: &mut C, alarm: bool) {
        debug_assert_eq!(canvas.size(), (self.width, self.height), "canvas does not fit the layout");
        canvas.clear();
        let bw = self.bar_width as i32;

        // bevel down the scale
        canvas.fill_rect(bw - 10, 10, 2, self.bar_height, color::BLACK);
        canvas.fill_rect(bw - 8, 10, 2, self.bar_height, color::WHITE);

        for tick in &self.ticks {
            let y = self.row_for_line(tick.line);
            canvas.draw_line((bw - 6, y - 1), (bw - 4, y - 1), color::WHITE);
            canvas.fill_rect(bw - 6, y, 3, 2, color::BLACK);
        }

        let indicator = if alarm { color::BRIGHT_RED } else { color::BLACK };
        // bottom bar line paints over the strip's first row
        let strip_top = self.row_for_line(BAR_BASE);
        for bar in self.columns.iter().flat_map(|c| c.bars.iter()) {
            canvas.fill_rect(bar.x, strip_top, self.bar_width, INDICATOR_ROWS, indicator);
            self.paint_bar(canvas, bar);
        }

        for label in self.labels() {
            canvas.text(&label);
        }
    }

    /// One bar as at most six solid spans: lit and dark part of each tier.
    fn paint_bar<C: Canvas + ?Sized>(&self, canvas: &mut C, bar: &ChannelBar) {
        let top = BAR_BASE + self.bar_height as i32;
        let lit_top = BAR_BASE + bar.filled as i32;
        let bounds = [
            BAR_BASE,
            self.yellow_line.clamp(BAR_BASE, top),
            self.red_line.clamp(BAR_BASE, top),
            top,
        ];
        let tiers = [Tier::Green, Tier::Yellow, Tier::Red];
        for (tier, span) in tiers.iter().zip(bounds.windows(2)) {
            let (lo, hi) = (span[0], span[1]);
            let lit_hi = hi.min(lit_top);
            if lit_hi > lo {
                self.span(canvas, bar.x, lo, lit_hi, tier.lit());
            }
            let dark_lo = lo.max(lit_top);
            if hi > dark_lo {
                self.span(canvas, bar.x, dark_lo, hi, tier.dark());
            }
        }
    }

    // bar lines lo..hi
    fn span<C: Canvas + ?Sized>(&self, canvas: &mut C, x: i32, lo: i32, hi: i32, color: Rgba) {
        canvas.fill_rect(x, self.row_for_line(hi - 1), self.bar_width, (hi - lo) as u32, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StreamLevels;

    fn snapshot(streams: &[(i32, &str, &[f32])]) -> RegistrySnapshot {
        let streams: Vec<StreamLevels> = streams
            .iter()
            .map(|(id, name, peaks)| StreamLevels {
                stream_id: *id,
                display_name: name.to_string(),
                channel_count: peaks.len(),
                peaks: peaks.to_vec(),
            })
            .collect();
        let total_channel_count = streams.iter().map(|s| s.channel_count).sum();
        RegistrySnapshot { streams, total_channel_count }
    }

    #[test]
    fn test_canvas_size_formula() {
        assert_eq!(canvas_size(30, 300, std::iter::empty()), (30, 330));
        assert_eq!(canvas_size(30, 300, [2]), (30 + 3 * 35, 330));
        assert_eq!(canvas_size(20, 100, [2, 6]), (20 + 3 * 25 + 7 * 25, 130));
    }

    #[test]
    fn test_canvas_size_saturates() {
        let (w, _) = canvas_size(u32::MAX, 10, [usize::MAX]);
        assert_eq!(w, u32::MAX);
    }

    #[test]
    fn test_filled_height_bounds() {
        assert_eq!(filled_height(0.0, 300), 0);
        assert_eq!(filled_height(1.0, 300), 300);
        assert_eq!(filled_height(2.0, 300), 300);
        // -20 dBFS sits half way up
        let half = filled_height(0.1, 400);
        assert!((199..=201).contains(&half), "{half}");
    }

    #[test]
    fn test_filled_height_truncates() {
        // -6 dBFS covers 254.8 rows of 300
        let rows = peak_to_scale(0.5) * 300.0;
        assert!(rows.fract() > 0.5, "{rows}");
        assert_eq!(filled_height(0.5, 300), rows as u32);
        assert_eq!(filled_height(0.5, 300), 254);
    }

    #[test]
    fn test_huge_bars_do_not_overflow() {
        let snap = snapshot(&[(1, "1", &[1.0, 0.5])]);
        let layout = BarGraphLayout::new(&snap, u32::MAX - 1, 10);
        assert_eq!(layout.width, u32::MAX);
        let layout = BarGraphLayout::new(&snap, 30, 3_000_000_000);
        assert_eq!(layout.height, 3_000_000_030);
        assert!(layout.ticks.iter().all(|t| t.line > BAR_BASE));
    }

    #[test]
    fn test_bar_positions() {
        let snap = snapshot(&[(1, "1", &[0.0, 0.0]), (2, "2", &[0.0])]);
        let layout = BarGraphLayout::new(&snap, 30, 300);
        assert_eq!(layout.columns[0].x, 30);
        assert_eq!(layout.columns[0].bars[1].x, 65);
        // gap of one slot between streams
        assert_eq!(layout.columns[1].x, 30 + 3 * 35);
        assert_eq!(layout.width, 30 + 3 * 35 + 2 * 35);
    }

    #[test]
    fn test_tiers() {
        let layout = BarGraphLayout::new(&snapshot(&[]), 30, 300);
        assert_eq!(layout.tier_for_line(BAR_BASE), Tier::Green);
        assert_eq!(layout.tier_for_line(layout.yellow_line - 1), Tier::Green);
        assert_eq!(layout.tier_for_line(layout.yellow_line), Tier::Yellow);
        assert_eq!(layout.tier_for_line(layout.red_line), Tier::Red);
        assert!(layout.yellow_line < layout.red_line);
    }

    #[test]
    fn test_labels() {
        let snap = snapshot(&[(7, "7 [en]", &[0.1])]);
        let layout = BarGraphLayout::new(&snap, 30, 300);
        let labels = layout.labels();
        assert_eq!(labels.len(), SCALE_MARKS_DB.len() + 1);
        assert_eq!(labels[0].text, "10");
        assert_eq!(labels[5].text, "60");
        assert_eq!(labels[0].y, layout.height as i32 - layout.ticks[0].line - 4);
        let name = labels.last().unwrap();
        assert_eq!(name.kind, LabelKind::Stream);
        assert_eq!((name.x, name.y), (30, 320));
        assert_eq!(name.font_size, 15);
    }
}
