/*
 *  pacer.rs
 *
 *  LyMonS - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Render tick pacing, adapts the frame rate to measured render time
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
use std::time::{Duration, Instant};

pub struct Pacer {
    next_deadline: Instant,
    frame: Duration,
}

fn frame_for(fps: u32) -> Duration {
    Duration::from_micros((1_000_000u32 / fps.max(1)) as u64)
}

impl Pacer {
    pub fn new(target_fps: u32) -> Self {
        Self { next_deadline: Instant::now(), frame: frame_for(target_fps) }
    }

    #[inline]
    pub fn set_fps(&mut self, fps: u32) {
        self.frame = frame_for(fps);
    }

    pub fn frame(&self) -> Duration {
        self.frame
    }

    /// Returns true if a tick is due at `now`; if true, it also schedules the next deadline.
    #[inline]
    pub fn should_tick_at(&mut self, now: Instant) -> bool {
        if now >= self.next_deadline {
            self.next_deadline = now + self.frame;
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn should_tick(&mut self) -> bool {
        self.should_tick_at(Instant::now())
    }

    /// Time left before the next tick is due
    pub fn until_next(&self) -> Duration {
        self.next_deadline.saturating_duration_since(Instant::now())
    }
}

/// Pacer that backs off when renders get slow.
pub struct AutoPacer {
    pacer: Pacer,
    ema_ms: f32,     // moving avg of render time
    alpha: f32,      // smoothing (0.1 ~ 0.3)
    headroom: f32,   // >1.0 to avoid saturation (e.g. 1.25)
    max_fps: u32,
    min_fps: u32,
    fps: u32,
}

impl AutoPacer {
    pub fn new(initial_fps: u32, max_fps: u32, min_fps: u32) -> Self {
        let min_fps = min_fps.max(1);
        let max_fps = max_fps.max(min_fps);
        let fps = initial_fps.clamp(min_fps, max_fps);
        Self {
            pacer: Pacer::new(fps),
            ema_ms: 0.0,
            alpha: 0.2,
            headroom: 1.25,
            max_fps,
            min_fps,
            fps,
        }
    }

    pub fn should_tick(&mut self) -> bool { self.pacer.should_tick() }
    pub fn until_next(&self) -> Duration { self.pacer.until_next() }
    pub fn fps(&self) -> u32 { self.fps }

    /// Call right after each render pass.
    pub fn record_render_ms(&mut self, render_ms: f32) {
        self.ema_ms = if self.ema_ms == 0.0 {
            render_ms
        } else {
            self.alpha * render_ms + (1.0 - self.alpha) * self.ema_ms
        };
        if self.ema_ms > 0.0 {
            let safe_fps = (1000.0 / (self.ema_ms * self.headroom))
                .clamp(self.min_fps as f32, self.max_fps as f32) as u32;
            self.fps = safe_fps;
            self.pacer.set_fps(safe_fps);
        }
    }
}
