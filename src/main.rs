/*
 *  main.rs
 *
 *  LyMonS - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Bargraph demo: synthetic decoder threads feeding a paced overlay
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

use anyhow::{Context, Result, anyhow};
use env_logger::Env;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use lymons_bargraph::config::{self, DemoStream};
use lymons_bargraph::func_timer::FunctionTimer;
use lymons_bargraph::pacer::AutoPacer;
use lymons_bargraph::svgimage::rgba_to_png;
use lymons_bargraph::{
    AudioBlock, AudioInput, BarGraphOverlay, BarGraphRenderer, BargraphInput, ConfigChange, EsFormat,
    ImageData, PixelLayout, SampleFormat, StreamRegistry,
};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Frames per synthetic decoder block (10 ms at 48 kHz)
const BLOCK_FRAMES: usize = 480;
const BLOCK_PERIOD: Duration = Duration::from_millis(10);

/// One decoder thread: a random-walk envelope per channel, emitted as
/// interleaved S16 blocks. Hands its input back when stopped.
fn spawn_producer(input: AudioInput, channels: usize, seed: u64, stop: Arc<AtomicBool>) -> JoinHandle<AudioInput> {
    thread::spawn(move || {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut envelope = vec![0.3f32; channels];
        let mut data = Vec::with_capacity(BLOCK_FRAMES * channels * 2);
        let mut errors = 0u32;

        while !stop.load(Ordering::Relaxed) {
            for level in envelope.iter_mut() {
                *level = (*level + rng.random_range(-0.08f32..0.08)).clamp(0.0, 1.0);
            }
            data.clear();
            for _ in 0..BLOCK_FRAMES {
                for level in &envelope {
                    let sample = rng.random_range(-1.0f32..=1.0) * level * i16::MAX as f32;
                    data.extend_from_slice(&(sample as i16).to_ne_bytes());
                }
            }
            let block = AudioBlock { format: SampleFormat::S16N, channels, data: &data };
            if input.push_block(&block).is_err() {
                errors += 1;
            }
            thread::sleep(BLOCK_PERIOD);
        }
        if errors > 0 {
            warn!("stream {}: {errors} unreadable blocks", input.stream_id());
        }
        input
    })
}

fn main() -> Result<()> {
    let cfg = config::load()?;

    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.log_level()))
        .format_timestamp_secs()
        .init();

    info!("v.{} built {} ({})", env!("CARGO_PKG_VERSION"), BUILD_DATE, BUILD_PROFILE);

    let demo = cfg.demo();
    let registry = StreamRegistry::new();
    let overlay = BarGraphOverlay::new(cfg.render_config()).with_pixel_layout(cfg.pixel_layout());
    overlay.apply(ConfigChange::Attach(registry.retain()));
    let input = BargraphInput::new(registry.retain()).with_notifier(overlay.notifier());

    let seed = demo.seed.unwrap_or_else(|| rand::rng().random());
    debug!("signal seed {seed}");

    let stop = Arc::new(AtomicBool::new(false));
    let mut producers = Vec::new();
    for DemoStream { id, channels, language } in demo.streams() {
        let mut fmt = EsFormat::audio(id, channels, SampleFormat::S16N);
        if let Some(lang) = language.as_deref() {
            fmt = fmt.with_language(lang);
        }
        match input.add(&fmt) {
            Some(audio) => producers.push(spawn_producer(audio, channels, seed ^ id as u64, Arc::clone(&stop))),
            None => warn!("stream {id} not metered"),
        }
    }
    info!("{} streams, {} channels", registry.stream_count(), registry.total_channel_count());

    let fps = demo.fps();
    let frames = demo.frames();
    let mut pacer = AutoPacer::new(fps, fps, 1);
    let mut ticks = 0u32;
    let mut updates = 0u32;
    let mut last_image = None;
    while ticks < frames {
        if !pacer.should_tick() {
            thread::sleep(pacer.until_next());
            continue;
        }
        ticks += 1;
        // show the alarm strip for the second half of the run
        if ticks == frames / 2 {
            overlay.apply(ConfigChange::Alarm(true));
        }
        let timer = FunctionTimer::new("bargraph::tick");
        if let Some(spu) = overlay.tick(Instant::now()) {
            updates += 1;
            if let Some(region) = spu.image {
                last_image = Some(region.image);
            }
        }
        pacer.record_render_ms(timer.elapsed().as_secs_f32() * 1000.0);
    }
    info!("{ticks} ticks, {updates} subpictures, settled at {} fps", pacer.fps());

    stop.store(true, Ordering::Relaxed);
    let mut inputs = Vec::new();
    for handle in producers {
        inputs.push(handle.join().map_err(|_| anyhow!("producer thread panicked"))?);
    }

    // final frame from whatever the producers left queued
    let render_cfg = overlay.config();
    let snapshot = registry.snapshot_all();
    let mut renderer = BarGraphRenderer::new();

    let svg_out = demo.svg_out();
    let svg = renderer
        .render_svg(&snapshot, &render_cfg)
        .ok_or_else(|| anyhow!("SVG render failed"))?;
    if let Some(markup) = svg.as_svg() {
        fs::write(&svg_out, markup).with_context(|| format!("writing {}", svg_out.display()))?;
        info!("wrote {} ({}x{})", svg_out.display(), svg.width, svg.height);
    }

    let png_out = demo.png_out();
    let raster = match last_image {
        Some(image) if matches!(image.data, ImageData::Rgba(_)) => Some(image),
        _ => renderer.render_raster(&snapshot, &render_cfg, PixelLayout::Rgba),
    }
    .ok_or_else(|| anyhow!("raster render failed"))?;
    if let ImageData::Rgba(pixels) = &raster.data {
        let png = rgba_to_png(raster.width, raster.height, pixels)?;
        fs::write(&png_out, png).with_context(|| format!("writing {}", png_out.display()))?;
        info!("wrote {} ({}x{})", png_out.display(), raster.width, raster.height);
    }

    for audio in inputs {
        input.del(audio);
    }
    overlay.apply(ConfigChange::Detach);
    Ok(())
}
