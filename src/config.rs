/*
 *  config.rs
 *
 *  LyMonS - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  YAML configuration with command line overrides
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

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::peak::MAX_CHANNELS;
use crate::render::config::{self as rcfg, Position, RenderConfig};
use crate::render::PixelLayout;

pub const DEFAULT_FRAMES: u32 = 100;
pub const DEFAULT_FPS: u32 = 25;

/// Error type for config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub log_level: Option<String>,     // "info" | "debug" ...
    pub bargraph: Option<BarGraphConfig>,
    pub demo: Option<DemoConfig>,
}

/// Meter look and placement. Integers stay signed so out of range values
/// can be clamped with a warning instead of failing the parse.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BarGraphConfig {
    pub bar_width: Option<i32>,
    pub bar_height: Option<i32>,
    pub transparency: Option<i32>, // 0-255
    pub position: Option<i32>,     // bitmask, -1 absolute
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub alarm: Option<bool>,
    pub pixel_layout: Option<PixelLayout>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DemoStream {
    pub id: i32,
    pub channels: usize,
    #[serde(default)]
    pub language: Option<String>,
}

/// Synthetic signal run by the binary.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DemoConfig {
    pub streams: Option<Vec<DemoStream>>,
    pub frames: Option<u32>,
    pub fps: Option<u32>,
    pub seed: Option<u64>,
    pub svg_out: Option<PathBuf>,
    pub png_out: Option<PathBuf>,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "lymons-bargraph", about = "LyMonS audio bargraph", version)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    pub bar_width: Option<i32>,
    #[arg(long, allow_negative_numbers = true)]
    pub bar_height: Option<i32>,
    #[arg(long, allow_negative_numbers = true)]
    pub transparency: Option<i32>,
    /// 0=center, 1=left, 2=right, 4=top, 8=bottom, -1 absolute
    #[arg(long, allow_negative_numbers = true)]
    pub position: Option<i32>,
    #[arg(long, allow_negative_numbers = true)]
    pub x: Option<i32>,
    #[arg(long, allow_negative_numbers = true)]
    pub y: Option<i32>,
    #[arg(long, action = ArgAction::Set)]
    pub alarm: Option<bool>,
    /// number of synthetic streams, each with --channels channels
    #[arg(long)]
    pub streams: Option<u32>,
    #[arg(long)]
    pub channels: Option<usize>,
    #[arg(long)]
    pub frames: Option<u32>,
    #[arg(long)]
    pub fps: Option<u32>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub svg_out: Option<PathBuf>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub png_out: Option<PathBuf>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, normalize.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = load_from(&cli, find_config_file())?;

    if cli.dump_config {
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Layer defaults, the YAML file and `cli`. An explicit `--config` wins
/// over `discovered`.
pub fn load_from(cli: &Cli, discovered: Option<PathBuf>) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();

    if let Some(p) = cli.config.as_ref() {
        if !p.exists() {
            return Err(ConfigError::NotFound(p.clone()));
        }
        merge(&mut cfg, read_yaml(p)?);
    } else if let Some(p) = discovered {
        merge(&mut cfg, read_yaml(&p)?);
    }

    apply_cli_overrides(&mut cfg, cli);
    normalize(&mut cfg);
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
pub fn find_config_file() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let p = home.join(".config/lymons/bargraph.yaml");
        if p.exists() { return Some(p) }
    }
    for candidate in &["bargraph.yaml", "config/bargraph.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

pub fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    Ok(serde_yaml::from_str(s)?)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() { dst.log_level = src.log_level; }
    match (&mut dst.bargraph, src.bargraph) {
        (None, Some(b)) => dst.bargraph = Some(b),
        (Some(d), Some(s)) => merge_bargraph(d, s),
        _ => {}
    }
    match (&mut dst.demo, src.demo) {
        (None, Some(b)) => dst.demo = Some(b),
        (Some(d), Some(s)) => merge_demo(d, s),
        _ => {}
    }
}

fn merge_bargraph(dst: &mut BarGraphConfig, src: BarGraphConfig) {
    if src.bar_width.is_some()    { dst.bar_width = src.bar_width; }
    if src.bar_height.is_some()   { dst.bar_height = src.bar_height; }
    if src.transparency.is_some() { dst.transparency = src.transparency; }
    if src.position.is_some()     { dst.position = src.position; }
    if src.x.is_some()            { dst.x = src.x; }
    if src.y.is_some()            { dst.y = src.y; }
    if src.alarm.is_some()        { dst.alarm = src.alarm; }
    if src.pixel_layout.is_some() { dst.pixel_layout = src.pixel_layout; }
}

fn merge_demo(dst: &mut DemoConfig, src: DemoConfig) {
    if src.streams.is_some() { dst.streams = src.streams; }
    if src.frames.is_some()  { dst.frames = src.frames; }
    if src.fps.is_some()     { dst.fps = src.fps; }
    if src.seed.is_some()    { dst.seed = src.seed; }
    if src.svg_out.is_some() { dst.svg_out = src.svg_out; }
    if src.png_out.is_some() { dst.png_out = src.png_out; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }

    let b = cfg.bargraph.get_or_insert_with(BarGraphConfig::default);
    if cli.bar_width.is_some()    { b.bar_width = cli.bar_width; }
    if cli.bar_height.is_some()   { b.bar_height = cli.bar_height; }
    if cli.transparency.is_some() { b.transparency = cli.transparency; }
    if cli.position.is_some()     { b.position = cli.position; }
    if cli.x.is_some()            { b.x = cli.x; }
    if cli.y.is_some()            { b.y = cli.y; }
    if cli.alarm.is_some()        { b.alarm = cli.alarm; }

    let d = cfg.demo.get_or_insert_with(DemoConfig::default);
    if cli.frames.is_some()  { d.frames = cli.frames; }
    if cli.fps.is_some()     { d.fps = cli.fps; }
    if cli.seed.is_some()    { d.seed = cli.seed; }
    if cli.svg_out.is_some() { d.svg_out = cli.svg_out.clone(); }
    if cli.png_out.is_some() { d.png_out = cli.png_out.clone(); }
    if cli.streams.is_some() || cli.channels.is_some() {
        let count = cli.streams.unwrap_or(1);
        let channels = cli.channels.unwrap_or(2);
        d.streams = Some(
            (1..=count as i32)
                .map(|id| DemoStream { id, channels, language: None })
                .collect(),
        );
    }
}

/// Bring malformed values back into range. Nothing here fails.
fn normalize(cfg: &mut Config) {
    if let Some(b) = cfg.bargraph.as_mut() {
        b.bar_width = b.bar_width.map(|v| rcfg::clamp_bar_width(v) as i32);
        b.bar_height = b.bar_height.map(|v| rcfg::clamp_bar_height(v) as i32);
        b.transparency = b.transparency.map(|v| rcfg::clamp_alpha(v) as i32);
        if let Some(p) = b.position {
            let decoded = Position::from_bitmask(p).bitmask();
            if decoded != p && p >= 0 {
                warn!("position {p} normalized to {decoded}");
                b.position = Some(decoded);
            }
        }
    }
    if let Some(d) = cfg.demo.as_mut() {
        if d.fps == Some(0) {
            warn!("fps 0 is not usable, using {DEFAULT_FPS}");
            d.fps = Some(DEFAULT_FPS);
        }
        if let Some(streams) = d.streams.as_mut() {
            for s in streams.iter_mut().filter(|s| s.channels > MAX_CHANNELS) {
                warn!("stream {} asks for {} channels, using {MAX_CHANNELS}", s.id, s.channels);
                s.channels = MAX_CHANNELS;
            }
            let before = streams.len();
            streams.sort_by_key(|s| s.id);
            streams.dedup_by_key(|s| s.id);
            if streams.len() != before {
                warn!("duplicate demo stream ids dropped");
            }
        }
    }
}

impl Config {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    /// Render settings with defaults filled in
    pub fn render_config(&self) -> RenderConfig {
        let mut rc = RenderConfig::default();
        if let Some(b) = self.bargraph.as_ref() {
            if let Some(v) = b.bar_width    { rc.bar_width = rcfg::clamp_bar_width(v); }
            if let Some(v) = b.bar_height   { rc.bar_height = rcfg::clamp_bar_height(v); }
            if let Some(v) = b.transparency { rc.alpha = rcfg::clamp_alpha(v); }
            if let Some(v) = b.position     { rc.position = Position::from_bitmask(v); }
            if let Some(v) = b.x            { rc.offset_x = v; }
            if let Some(v) = b.y            { rc.offset_y = v; }
            if let Some(v) = b.alarm        { rc.alarm = v; }
        }
        rc
    }

    pub fn pixel_layout(&self) -> PixelLayout {
        self.bargraph.as_ref().and_then(|b| b.pixel_layout).unwrap_or_default()
    }

    pub fn demo(&self) -> DemoConfig {
        self.demo.clone().unwrap_or_default()
    }
}

impl DemoConfig {
    pub fn streams(&self) -> Vec<DemoStream> {
        self.streams.clone().unwrap_or_else(|| {
            vec![
                DemoStream { id: 1, channels: 2, language: Some("eng".into()) },
                DemoStream { id: 2, channels: 6, language: None },
            ]
        })
    }

    pub fn frames(&self) -> u32 { self.frames.unwrap_or(DEFAULT_FRAMES) }
    pub fn fps(&self) -> u32 { self.fps.unwrap_or(DEFAULT_FPS).max(1) }

    pub fn svg_out(&self) -> PathBuf {
        self.svg_out.clone().unwrap_or_else(|| PathBuf::from("bargraph.svg"))
    }

    pub fn png_out(&self) -> PathBuf {
        self.png_out.clone().unwrap_or_else(|| PathBuf::from("bargraph.png"))
    }
}
