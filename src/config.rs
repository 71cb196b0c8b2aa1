/*
 *  config.rs
 *
 *  wled-icons - 8x8 matrix sequencer
 *  (c) 2020-26 Stuart Hunter
 *
 *  YAML configuration layered with command line overrides
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
use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::constants::{
    DEFAULT_BRIGHTNESS, DEFAULT_DEVICE_TIMEOUT, DEFAULT_HOLD_SECS, DEFAULT_STOP_WAIT, LAMETRIC_ICON_URL,
    LAMETRIC_TIMEOUT, MAX_SLEEP_SLICE,
};
use crate::pixel::Rgb;
use crate::sequence::LoopCount;
use crate::supervisor::SupervisorOptions;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration. Every field is optional so layers can be merged.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub log_level: Option<String>, // e.g. "info" | "debug"
    pub device: Option<DeviceConfig>,
    pub playback: Option<PlaybackConfig>,
    pub lametric: Option<LaMetricConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DeviceConfig {
    pub host: Option<String>,      // ip, host:port or http:// base
    pub timeout_ms: Option<u64>,
    pub brightness: Option<u8>,    // 0-255
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PlaybackConfig {
    pub slice_ms: Option<u64>,     // 1..=50
    pub stop_wait_ms: Option<u64>,
    pub loops: Option<i64>,        // -1 = forever
    pub fps: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LaMetricConfig {
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PowerState {
    On,
    Off,
}

#[derive(Debug, Clone, Subcommand, PartialEq)]
pub enum Command {
    /// Show one LaMetric icon, or several as a slideshow
    Icon {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Seconds each icon is held when several are given
        #[arg(long, default_value_t = DEFAULT_HOLD_SECS)]
        hold: f64,
    },
    /// Show a PNG, JPEG or GIF file
    Image {
        #[arg(value_hint = ValueHint::FilePath)]
        path: PathBuf,
    },
    /// Show an SVG file
    Svg {
        #[arg(value_hint = ValueHint::FilePath)]
        path: PathBuf,
    },
    /// Show a pixel-art JSON file
    Art {
        #[arg(value_hint = ValueHint::FilePath)]
        path: PathBuf,
    },
    /// Blank the matrix
    Clear,
    /// Switch the controller on or off
    Power {
        #[arg(value_enum)]
        state: PowerState,
    },
    /// Set the controller's master brightness
    Brightness { value: u8 },
    /// Print the controller state
    State,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone)]
#[command(name = "wled-icons", version, about = "Icons and animations on a WLED 8x8 matrix")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    /// Enable debug log level
    #[arg(long, short = 'v', alias = "verbose", global = true, action = ArgAction::SetTrue)]
    pub debug: bool,
    /// WLED controller address
    #[arg(long, short = 'H', global = true)]
    pub host: Option<String>,
    #[arg(long, short = 'b', global = true)]
    pub brightness: Option<u8>,
    /// Loop count, -1 loops forever
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub loops: Option<i64>,
    /// Force a uniform frame rate
    #[arg(long, global = true)]
    pub fps: Option<u32>,
    /// Recolour every lit pixel (#RRGGBB)
    #[arg(long, global = true)]
    pub color: Option<Rgb>,
    /// Clockwise rotation: 0, 90, 180 or 270
    #[arg(long, global = true, default_value_t = 0)]
    pub rotate: u16,
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub flip_h: bool,
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub flip_v: bool,
    /// Show only the first frame of animated icons
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub no_animate: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub dump_config: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<(Config, Cli), ConfigError> {
    let cli = Cli::parse();
    let cfg = resolve(&cli)?;
    Ok((cfg, cli))
}

/// Layer defaults, the YAML file and `cli`, then validate.
pub fn resolve(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!("Config file not found: {}", p.display())));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Pretty YAML of the effective config.
pub fn dump_config(cfg: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/wled-icons/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/wled-icons/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/wled-icons.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["wled-icons.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

pub fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
pub fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() { dst.log_level = src.log_level; }
    match (&mut dst.device, src.device) {
        (None, Some(c)) => dst.device = Some(c),
        (Some(d), Some(s)) => {
            if s.host.is_some()       { d.host = s.host; }
            if s.timeout_ms.is_some() { d.timeout_ms = s.timeout_ms; }
            if s.brightness.is_some() { d.brightness = s.brightness; }
        }
        _ => {}
    }
    match (&mut dst.playback, src.playback) {
        (None, Some(c)) => dst.playback = Some(c),
        (Some(d), Some(s)) => {
            if s.slice_ms.is_some()     { d.slice_ms = s.slice_ms; }
            if s.stop_wait_ms.is_some() { d.stop_wait_ms = s.stop_wait_ms; }
            if s.loops.is_some()        { d.loops = s.loops; }
            if s.fps.is_some()          { d.fps = s.fps; }
        }
        _ => {}
    }
    match (&mut dst.lametric, src.lametric) {
        (None, Some(c)) => dst.lametric = Some(c),
        (Some(d), Some(s)) => {
            if s.base_url.is_some()   { d.base_url = s.base_url; }
            if s.timeout_ms.is_some() { d.timeout_ms = s.timeout_ms; }
        }
        _ => {}
    }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }
    if cli.debug { cfg.log_level = Some("debug".to_string()); }

    if cli.host.is_some() || cli.brightness.is_some() {
        let device = cfg.device.get_or_insert_with(DeviceConfig::default);
        if cli.host.is_some()       { device.host = cli.host.clone(); }
        if cli.brightness.is_some() { device.brightness = cli.brightness; }
    }
    if cli.loops.is_some() || cli.fps.is_some() {
        let playback = cfg.playback.get_or_insert_with(PlaybackConfig::default);
        if cli.loops.is_some() { playback.loops = cli.loops; }
        if cli.fps.is_some()   { playback.fps = cli.fps; }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(device) = cfg.device.as_ref() {
        if device.host.as_deref().is_some_and(|h| h.trim().is_empty()) {
            return Err(ConfigError::Validation("device host must not be empty".into()));
        }
        if device.timeout_ms == Some(0) {
            return Err(ConfigError::Validation("device timeout_ms must be > 0".into()));
        }
    }
    if let Some(playback) = cfg.playback.as_ref() {
        if let Some(slice) = playback.slice_ms {
            if !(1..=MAX_SLEEP_SLICE.as_millis() as u64).contains(&slice) {
                return Err(ConfigError::Validation(format!(
                    "playback slice_ms must be 1..={}",
                    MAX_SLEEP_SLICE.as_millis()
                )));
            }
        }
        if playback.stop_wait_ms == Some(0) {
            return Err(ConfigError::Validation("playback stop_wait_ms must be > 0".into()));
        }
        if let Some(loops) = playback.loops {
            LoopCount::from_raw(loops).map_err(|e| ConfigError::Validation(e.to_string()))?;
        }
        if playback.fps == Some(0) {
            return Err(ConfigError::Validation("playback fps must be > 0".into()));
        }
    }
    if let Some(lametric) = cfg.lametric.as_ref() {
        if lametric.timeout_ms == Some(0) {
            return Err(ConfigError::Validation("lametric timeout_ms must be > 0".into()));
        }
    }
    Ok(())
}

impl Config {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    /// The device address, required by every command that talks to the controller.
    pub fn host(&self) -> Result<&str, ConfigError> {
        self.device
            .as_ref()
            .and_then(|d| d.host.as_deref())
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::Validation("no device host: pass --host or set device.host".into()))
    }

    pub fn device_timeout(&self) -> Duration {
        self.device
            .as_ref()
            .and_then(|d| d.timeout_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_DEVICE_TIMEOUT)
    }

    pub fn brightness(&self) -> u8 {
        self.device.as_ref().and_then(|d| d.brightness).unwrap_or(DEFAULT_BRIGHTNESS)
    }

    pub fn loops(&self) -> Result<LoopCount, ConfigError> {
        match self.playback.as_ref().and_then(|p| p.loops) {
            Some(raw) => LoopCount::from_raw(raw).map_err(|e| ConfigError::Validation(e.to_string())),
            None => Ok(LoopCount::ONCE),
        }
    }

    pub fn fps(&self) -> Option<u32> {
        self.playback.as_ref().and_then(|p| p.fps)
    }

    pub fn supervisor_options(&self) -> SupervisorOptions {
        let playback = self.playback.clone().unwrap_or_default();
        SupervisorOptions {
            slice: playback.slice_ms.map(Duration::from_millis).unwrap_or(MAX_SLEEP_SLICE),
            stop_wait: playback.stop_wait_ms.map(Duration::from_millis).unwrap_or(DEFAULT_STOP_WAIT),
        }
    }

    pub fn lametric_base_url(&self) -> &str {
        self.lametric.as_ref().and_then(|l| l.base_url.as_deref()).unwrap_or(LAMETRIC_ICON_URL)
    }

    pub fn lametric_timeout(&self) -> Duration {
        self.lametric
            .as_ref()
            .and_then(|l| l.timeout_ms)
            .map(Duration::from_millis)
            .unwrap_or(LAMETRIC_TIMEOUT)
    }
}
