use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::waveform::{Sine, TrapezoidPulse, WaveformFunction, WaveformKind};

const MAX_SAMPLE_RATE: f64 = 1_000_000.0;
/// Upper bound for chunk duration and write interval.
const MAX_SECONDS: f64 = 60.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewMode {
    /// Storage in memory order with the write cursor marked.
    Raw,
    /// `read_latest(capacity)`, oldest sample on the left.
    Chronological,
}

impl ViewMode {
    pub const ALL: [ViewMode; 2] = [ViewMode::Raw, ViewMode::Chronological];

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Raw => "Raw memory layout",
            ViewMode::Chronological => "Chronological",
        }
    }

    pub fn as_key(self) -> &'static str {
        match self {
            ViewMode::Raw => "raw",
            ViewMode::Chronological => "chronological",
        }
    }

    fn from_key(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Some(ViewMode::Raw),
            "chronological" | "ordered" => Some(ViewMode::Chronological),
            _ => None,
        }
    }
}

/// Everything the host app needs to build a buffer, a generator and a view.
#[derive(Clone, Debug, PartialEq)]
pub struct ScopeSettings {
    pub capacity: usize,
    pub sample_rate: f64,
    pub chunk_duration: f64,
    pub write_interval: f64,
    pub plot_interval_ms: u64,
    pub waveform: WaveformKind,
    pub frequency: f64,
    pub amplitude: f64,
    pub offset: f64,
    pub edge_time: f64,
    pub view: ViewMode,
    pub y_min: f32,
    pub y_max: f32,
}

impl Default for ScopeSettings {
    fn default() -> Self {
        Self {
            capacity: 16_000,
            sample_rate: 16_000.0,
            chunk_duration: 0.01,
            write_interval: 0.01,
            plot_interval_ms: 10,
            waveform: WaveformKind::TrapezoidPulse,
            frequency: 0.2,
            amplitude: 2.0,
            offset: 0.0,
            edge_time: 0.2,
            view: ViewMode::Raw,
            y_min: -0.2,
            y_max: 2.2,
        }
    }
}

impl ScopeSettings {
    /// Reads `path`, falling back to defaults for a missing file and for any
    /// key that is absent or fails to parse.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(raw) => Self::parse(&raw),
            Err(err) => {
                log::info!("using default settings ({}: {err})", path.display());
                Self::default()
            }
        }
    }

    pub fn parse(raw: &str) -> Self {
        let mut settings = Self::default();
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                settings.apply_kv(key.trim(), value.trim());
            }
        }
        settings
    }

    pub fn save(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                log::warn!("could not create {}: {err}", parent.display());
            }
        }
        if let Err(err) = fs::write(path, self.to_cfg_string()) {
            log::warn!("could not save settings to {}: {err}", path.display());
        }
    }

    pub fn to_cfg_string(&self) -> String {
        let mut buf = String::new();
        buf.push_str(&format!("capacity={}\n", self.capacity));
        buf.push_str(&format!("sample_rate={}\n", self.sample_rate));
        buf.push_str(&format!("chunk_duration={}\n", self.chunk_duration));
        buf.push_str(&format!("write_interval={}\n", self.write_interval));
        buf.push_str(&format!("plot_interval_ms={}\n", self.plot_interval_ms));
        buf.push_str(&format!("waveform={}\n", self.waveform.as_key()));
        buf.push_str(&format!("frequency={}\n", self.frequency));
        buf.push_str(&format!("amplitude={}\n", self.amplitude));
        buf.push_str(&format!("offset={}\n", self.offset));
        buf.push_str(&format!("edge_time={}\n", self.edge_time));
        buf.push_str(&format!("view={}\n", self.view.as_key()));
        buf.push_str(&format!("y_min={}\n", self.y_min));
        buf.push_str(&format!("y_max={}\n", self.y_max));
        buf
    }

    /// The configured waveform. Sine ignores amplitude and edge time.
    pub fn build_waveform(&self) -> Arc<dyn WaveformFunction> {
        match self.waveform {
            WaveformKind::Sine => Arc::new(Sine {
                frequency: self.frequency,
                offset: self.offset,
            }),
            WaveformKind::TrapezoidPulse => Arc::new(TrapezoidPulse {
                amplitude: self.amplitude,
                frequency: self.frequency,
                offset: self.offset,
                edge_time: self.edge_time,
            }),
        }
    }

    fn apply_kv(&mut self, key: &str, value: &str) {
        match key {
            "capacity" => parse_capacity(value, &mut self.capacity),
            "sample_rate" => parse_bounded(value, &mut self.sample_rate, MAX_SAMPLE_RATE),
            "chunk_duration" => parse_bounded(value, &mut self.chunk_duration, MAX_SECONDS),
            "write_interval" => parse_bounded(value, &mut self.write_interval, MAX_SECONDS),
            "plot_interval_ms" => parse_into(value, &mut self.plot_interval_ms),
            "waveform" => {
                if let Some(kind) = WaveformKind::from_key(value) {
                    self.waveform = kind;
                }
            }
            "frequency" => parse_bounded(value, &mut self.frequency, MAX_SAMPLE_RATE),
            "amplitude" => parse_finite(value, &mut self.amplitude),
            "offset" => parse_finite(value, &mut self.offset),
            "edge_time" => parse_finite(value, &mut self.edge_time),
            "view" => {
                if let Some(view) = ViewMode::from_key(value) {
                    self.view = view;
                }
            }
            "y_min" => parse_finite_f32(value, &mut self.y_min),
            "y_max" => parse_finite_f32(value, &mut self.y_max),
            _ => log::debug!("ignoring unknown settings key {key:?}"),
        }
    }
}

fn parse_into<T: FromStr>(value: &str, target: &mut T) {
    if let Ok(v) = value.parse::<T>() {
        *target = v;
    }
}

fn parse_capacity(value: &str, target: &mut usize) {
    if let Ok(v) = value.parse::<usize>() {
        if v > 0 {
            *target = v;
        }
    }
}

// Accepts finite values in (0, max]; anything else keeps the current value.
fn parse_bounded(value: &str, target: &mut f64, max: f64) {
    if let Ok(v) = value.parse::<f64>() {
        if v.is_finite() && v > 0.0 && v <= max {
            *target = v;
        }
    }
}

fn parse_finite(value: &str, target: &mut f64) {
    if let Ok(v) = value.parse::<f64>() {
        if v.is_finite() {
            *target = v;
        }
    }
}

fn parse_finite_f32(value: &str, target: &mut f32) {
    if let Ok(v) = value.parse::<f32>() {
        if v.is_finite() {
            *target = v;
        }
    }
}

pub fn default_settings_path() -> PathBuf {
    config_dir().join("ringscope.cfg")
}

fn config_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(roaming) = std::env::var("APPDATA") {
            return PathBuf::from(roaming).join("RingScope");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("RingScope");
        }
    }

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("ringscope");
    }

    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".config")
        .join("ringscope")
}
