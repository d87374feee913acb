//! A background sample generator feeding a lock-guarded circular buffer that
//! any number of consumers can poll.

pub mod buffer;
pub mod error;
pub mod generator;
pub mod settings;
pub mod waveform;

pub use buffer::{CircularBuffer, RawSnapshot};
pub use error::{Result, ScopeError};
pub use generator::SampleGenerator;
pub use settings::{ScopeSettings, ViewMode, default_settings_path};
pub use waveform::{Sine, TrapezoidPulse, WaveformFunction, WaveformKind};
