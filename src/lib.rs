//! Sound core of a three-oscillator theremin.
//!
//! `init_theremin` splits the instrument into `ThereminControls`, used from
//! the control thread, and a `ThereminPlayhead` that renders interleaved
//! 16-bit stereo buffers on the audio thread. `AudioEngine` runs the
//! playhead on its own thread and feeds an `AudioSink`.

#[macro_use]
extern crate lazy_static;

pub mod building_blocks;
pub mod config;
pub mod error;
pub mod sink;
pub mod stats;
pub mod theremin;

pub use crate::config::EngineConfig;
pub use crate::error::{EngineError, SinkError};
pub use crate::sink::{channel_sink, AudioSink, ChannelSink, NullSink, SinkConfig, SinkReceiver};
pub use crate::stats::RenderStatsSnapshot;
pub use crate::theremin::{
    init_theremin, AudioEngine, ChannelMode, DefaultAudioEngine, MelodyNote, MelodyVoice,
    ThereminControls, ThereminPlayhead,
};
