//! Microphone capture for castup.
//!
//! Provides audio capture with live byte/duration counters, an optional size
//! ceiling, and destructive editing of stopped recordings.

pub mod editor;
pub mod recorder;

pub use recorder::AudioRecorder;
pub(crate) use recorder::suppress_alsa_warnings;
