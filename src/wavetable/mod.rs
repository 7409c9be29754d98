//! Wavetable Cache Module
//!
//! Frequency-indexed oscillator slices with O(1) hot-swap updates:
//! - Configuration and addressing modes
//! - The `WaveTable` lookup/update surface
//! - Single-writer publication to real-time readers

mod config;
mod shared;
mod table;

pub use config::{
    WaveTableConfig, WtMode, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_FREQS, DEFAULT_MAX_SEMANTICS,
};
pub use shared::{shared, ReadGuard, WaveTableReader, WaveTableWriter};
pub use table::{Sample, Slice, TableState, WaveTable};
