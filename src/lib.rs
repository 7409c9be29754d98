//! Wavecache - Tensor Storage and Wavetable Cache
//!
//! Holds precomputed oscillator sample data for a software synthesizer,
//! indexed by frequency and by a secondary semantic parameter (a wave-shape
//! selector or a random seed).
//!
//! # Architecture
//!
//! - `tensor`: shape-checked dense buffers with O(1) ownership transfer
//! - `wavetable`: the lookup/update surface and its real-time publication
//! - `cli`: the demo command-line front end

pub mod cli;
pub mod error;
pub mod tensor;
pub mod wavetable;

pub use error::{Result, WavetableError};
pub use tensor::{Shape1, Shape2, Shape3, Tensor1, Tensor2, Tensor3};
pub use wavetable::{WaveTable, WaveTableConfig, WaveTableReader, WaveTableWriter};
