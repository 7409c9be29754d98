//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::f32::consts::TAU;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::tensor::{Shape1, Shape3, Tensor1, Tensor3};
use crate::wavetable::{Sample, WaveTable, WaveTableConfig};

/// Samples shown in a probe report
const PREVIEW_LEN: usize = 8;

/// Outcome of a `probe` command
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub query: Sample,
    pub row: usize,
    pub row_freq: Sample,
    pub rows: usize,
    pub buffer_size: usize,
    pub mode: String,
    pub preview: Vec<Sample>,
    pub peak: Sample,
}

/// Fill row `r` of a `{buffer_size, rows, 1}` cube with `r + 1` sine cycles
///
/// Only a recognizable test pattern; real content comes from the synth's
/// oscillator code.
pub fn sine_test_pattern(buffer_size: usize, rows: usize) -> Result<Tensor3<Sample>> {
    let mut data = Tensor3::new(Shape3::new([buffer_size, rows, 1]))?;
    for row in 0..rows {
        let cycles = (row + 1) as Sample;
        data.fill_lane_with(row, 0, |i| {
            (TAU * cycles * i as Sample / buffer_size as Sample).sin()
        });
    }
    Ok(data)
}

/// Load the configuration for a probe, applying the buffer-size override
pub fn resolve_config(
    config_path: Option<&Path>,
    buffer_size: Option<usize>,
) -> Result<WaveTableConfig> {
    let mut config = match config_path {
        Some(path) => {
            info!("Loading configuration: {}", path.display());
            WaveTableConfig::from_json_file(path)?
        }
        None => WaveTableConfig::default(),
    };
    if let Some(size) = buffer_size {
        config = config.with_buffer_size(size);
    }
    config.validate()?;
    Ok(config)
}

/// Build a test-pattern table over `freqs` and look up `query`
pub fn probe(config: WaveTableConfig, freqs: &[Sample], query: Sample) -> Result<ProbeReport> {
    info!(
        "Probing {} Hz across {} rows of {} samples",
        query,
        freqs.len(),
        config.buffer_size
    );

    let mut table = WaveTable::with_config(config)?;
    let mut data = sine_test_pattern(config.buffer_size, freqs.len())?;
    let mut freq_rows = Tensor1::from_vec(Shape1::new([freqs.len()]), freqs.to_vec())?;
    let mut semantics = Tensor1::from_vec(Shape1::new([1]), vec![0.0])?;
    table.insert(&mut data, &mut freq_rows, &mut semantics, true)?;

    let slice = table.try_get(query)?;
    let row = table.nearest_row(query).unwrap_or(0);
    Ok(ProbeReport {
        query,
        row,
        row_freq: table.freqs()[row],
        rows: table.num_rows(),
        buffer_size: table.buffer_size(),
        mode: table.mode().to_string(),
        preview: slice.iter().take(PREVIEW_LEN).copied().collect(),
        peak: slice.iter().fold(0.0, |peak: Sample, s| peak.max(s.abs())),
    })
}

/// Run `probe` and print the report as JSON
pub fn run_probe(
    freqs: &[Sample],
    query: Sample,
    buffer_size: Option<usize>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = resolve_config(config_path, buffer_size)?;
    let report = probe(config, freqs, query)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Validate a configuration file and print it normalized
pub fn check_config(path: &Path) -> Result<()> {
    info!("Checking configuration: {}", path.display());
    let config = WaveTableConfig::from_json_file(path)?;
    println!("{}", config.to_json_pretty()?);
    println!(
        "Fully populated table: {} bytes",
        config.max_table_bytes()
    );
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
