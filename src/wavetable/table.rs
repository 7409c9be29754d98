//! WaveTable
//!
//! Aggregates the semantic vector, the frequency vector and the sample cube
//! of one oscillator cache. The cube is laid out `{time, freq row, semantic}`
//! row-major, so a slice for one `(row, semantic)` pair is a strided lane
//! along the time axis.

use std::sync::Arc;

use tracing::{debug, warn};

use super::config::{WaveTableConfig, WtMode};
use crate::error::{Result, WavetableError};
use crate::tensor::{
    system_allocator, Allocator, Lane, Shape1, Shape3, Tensor, Tensor1, Tensor3,
};

/// Sample type stored in wavetables
pub type Sample = f32;

/// Read-only time-domain slice returned by lookups
pub type Slice<'a> = Lane<'a, Sample>;

/// Lifecycle state of a [`WaveTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableState {
    /// Constructed, nothing inserted yet
    #[default]
    Uninitialized,
    /// All three tensors hold shape-consistent content
    Populated,
}

/// Precomputed oscillator slices indexed by frequency and semantic value
///
/// # Example
/// ```
/// use wavecache::tensor::{Shape1, Shape3, Tensor1, Tensor3};
/// use wavecache::wavetable::WaveTable;
///
/// let mut table = WaveTable::new(4).unwrap();
/// let mut data = Tensor3::new(Shape3::new([4, 2, 1])).unwrap();
/// data.fill_lane_with(1, 0, |i| i as f32);
/// let mut freqs = Tensor1::from_vec(Shape1::new([2]), vec![110.0, 220.0]).unwrap();
/// let mut semantics = Tensor1::from_vec(Shape1::new([1]), vec![0.0]).unwrap();
///
/// table.insert(&mut data, &mut freqs, &mut semantics, true).unwrap();
/// assert_eq!(table.get(230.0).to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
/// ```
#[derive(Debug)]
pub struct WaveTable {
    config: WaveTableConfig,
    allocator: Arc<dyn Allocator>,
    state: TableState,
    /// Oscillator parameter or random seed of each depth slot
    semantics: Tensor1<Sample>,
    /// Representative frequency of each row, strictly ascending
    freqs: Tensor1<Sample>,
    /// time = col, freq = row, semantic = depth
    data: Tensor3<Sample>,
}

impl WaveTable {
    /// Create an uninitialized table whose slices hold `buffer_size` samples
    ///
    /// # Errors
    /// Returns `InvalidConfig` if `buffer_size` is zero
    pub fn new(buffer_size: usize) -> Result<Self> {
        Self::with_config(WaveTableConfig::new(buffer_size))
    }

    pub fn with_config(config: WaveTableConfig) -> Result<Self> {
        Self::with_allocator(config, system_allocator())
    }

    /// Create an uninitialized table whose merge buffers are accounted
    /// through `allocator`
    pub fn with_allocator(config: WaveTableConfig, allocator: Arc<dyn Allocator>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            allocator,
            state: TableState::Uninitialized,
            semantics: Tensor1::empty(Shape1::new([0])),
            freqs: Tensor1::empty(Shape1::new([0])),
            data: Tensor3::empty(Shape3::new([config.buffer_size, 0, 0])),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &WaveTableConfig {
        &self.config
    }

    pub fn mode(&self) -> WtMode {
        self.config.mode
    }

    /// Samples per slice
    pub fn buffer_size(&self) -> usize {
        self.config.buffer_size
    }

    pub fn state(&self) -> TableState {
        self.state
    }

    pub fn is_populated(&self) -> bool {
        self.state == TableState::Populated
    }

    /// Frequency of each row (empty until populated)
    pub fn freqs(&self) -> &[Sample] {
        self.freqs.as_slice()
    }

    /// Semantic value of each depth slot (empty until populated)
    pub fn semantics(&self) -> &[Sample] {
        self.semantics.as_slice()
    }

    /// The sample cube
    pub fn data(&self) -> &Tensor3<Sample> {
        &self.data
    }

    pub fn num_rows(&self) -> usize {
        self.freqs.len()
    }

    pub fn num_semantics(&self) -> usize {
        self.semantics.len()
    }

    /// How many more semantic entries fit before the capacity limit
    ///
    /// Producers use this to decide whether new random seeds are worth
    /// generating.
    pub fn remaining_semantic_capacity(&self) -> usize {
        self.config.max_semantics.saturating_sub(self.num_semantics())
    }

    // ========================================================================
    // Lookup (real-time safe)
    // ========================================================================

    /// Row whose frequency is nearest to `freq` by ratio
    ///
    /// Ties go to the lower row. Frequencies outside the stored range clamp
    /// to the first or last row; non-positive or NaN input selects row 0.
    /// `None` only when the table has no rows.
    pub fn nearest_row(&self, freq: Sample) -> Option<usize> {
        let freqs = self.freqs.as_slice();
        if freqs.is_empty() {
            return None;
        }
        if freq.is_nan() || freq <= 0.0 {
            return Some(0);
        }

        let above = freqs.partition_point(|&f| f < freq);
        if above == 0 {
            return Some(0);
        }
        if above == freqs.len() {
            return Some(freqs.len() - 1);
        }

        let below = above - 1;
        if freq / freqs[below] <= freqs[above] / freq {
            Some(below)
        } else {
            Some(above)
        }
    }

    /// Depth slot whose semantic value is nearest to `semantic`
    ///
    /// Ties go to the lower slot; NaN selects slot 0.
    pub fn nearest_semantic(&self, semantic: Sample) -> Option<usize> {
        let semantics = self.semantics.as_slice();
        if semantics.is_empty() {
            return None;
        }
        if semantic.is_nan() {
            return Some(0);
        }

        let mut best = 0;
        let mut best_distance = Sample::INFINITY;
        for (slot, &value) in semantics.iter().enumerate() {
            let distance = (value - semantic).abs();
            if distance < best_distance {
                best = slot;
                best_distance = distance;
            }
        }
        Some(best)
    }

    /// Slice for the row nearest to `freq`, semantic slot 0
    ///
    /// No allocation, no locking, O(log rows).
    ///
    /// # Panics
    /// Panics if the table has not been populated; see [`try_get`](Self::try_get)
    pub fn get(&self, freq: Sample) -> Slice<'_> {
        match self.try_get(freq) {
            Ok(slice) => slice,
            Err(_) => panic!("WaveTable::get called before the first insert"),
        }
    }

    /// Checked variant of [`get`](Self::get)
    pub fn try_get(&self, freq: Sample) -> Result<Slice<'_>> {
        let row = self.nearest_row(freq).ok_or(WavetableError::NotPopulated)?;
        self.slice(row, 0)
    }

    /// Slice for the row nearest to `freq` and the slot nearest to `semantic`
    ///
    /// # Panics
    /// Panics if the table has not been populated
    pub fn get_semantic(&self, freq: Sample, semantic: Sample) -> Slice<'_> {
        match self.try_get_semantic(freq, semantic) {
            Ok(slice) => slice,
            Err(_) => panic!("WaveTable::get_semantic called before the first insert"),
        }
    }

    pub fn try_get_semantic(&self, freq: Sample, semantic: Sample) -> Result<Slice<'_>> {
        let row = self.nearest_row(freq).ok_or(WavetableError::NotPopulated)?;
        let slot = self
            .nearest_semantic(semantic)
            .ok_or(WavetableError::NotPopulated)?;
        self.slice(row, slot)
    }

    /// Slice at explicit `(row, slot)` coordinates
    pub fn slice(&self, row: usize, slot: usize) -> Result<Slice<'_>> {
        if !self.is_populated() {
            return Err(WavetableError::NotPopulated);
        }
        self.data
            .lane(row, slot)
            .ok_or_else(|| WavetableError::InvalidShape {
                reason: format!(
                    "slice ({}, {}) outside table of shape {}",
                    row,
                    slot,
                    self.data.shape()
                ),
            })
    }

    // ========================================================================
    // Update (non-real-time)
    // ========================================================================

    /// Absorb newly generated tensors
    ///
    /// With `invalidate` (or on an uninitialized table) the incoming tensors
    /// replace the stored ones in O(1); afterwards the arguments hold the
    /// previous contents so the producer can reuse the buffers.
    ///
    /// Without `invalidate`, `freqs` must match the stored rows and only
    /// semantic entries not yet stored are appended. Existing slices are
    /// kept and the arguments are left untouched.
    ///
    /// # Errors
    /// Any validation or allocation failure leaves the table unchanged.
    pub fn insert(
        &mut self,
        data: &mut Tensor3<Sample>,
        freqs: &mut Tensor1<Sample>,
        semantics: &mut Tensor1<Sample>,
        invalidate: bool,
    ) -> Result<()> {
        if let Err(e) = self.validate_incoming(data, freqs, semantics) {
            warn!(
                code = e.error_code(),
                shape = %data.shape(),
                "wavetable insert rejected: {}",
                e
            );
            return Err(e);
        }

        if invalidate || !self.is_populated() {
            self.replace(data, freqs, semantics);
            Ok(())
        } else {
            self.merge_semantics(data, freqs, semantics)
        }
    }

    /// Return to the uninitialized state, dropping all content
    pub fn clear(&mut self) {
        self.semantics = Tensor1::empty(Shape1::new([0]));
        self.freqs = Tensor1::empty(Shape1::new([0]));
        self.data = Tensor3::empty(Shape3::new([self.config.buffer_size, 0, 0]));
        self.state = TableState::Uninitialized;
        debug!("wavetable cleared");
    }

    /// Deep copy of the whole table
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            config: self.config,
            allocator: Arc::clone(&self.allocator),
            state: self.state,
            semantics: self.semantics.try_clone()?,
            freqs: self.freqs.try_clone()?,
            data: self.data.try_clone()?,
        })
    }

    fn validate_incoming(
        &self,
        data: &Tensor3<Sample>,
        freqs: &Tensor1<Sample>,
        semantics: &Tensor1<Sample>,
    ) -> Result<()> {
        let rows = freqs.len();
        let depth = semantics.len();

        if rows == 0 {
            return Err(WavetableError::InvalidFrequencies {
                reason: "no frequency rows".to_string(),
            });
        }
        if rows > self.config.max_freqs {
            return Err(WavetableError::CapacityExceeded {
                what: "frequency rows",
                requested: rows,
                limit: self.config.max_freqs,
            });
        }
        if depth == 0 {
            return Err(WavetableError::InvalidSemantics {
                reason: "no semantic entries".to_string(),
            });
        }
        if depth > self.config.max_semantics {
            return Err(WavetableError::CapacityExceeded {
                what: "semantics",
                requested: depth,
                limit: self.config.max_semantics,
            });
        }

        let expected = Shape3::new([self.config.buffer_size, rows, depth]);
        if data.shape() != expected || data.is_empty() {
            return Err(WavetableError::shape_mismatch(expected, data.shape()));
        }

        let freq_values = freqs.as_slice();
        if let Some(bad) = freq_values.iter().find(|f| !f.is_finite() || **f <= 0.0) {
            return Err(WavetableError::InvalidFrequencies {
                reason: format!("{} is not a positive finite frequency", bad),
            });
        }
        if freq_values.windows(2).any(|w| w[0] >= w[1]) {
            return Err(WavetableError::InvalidFrequencies {
                reason: "rows must be strictly ascending".to_string(),
            });
        }

        let semantic_values = semantics.as_slice();
        if let Some(bad) = semantic_values.iter().find(|s| !s.is_finite()) {
            return Err(WavetableError::InvalidSemantics {
                reason: format!("{} is not finite", bad),
            });
        }
        let mut sorted = semantic_values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        if sorted.windows(2).any(|w| w[0] == w[1]) {
            return Err(WavetableError::InvalidSemantics {
                reason: "duplicate semantic values".to_string(),
            });
        }

        Ok(())
    }

    fn replace(
        &mut self,
        data: &mut Tensor3<Sample>,
        freqs: &mut Tensor1<Sample>,
        semantics: &mut Tensor1<Sample>,
    ) {
        let reused = self.data.shape() == data.shape();
        exchange(&mut self.data, data);
        exchange(&mut self.freqs, freqs);
        exchange(&mut self.semantics, semantics);
        self.state = TableState::Populated;

        debug!(
            rows = self.num_rows(),
            semantics = self.num_semantics(),
            reused_shape = reused,
            "wavetable replaced"
        );
    }

    fn merge_semantics(
        &mut self,
        data: &Tensor3<Sample>,
        freqs: &Tensor1<Sample>,
        semantics: &Tensor1<Sample>,
    ) -> Result<()> {
        if freqs.as_slice() != self.freqs.as_slice() {
            warn!(
                stored = self.num_rows(),
                incoming = freqs.len(),
                "frequency rows differ on a non-invalidating insert"
            );
            return Err(WavetableError::FrequencyMismatch);
        }

        let stored = self.semantics.as_slice();
        let added: Vec<usize> = semantics
            .as_slice()
            .iter()
            .enumerate()
            .filter(|(_, value)| !stored.contains(*value))
            .map(|(slot, _)| slot)
            .collect();

        if added.is_empty() {
            debug!("no new semantic entries; wavetable unchanged");
            return Ok(());
        }

        let old_depth = self.num_semantics();
        let new_depth = old_depth + added.len();
        if new_depth > self.config.max_semantics {
            return Err(WavetableError::CapacityExceeded {
                what: "semantics",
                requested: new_depth,
                limit: self.config.max_semantics,
            });
        }

        let mut merged_semantics =
            Tensor1::<Sample>::new_in(Shape1::new([new_depth]), Arc::clone(&self.allocator))?;
        let merged_shape = Shape3::new([self.config.buffer_size, self.num_rows(), new_depth]);
        let mut merged_data = Tensor3::<Sample>::new_in(merged_shape, Arc::clone(&self.allocator))?;

        {
            let values = merged_semantics.as_mut_slice();
            values[..old_depth].copy_from_slice(stored);
            for (dst, &src) in values[old_depth..].iter_mut().zip(&added) {
                *dst = semantics.as_slice()[src];
            }
        }

        // the semantic axis is contiguous, so each (time, row) pair is one run
        let old = self.data.as_slice();
        let incoming = data.as_slice();
        let incoming_depth = semantics.len();
        for (run, out) in merged_data.as_mut_slice().chunks_exact_mut(new_depth).enumerate() {
            out[..old_depth].copy_from_slice(&old[run * old_depth..(run + 1) * old_depth]);
            let source = &incoming[run * incoming_depth..(run + 1) * incoming_depth];
            for (dst, &src) in out[old_depth..].iter_mut().zip(&added) {
                *dst = source[src];
            }
        }

        self.semantics = merged_semantics;
        self.data = merged_data;

        debug!(
            added = added.len(),
            semantics = new_depth,
            "semantic entries appended to wavetable"
        );
        Ok(())
    }
}

/// Hand `incoming`'s buffer to `held` and the old one back, in O(1)
fn exchange<const N: usize>(held: &mut Tensor<N, Sample>, incoming: &mut Tensor<N, Sample>) {
    if held.shape() == incoming.shape() {
        held.swap(incoming);
    } else {
        std::mem::swap(held, incoming);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::BudgetAllocator;
    use approx::assert_relative_eq;

    const BUFFER: usize = 8;

    /// Cube where every sample encodes its coordinates: row * 100 + slot * 10 + time / 10
    fn patterned(rows: usize, semantics: &[Sample], base: Sample) -> Tensor3<Sample> {
        let mut data = Tensor3::new(Shape3::new([BUFFER, rows, semantics.len()])).unwrap();
        for row in 0..rows {
            for slot in 0..semantics.len() {
                data.fill_lane_with(row, slot, |t| {
                    base + row as Sample * 100.0 + slot as Sample * 10.0 + t as Sample / 10.0
                });
            }
        }
        data
    }

    fn vector(values: &[Sample]) -> Tensor1<Sample> {
        Tensor1::from_vec(Shape1::new([values.len()]), values.to_vec()).unwrap()
    }

    fn populated(freqs: &[Sample], semantics: &[Sample]) -> WaveTable {
        let mut table = WaveTable::new(BUFFER).unwrap();
        let mut data = patterned(freqs.len(), semantics, 0.0);
        table
            .insert(&mut data, &mut vector(freqs), &mut vector(semantics), true)
            .unwrap();
        table
    }

    // ------------------------------------------------------------------------
    // Construction and state
    // ------------------------------------------------------------------------

    #[test]
    fn test_new_is_uninitialized() {
        let table = WaveTable::new(64).unwrap();
        assert_eq!(table.state(), TableState::Uninitialized);
        assert_eq!(table.buffer_size(), 64);
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.remaining_semantic_capacity(), 128);
        assert!(matches!(table.try_get(440.0), Err(WavetableError::NotPopulated)));
    }

    #[test]
    fn test_new_rejects_zero_buffer() {
        assert!(WaveTable::new(0).is_err());
    }

    #[test]
    #[should_panic(expected = "before the first insert")]
    fn test_get_uninitialized_panics() {
        let table = WaveTable::new(64).unwrap();
        let _ = table.get(440.0);
    }

    #[test]
    fn test_insert_populates() {
        let table = populated(&[110.0, 220.0, 440.0], &[0.0]);
        assert!(table.is_populated());
        assert_eq!(table.freqs(), &[110.0, 220.0, 440.0]);
        assert_eq!(table.semantics(), &[0.0]);
        assert_eq!(table.data().shape(), Shape3::new([BUFFER, 3, 1]));
        assert_eq!(table.remaining_semantic_capacity(), 127);
    }

    #[test]
    fn test_clear() {
        let mut table = populated(&[110.0], &[0.0]);
        table.clear();
        assert_eq!(table.state(), TableState::Uninitialized);
        assert!(table.try_get(110.0).is_err());
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    #[test]
    fn test_get_exact_row() {
        let table = populated(&[110.0, 220.0, 440.0], &[0.0]);
        let slice = table.get(220.0);
        assert_eq!(slice.len(), BUFFER);
        for t in 0..BUFFER {
            assert_relative_eq!(slice[t], 100.0 + t as Sample / 10.0);
        }
    }

    #[test]
    fn test_nearest_row_by_ratio() {
        let table = populated(&[100.0, 200.0, 400.0], &[0.0]);
        // geometric midpoint of 100 and 200 is ~141.4
        assert_eq!(table.nearest_row(140.0), Some(0));
        assert_eq!(table.nearest_row(142.0), Some(1));
        assert_eq!(table.nearest_row(150.0), Some(1));
        assert_eq!(table.nearest_row(201.0), Some(1));
        assert_eq!(table.nearest_row(399.0), Some(2));
    }

    #[test]
    fn test_nearest_row_tie_goes_low() {
        let table = populated(&[100.0, 400.0], &[0.0]);
        assert_eq!(table.nearest_row(200.0), Some(0));
    }

    #[test]
    fn test_nearest_row_clamps() {
        let table = populated(&[110.0, 220.0, 440.0], &[0.0]);
        assert_eq!(table.nearest_row(1.0), Some(0));
        assert_eq!(table.nearest_row(20_000.0), Some(2));
        assert_eq!(table.nearest_row(Sample::INFINITY), Some(2));
        assert_eq!(table.nearest_row(0.0), Some(0));
        assert_eq!(table.nearest_row(-50.0), Some(0));
        assert_eq!(table.nearest_row(Sample::NAN), Some(0));
    }

    #[test]
    fn test_get_semantic() {
        let table = populated(&[110.0, 220.0], &[0.0, 5.0, 9.0]);
        assert_eq!(table.nearest_semantic(4.0), Some(1));
        assert_eq!(table.nearest_semantic(100.0), Some(2));
        assert_eq!(table.nearest_semantic(Sample::NAN), Some(0));

        let slice = table.get_semantic(220.0, 8.0);
        assert_relative_eq!(slice[0], 100.0 + 2.0 * 10.0);
    }

    #[test]
    fn test_slice_out_of_range() {
        let table = populated(&[110.0], &[0.0]);
        assert!(matches!(
            table.slice(1, 0),
            Err(WavetableError::InvalidShape { .. })
        ));
    }

    // ------------------------------------------------------------------------
    // Insert with invalidate
    // ------------------------------------------------------------------------

    #[test]
    fn test_invalidate_replaces_and_returns_old_buffers() {
        let mut table = populated(&[110.0, 220.0, 440.0], &[0.0]);
        let stored_ptr = table.data().as_ptr();

        let mut data = patterned(3, &[0.0], 1000.0);
        let incoming_ptr = data.as_ptr();
        let mut freqs = vector(&[110.0, 220.0, 440.0]);
        let mut semantics = vector(&[0.0]);
        table.insert(&mut data, &mut freqs, &mut semantics, true).unwrap();

        assert_eq!(table.data().as_ptr(), incoming_ptr);
        assert_eq!(data.as_ptr(), stored_ptr);
        assert_relative_eq!(table.get(220.0)[0], 1100.0);
        assert_relative_eq!(data[[0, 1, 0]], 100.0);
    }

    #[test]
    fn test_invalidate_with_new_shape() {
        let mut table = populated(&[110.0, 220.0, 440.0], &[0.0]);
        let mut data = patterned(2, &[1.0, 2.0], 500.0);
        let mut freqs = vector(&[300.0, 600.0]);
        let mut semantics = vector(&[1.0, 2.0]);
        table.insert(&mut data, &mut freqs, &mut semantics, true).unwrap();

        assert_eq!(table.freqs(), &[300.0, 600.0]);
        assert_eq!(table.data().shape(), Shape3::new([BUFFER, 2, 2]));
        assert_relative_eq!(table.get(220.0)[0], 500.0);
        // previous tensors travel back to the producer
        assert_eq!(data.shape(), Shape3::new([BUFFER, 3, 1]));
        assert_eq!(freqs.as_slice(), &[110.0, 220.0, 440.0]);
    }

    #[test]
    fn test_first_insert_leaves_arguments_empty() {
        let mut table = WaveTable::new(BUFFER).unwrap();
        let mut data = patterned(1, &[0.0], 0.0);
        let mut freqs = vector(&[440.0]);
        let mut semantics = vector(&[0.0]);
        table.insert(&mut data, &mut freqs, &mut semantics, false).unwrap();

        assert!(table.is_populated());
        assert!(data.is_empty());
        assert!(freqs.is_empty());
        assert!(semantics.is_empty());
    }

    // ------------------------------------------------------------------------
    // Insert without invalidate
    // ------------------------------------------------------------------------

    #[test]
    fn test_append_keeps_existing_slices() {
        let mut table = populated(&[110.0, 220.0, 440.0], &[0.0]);
        let before = table.get(220.0).to_vec();

        let mut data = patterned(3, &[0.0, 7.0], 5000.0);
        let mut freqs = vector(&[110.0, 220.0, 440.0]);
        let mut semantics = vector(&[0.0, 7.0]);
        table.insert(&mut data, &mut freqs, &mut semantics, false).unwrap();

        assert_eq!(table.get(220.0).to_vec(), before);
        assert_eq!(table.semantics(), &[0.0, 7.0]);
        assert_eq!(table.data().shape(), Shape3::new([BUFFER, 3, 2]));

        // the added slot carries the incoming slot-1 content
        let added = table.get_semantic(440.0, 7.0);
        assert_relative_eq!(added[0], 5000.0 + 200.0 + 10.0);
        assert_relative_eq!(added[BUFFER - 1], 5000.0 + 200.0 + 10.0 + 0.7);

        // arguments untouched
        assert!(!data.is_empty());
        assert_eq!(semantics.as_slice(), &[0.0, 7.0]);
    }

    #[test]
    fn test_append_nothing_new_is_noop() {
        let mut table = populated(&[110.0], &[3.0]);
        let ptr = table.data().as_ptr();
        let mut data = patterned(1, &[3.0], 42.0);
        table
            .insert(&mut data, &mut vector(&[110.0]), &mut vector(&[3.0]), false)
            .unwrap();
        assert_eq!(table.data().as_ptr(), ptr);
        assert_relative_eq!(table.get(110.0)[0], 0.0);
    }

    #[test]
    fn test_append_requires_same_rows() {
        let mut table = populated(&[110.0, 220.0], &[0.0]);
        let mut data = patterned(2, &[1.0], 0.0);
        let err = table
            .insert(&mut data, &mut vector(&[110.0, 230.0]), &mut vector(&[1.0]), false)
            .unwrap_err();
        assert!(matches!(err, WavetableError::FrequencyMismatch));
        assert_eq!(table.semantics(), &[0.0]);
    }

    #[test]
    fn test_append_capacity() {
        let config = WaveTableConfig::new(BUFFER).with_max_semantics(2);
        let mut table = WaveTable::with_config(config).unwrap();
        let mut data = patterned(1, &[0.0, 1.0], 0.0);
        table
            .insert(&mut data, &mut vector(&[110.0]), &mut vector(&[0.0, 1.0]), true)
            .unwrap();
        assert_eq!(table.remaining_semantic_capacity(), 0);

        let mut data = patterned(1, &[2.0], 0.0);
        let err = table
            .insert(&mut data, &mut vector(&[110.0]), &mut vector(&[2.0]), false)
            .unwrap_err();
        assert!(matches!(err, WavetableError::CapacityExceeded { .. }));
        assert_eq!(table.num_semantics(), 2);
    }

    #[test]
    fn test_append_allocation_failure_leaves_table() {
        let budget = Arc::new(BudgetAllocator::new(64));
        let mut table =
            WaveTable::with_allocator(WaveTableConfig::new(BUFFER), budget.clone()).unwrap();
        let mut data = patterned(2, &[0.0], 0.0);
        table
            .insert(&mut data, &mut vector(&[110.0, 220.0]), &mut vector(&[0.0]), true)
            .unwrap();

        // merged cube needs 8 * 2 * 3 * 4 bytes, more than the budget
        let mut data = patterned(2, &[1.0, 2.0], 0.0);
        let err = table
            .insert(&mut data, &mut vector(&[110.0, 220.0]), &mut vector(&[1.0, 2.0]), false)
            .unwrap_err();
        assert_eq!(err.error_code(), "OUT_OF_MEMORY");
        assert_eq!(table.num_semantics(), 1);
        assert_eq!(budget.bytes_in_use(), 0);
    }

    // ------------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------------

    #[test]
    fn test_rejects_inconsistent_shapes() {
        let mut table = populated(&[110.0, 220.0], &[0.0]);
        let ptr = table.data().as_ptr();

        let mut data = patterned(3, &[0.0], 0.0);
        let err = table
            .insert(&mut data, &mut vector(&[110.0, 220.0]), &mut vector(&[0.0]), true)
            .unwrap_err();
        assert!(matches!(err, WavetableError::ShapeMismatch { .. }));
        assert_eq!(table.data().as_ptr(), ptr);
    }

    #[test]
    fn test_rejects_wrong_buffer_size() {
        let mut table = WaveTable::new(BUFFER * 2).unwrap();
        let mut data = patterned(1, &[0.0], 0.0);
        assert!(table
            .insert(&mut data, &mut vector(&[110.0]), &mut vector(&[0.0]), true)
            .is_err());
        assert!(!table.is_populated());
    }

    #[test]
    fn test_rejects_bad_frequencies() {
        let mut table = WaveTable::new(BUFFER).unwrap();
        for freqs in [&[220.0, 110.0][..], &[110.0, 110.0], &[0.0, 110.0], &[110.0, Sample::NAN]] {
            let mut data = patterned(2, &[0.0], 0.0);
            let err = table
                .insert(&mut data, &mut vector(freqs), &mut vector(&[0.0]), true)
                .unwrap_err();
            assert_eq!(err.error_code(), "INVALID_FREQUENCIES", "{:?}", freqs);
        }
    }

    #[test]
    fn test_rejects_bad_semantics() {
        let mut table = WaveTable::new(BUFFER).unwrap();
        let mut data = patterned(1, &[0.0, 0.0], 0.0);
        let err = table
            .insert(&mut data, &mut vector(&[110.0]), &mut vector(&[1.0, 1.0]), true)
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SEMANTICS");
    }

    #[test]
    fn test_rejects_too_many_rows() {
        let config = WaveTableConfig::new(BUFFER).with_max_freqs(2);
        let mut table = WaveTable::with_config(config).unwrap();
        let mut data = patterned(3, &[0.0], 0.0);
        let err = table
            .insert(
                &mut data,
                &mut vector(&[110.0, 220.0, 440.0]),
                &mut vector(&[0.0]),
                true,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            WavetableError::CapacityExceeded { requested: 3, limit: 2, .. }
        ));
    }

    #[test]
    fn test_try_clone_is_independent() {
        let table = populated(&[110.0, 220.0], &[0.0]);
        let copy = table.try_clone().unwrap();
        assert_eq!(copy.freqs(), table.freqs());
        assert_ne!(copy.data().as_ptr(), table.data().as_ptr());
        assert_eq!(copy.get(220.0).to_vec(), table.get(220.0).to_vec());
    }
}
