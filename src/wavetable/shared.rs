//! Real-Time Publication
//!
//! One writer builds table updates off the audio thread; any number of
//! readers look slices up on it. Two table slots alternate: the writer only
//! ever mutates the slot that is not active, then publishes it with a single
//! atomic store. Readers register on the active slot before touching it, so
//! they see either the complete old table or the complete new one.
//!
//! Readers never allocate, lock, block or free memory. The writer may wait
//! (yielding) until the last reader has left the slot it wants to reuse.

use std::cell::UnsafeCell;
use std::hint;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::debug;

use super::config::WaveTableConfig;
use super::table::{Sample, WaveTable};
use crate::error::Result;
use crate::tensor::{system_allocator, Allocator, Tensor1, Tensor3};

/// Spins before the writer starts yielding to lingering readers
const SPIN_LIMIT: u32 = 64;

struct Slots {
    tables: [UnsafeCell<WaveTable>; 2],
    /// Index of the slot readers should use
    active: AtomicUsize,
    /// Readers registered on each slot
    readers: [AtomicUsize; 2],
    /// Publication number of the content in each slot
    generations: [AtomicU64; 2],
}

// SAFETY: the writer only creates `&mut` to the slot that is not `active` and
// has no registered readers; readers only create `&` to a slot after
// registering on it and confirming it is still active. All index and counter
// accesses are SeqCst, so a reader registering on a stale slot always sees
// the newer `active` value and backs off.
unsafe impl Sync for Slots {}

impl Slots {
    fn new(config: WaveTableConfig, allocator: Arc<dyn Allocator>) -> Result<Self> {
        Ok(Self {
            tables: [
                UnsafeCell::new(WaveTable::with_allocator(config, Arc::clone(&allocator))?),
                UnsafeCell::new(WaveTable::with_allocator(config, allocator)?),
            ],
            active: AtomicUsize::new(0),
            readers: [AtomicUsize::new(0), AtomicUsize::new(0)],
            generations: [AtomicU64::new(0), AtomicU64::new(0)],
        })
    }
}

/// Create a connected writer/reader pair around an uninitialized table
pub fn shared(config: WaveTableConfig) -> Result<(WaveTableWriter, WaveTableReader)> {
    let writer = WaveTableWriter::new(config)?;
    let reader = writer.reader();
    Ok((writer, reader))
}

/// The single mutating handle of a shared wavetable
///
/// Not `Clone`: there is exactly one writer per shared table.
pub struct WaveTableWriter {
    slots: Arc<Slots>,
}

impl WaveTableWriter {
    pub fn new(config: WaveTableConfig) -> Result<Self> {
        Self::with_allocator(config, system_allocator())
    }

    pub fn with_allocator(config: WaveTableConfig, allocator: Arc<dyn Allocator>) -> Result<Self> {
        Ok(Self {
            slots: Arc::new(Slots::new(config, allocator)?),
        })
    }

    /// A new reader attached to this table
    pub fn reader(&self) -> WaveTableReader {
        WaveTableReader {
            slots: Arc::clone(&self.slots),
        }
    }

    /// The table readers currently see
    pub fn current(&self) -> &WaveTable {
        let live = self.slots.active.load(Ordering::SeqCst);
        // SAFETY: only this writer changes `active` or mutates a slot, and both
        // need `&mut self`, so the live slot stays immutable for this borrow.
        unsafe { &*self.slots.tables[live].get() }
    }

    /// Number of tables published so far
    pub fn generation(&self) -> u64 {
        let live = self.slots.active.load(Ordering::SeqCst);
        self.slots.generations[live].load(Ordering::SeqCst)
    }

    /// Apply [`WaveTable::insert`] and publish the result atomically
    ///
    /// On error nothing is published and readers keep the previous table.
    pub fn insert(
        &mut self,
        data: &mut Tensor3<Sample>,
        freqs: &mut Tensor1<Sample>,
        semantics: &mut Tensor1<Sample>,
        invalidate: bool,
    ) -> Result<()> {
        let generation = self.generation() + 1;
        let (live, spare) = self.spare_slot();
        // SAFETY: `spare` is not active and has no registered readers.
        let staging = unsafe { &mut *self.slots.tables[spare].get() };
        // SAFETY: shared access to the live slot, alongside readers.
        let current = unsafe { &*self.slots.tables[live].get() };

        if !invalidate {
            // appends build on what readers see now, not on the stale spare
            *staging = current.try_clone()?;
        }
        staging.insert(data, freqs, semantics, invalidate)?;

        self.publish(spare, generation);
        Ok(())
    }

    /// Publish an uninitialized table
    pub fn clear(&mut self) {
        let generation = self.generation() + 1;
        let (_, spare) = self.spare_slot();
        // SAFETY: `spare` is not active and has no registered readers.
        let staging = unsafe { &mut *self.slots.tables[spare].get() };
        staging.clear();
        self.publish(spare, generation);
    }

    /// Wait until no reader holds the inactive slot and return
    /// `(live, spare)`
    fn spare_slot(&self) -> (usize, usize) {
        let live = self.slots.active.load(Ordering::SeqCst);
        let spare = 1 - live;
        let mut spins = 0u32;
        while self.slots.readers[spare].load(Ordering::SeqCst) != 0 {
            if spins < SPIN_LIMIT {
                hint::spin_loop();
                spins += 1;
            } else {
                thread::yield_now();
            }
        }
        (live, spare)
    }

    fn publish(&self, slot: usize, generation: u64) {
        self.slots.generations[slot].store(generation, Ordering::SeqCst);
        self.slots.active.store(slot, Ordering::SeqCst);
        debug!(slot, generation, "wavetable published");
    }
}

/// Real-time handle of a shared wavetable
#[derive(Clone)]
pub struct WaveTableReader {
    slots: Arc<Slots>,
}

impl WaveTableReader {
    /// Pin the current table for the lifetime of the guard
    ///
    /// Lock-free: retries only if a publication lands between loading the
    /// active index and registering on it.
    pub fn read(&self) -> ReadGuard<'_> {
        let slots = &*self.slots;
        loop {
            let slot = slots.active.load(Ordering::SeqCst);
            slots.readers[slot].fetch_add(1, Ordering::SeqCst);
            if slots.active.load(Ordering::SeqCst) == slot {
                return ReadGuard { slots, slot };
            }
            slots.readers[slot].fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Publication number of the table a fresh `read` would return
    pub fn generation(&self) -> u64 {
        self.read().generation()
    }
}

/// A pinned, immutable view of the published table
///
/// Holding a guard delays the writer's next update; drop it at the end of
/// each audio block.
pub struct ReadGuard<'a> {
    slots: &'a Slots,
    slot: usize,
}

impl ReadGuard<'_> {
    /// Publication number of the pinned table (0 before the first insert)
    pub fn generation(&self) -> u64 {
        self.slots.generations[self.slot].load(Ordering::SeqCst)
    }
}

impl Deref for ReadGuard<'_> {
    type Target = WaveTable;

    fn deref(&self) -> &WaveTable {
        // SAFETY: this guard is registered on `slot`, so the writer will not
        // mutate it until the guard is dropped.
        unsafe { &*self.slots.tables[self.slot].get() }
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.slots.readers[self.slot].fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Tests
// ============================================================================
