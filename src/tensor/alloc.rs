//! Allocation Hook
//!
//! Tensors never talk to the global allocator behind the host's back: every
//! buffer is accounted through an [`Allocator`] before it is reserved and
//! released through the same hook exactly once when it is dropped.

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use num_traits::Zero;
use tracing::warn;

use crate::error::{Result, WavetableError};

/// Fraction of a budget below which [`BudgetAllocator::is_low_memory`] trips
pub const LOW_MEMORY_RATIO: f64 = 0.05;

/// Pluggable accounting interface for tensor storage
///
/// `acquire` is called before a buffer of `bytes` is reserved and may refuse
/// it; `release` is called once when that buffer is dropped.
pub trait Allocator: Send + Sync + fmt::Debug {
    /// Account for a new buffer of `bytes` bytes
    fn acquire(&self, bytes: usize) -> Result<()>;

    /// Return `bytes` previously acquired
    fn release(&self, bytes: usize);

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Allocator with no accounting; the process heap is the only limit
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn acquire(&self, _bytes: usize) -> Result<()> {
        Ok(())
    }

    fn release(&self, _bytes: usize) {}

    fn name(&self) -> &'static str {
        "system"
    }
}

/// Shared handle to the process-wide [`SystemAllocator`]
pub fn system_allocator() -> Arc<dyn Allocator> {
    static SYSTEM: OnceLock<Arc<SystemAllocator>> = OnceLock::new();
    let system = SYSTEM.get_or_init(|| Arc::new(SystemAllocator));
    Arc::clone(system) as Arc<dyn Allocator>
}

/// Allocator that enforces a fixed byte budget
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use wavecache::tensor::{BudgetAllocator, Shape1, Tensor1};
///
/// let budget = Arc::new(BudgetAllocator::new(64));
/// let t = Tensor1::<f32>::new_in(Shape1::new([16]), budget.clone()).unwrap();
/// assert_eq!(budget.bytes_in_use(), 64);
/// assert!(Tensor1::<f32>::new_in(Shape1::new([1]), budget.clone()).is_err());
/// drop(t);
/// assert_eq!(budget.bytes_in_use(), 0);
/// ```
#[derive(Debug)]
pub struct BudgetAllocator {
    limit: usize,
    in_use: AtomicUsize,
    peak: AtomicUsize,
    live_buffers: AtomicUsize,
}

impl BudgetAllocator {
    /// Create an allocator that refuses to exceed `limit` bytes in use
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            in_use: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            live_buffers: AtomicUsize::new(0),
        }
    }

    /// Configured budget in bytes
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes currently held by live buffers
    pub fn bytes_in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    /// Highest value `bytes_in_use` has reached
    pub fn peak_bytes(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Number of buffers acquired and not yet released
    pub fn live_buffers(&self) -> usize {
        self.live_buffers.load(Ordering::Acquire)
    }

    /// True when less than [`LOW_MEMORY_RATIO`] of the budget remains
    pub fn is_low_memory(&self) -> bool {
        let free = self.limit.saturating_sub(self.bytes_in_use());
        (free as f64) < self.limit as f64 * LOW_MEMORY_RATIO
    }
}

impl Allocator for BudgetAllocator {
    fn acquire(&self, bytes: usize) -> Result<()> {
        let mut current = self.in_use.load(Ordering::Relaxed);
        loop {
            let next = match current.checked_add(bytes) {
                Some(next) if next <= self.limit => next,
                _ => {
                    warn!(
                        requested = bytes,
                        in_use = current,
                        limit = self.limit,
                        "allocation refused by budget"
                    );
                    return Err(WavetableError::OutOfMemory {
                        requested_bytes: bytes,
                        details: format!(
                            "budget of {} bytes exhausted ({} in use)",
                            self.limit, current
                        ),
                    });
                }
            };
            match self.in_use.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    self.peak.fetch_max(next, Ordering::AcqRel);
                    self.live_buffers.fetch_add(1, Ordering::AcqRel);
                    return Ok(());
                }
                Err(observed) => current = observed,
            }
        }
    }

    fn release(&self, bytes: usize) {
        let previous = self.in_use.fetch_sub(bytes, Ordering::AcqRel);
        debug_assert!(previous >= bytes, "released more bytes than acquired");
        self.live_buffers.fetch_sub(1, Ordering::AcqRel);
    }

    fn name(&self) -> &'static str {
        "budget"
    }
}

/// Byte size of `len` elements of `T`, or `None` on overflow
pub(crate) fn byte_len<T>(len: usize) -> Option<usize> {
    len.checked_mul(mem::size_of::<T>())
}

/// Reserve and zero-fill `len` elements through `allocator`
pub(crate) fn allocate_zeroed<T: Copy + Zero>(
    allocator: &dyn Allocator,
    len: usize,
) -> Result<Box<[T]>> {
    let bytes = byte_len::<T>(len).ok_or_else(|| WavetableError::OutOfMemory {
        requested_bytes: usize::MAX,
        details: format!("{} elements overflow the address space", len),
    })?;
    allocator.acquire(bytes)?;

    let mut values: Vec<T> = Vec::new();
    if let Err(e) = values.try_reserve_exact(len) {
        allocator.release(bytes);
        return Err(WavetableError::OutOfMemory {
            requested_bytes: bytes,
            details: e.to_string(),
        });
    }
    values.resize(len, T::zero());
    Ok(values.into_boxed_slice())
}

// ============================================================================
// Tests
// ============================================================================
