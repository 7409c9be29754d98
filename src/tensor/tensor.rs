//! Owning Tensor Container
//!
//! One implementation serves ranks 1, 2 and 3. A tensor owns exactly one flat
//! buffer laid out row-major; moving the buffer between tensors or swapping
//! two same-shaped tensors never touches the elements.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

use num_traits::Zero;

use super::alloc::{allocate_zeroed, byte_len, system_allocator, Allocator};
use super::shape::Shape;
use super::view::Lane;
use crate::error::{Result, WavetableError};

/// Owned buffer handle
///
/// `data` is `None` once the buffer has been taken; dropping an empty handle
/// releases nothing.
struct Storage<T> {
    data: Option<Box<[T]>>,
    allocator: Arc<dyn Allocator>,
}

impl<T> Storage<T> {
    fn empty(allocator: Arc<dyn Allocator>) -> Self {
        Self {
            data: None,
            allocator,
        }
    }

    fn take(&mut self) -> Self {
        Self {
            data: self.data.take(),
            allocator: Arc::clone(&self.allocator),
        }
    }
}

impl<T> Drop for Storage<T> {
    fn drop(&mut self) {
        if let Some(data) = self.data.take() {
            if let Some(bytes) = byte_len::<T>(data.len()) {
                self.allocator.release(bytes);
            }
        }
    }
}

/// Dense rank-`N` tensor with a single owned buffer
///
/// # Example
/// ```
/// use wavecache::tensor::{Shape2, Tensor2};
///
/// let mut a = Tensor2::<f32>::new(Shape2::new([2, 3])).unwrap();
/// let mut b = Tensor2::<f32>::new(Shape2::new([2, 3])).unwrap();
/// a[[1, 2]] = 5.0;
///
/// a.swap(&mut b);
/// assert_eq!(b[[1, 2]], 5.0);
/// assert_eq!(a[[1, 2]], 0.0);
/// ```
pub struct Tensor<const N: usize, T> {
    shape: Shape<N>,
    storage: Storage<T>,
}

/// Rank-1 tensor
pub type Tensor1<T> = Tensor<1, T>;
/// Rank-2 tensor
pub type Tensor2<T> = Tensor<2, T>;
/// Rank-3 tensor
pub type Tensor3<T> = Tensor<3, T>;

impl<const N: usize, T: Copy + Zero> Tensor<N, T> {
    /// Allocate a zero-filled tensor through the system allocator
    ///
    /// # Errors
    /// Returns `OutOfMemory` if the buffer cannot be reserved
    pub fn new(shape: Shape<N>) -> Result<Self> {
        Self::new_in(shape, system_allocator())
    }

    /// Allocate a zero-filled tensor through `allocator`
    ///
    /// # Errors
    /// Returns `OutOfMemory` if the allocator refuses the request or the
    /// buffer cannot be reserved
    pub fn new_in(shape: Shape<N>, allocator: Arc<dyn Allocator>) -> Result<Self> {
        let len = shape
            .checked_num_elements()
            .ok_or_else(|| WavetableError::InvalidShape {
                reason: format!("element count of {} overflows", shape),
            })?;
        let data = allocate_zeroed::<T>(allocator.as_ref(), len)?;
        Ok(Self {
            shape,
            storage: Storage {
                data: Some(data),
                allocator,
            },
        })
    }

    /// Adopt `values` as the buffer of a tensor with `shape`
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if `values.len()` differs from the shape's
    /// element count
    pub fn from_vec(shape: Shape<N>, values: Vec<T>) -> Result<Self> {
        Self::from_vec_in(shape, values, system_allocator())
    }

    /// Like [`from_vec`](Self::from_vec) with explicit accounting
    pub fn from_vec_in(
        shape: Shape<N>,
        values: Vec<T>,
        allocator: Arc<dyn Allocator>,
    ) -> Result<Self> {
        if shape.checked_num_elements() != Some(values.len()) {
            return Err(WavetableError::shape_mismatch(
                shape,
                format!("{} values", values.len()),
            ));
        }
        let bytes = byte_len::<T>(values.len()).unwrap_or(usize::MAX);
        allocator.acquire(bytes)?;
        Ok(Self {
            shape,
            storage: Storage {
                data: Some(values.into_boxed_slice()),
                allocator,
            },
        })
    }

    /// Deep copy through the same allocator
    ///
    /// A taken tensor clones to another taken tensor of the same shape.
    pub fn try_clone(&self) -> Result<Self> {
        let allocator = Arc::clone(&self.storage.allocator);
        match self.storage.data.as_deref() {
            Some(values) => {
                let mut copy = allocate_zeroed::<T>(allocator.as_ref(), values.len())?;
                copy.copy_from_slice(values);
                Ok(Self {
                    shape: self.shape,
                    storage: Storage {
                        data: Some(copy),
                        allocator,
                    },
                })
            }
            None => Ok(Self {
                shape: self.shape,
                storage: Storage::empty(allocator),
            }),
        }
    }

    /// Set every element to `value`
    pub fn fill(&mut self, value: T) {
        self.as_mut_slice().fill(value);
    }
}

impl<const N: usize, T> Tensor<N, T> {
    /// A tensor that owns no buffer
    ///
    /// Used as the placeholder state of containers that have not been
    /// populated yet.
    pub fn empty(shape: Shape<N>) -> Self {
        Self {
            shape,
            storage: Storage::empty(system_allocator()),
        }
    }

    /// Shape fixed at construction
    #[inline]
    pub fn shape(&self) -> Shape<N> {
        self.shape
    }

    /// Number of addressable elements; zero once the buffer is taken
    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// True when the tensor owns no buffer
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.data.is_none()
    }

    /// Allocator this tensor's buffer is accounted against
    pub fn allocator(&self) -> &Arc<dyn Allocator> {
        &self.storage.allocator
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.storage.data.as_deref().unwrap_or(&[])
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.storage.data.as_deref_mut().unwrap_or(&mut [])
    }

    /// Address of the owned buffer, null when empty
    ///
    /// Only meaningful as an identity: two tensors report the same pointer
    /// before and after a swap, just exchanged.
    pub fn as_ptr(&self) -> *const T {
        match self.storage.data.as_deref() {
            Some(values) => values.as_ptr(),
            None => std::ptr::null(),
        }
    }

    /// Element at `index`, `None` if out of range or the buffer was taken
    #[inline]
    pub fn get(&self, index: [usize; N]) -> Option<&T> {
        let offset = self.shape.offset(index)?;
        self.storage.data.as_deref()?.get(offset)
    }

    #[inline]
    pub fn get_mut(&mut self, index: [usize; N]) -> Option<&mut T> {
        let offset = self.shape.offset(index)?;
        self.storage.data.as_deref_mut()?.get_mut(offset)
    }

    /// Move the buffer out in O(1)
    ///
    /// `self` keeps its shape but is left empty: it reads as a zero-length
    /// slice and releases nothing when dropped.
    pub fn take(&mut self) -> Self {
        Self {
            shape: self.shape,
            storage: self.storage.take(),
        }
    }

    /// Exchange buffers with a tensor of identical shape in O(1)
    ///
    /// # Panics
    /// Panics if the shapes differ. Use [`try_swap`](Self::try_swap) where a
    /// mismatch is a data condition rather than a bug.
    pub fn swap(&mut self, other: &mut Self) {
        assert!(
            self.shape == other.shape,
            "shape mismatch in tensor swap: {} vs {}",
            self.shape,
            other.shape
        );
        std::mem::swap(&mut self.storage, &mut other.storage);
    }

    /// Checked variant of [`swap`](Self::swap)
    ///
    /// # Errors
    /// Returns `ShapeMismatch` without touching either tensor
    pub fn try_swap(&mut self, other: &mut Self) -> Result<()> {
        if self.shape != other.shape {
            return Err(WavetableError::shape_mismatch(self.shape, other.shape));
        }
        std::mem::swap(&mut self.storage, &mut other.storage);
        Ok(())
    }
}

impl<T> Tensor<2, T> {
    /// Contiguous row `i`
    pub fn row(&self, i: usize) -> Option<&[T]> {
        let [rows, cols] = *self.shape.dims();
        if i >= rows {
            return None;
        }
        self.storage.data.as_deref()?.get(i * cols..(i + 1) * cols)
    }

    pub fn row_mut(&mut self, i: usize) -> Option<&mut [T]> {
        let [rows, cols] = *self.shape.dims();
        if i >= rows {
            return None;
        }
        self.storage
            .data
            .as_deref_mut()?
            .get_mut(i * cols..(i + 1) * cols)
    }
}

impl<T> Tensor<3, T> {
    /// Strided view along the first axis at fixed `(·, j, k)`
    ///
    /// `None` if `j` or `k` is out of range or the buffer was taken.
    pub fn lane(&self, j: usize, k: usize) -> Option<Lane<'_, T>> {
        let [d0, d1, d2] = *self.shape.dims();
        if j >= d1 || k >= d2 {
            return None;
        }
        let data = self.storage.data.as_deref()?;
        Some(Lane::new(data, j * d2 + k, d1 * d2, d0))
    }

    /// Write `f(i)` into every slot `(i, j, k)` of the lane
    ///
    /// Returns `false` if `j` or `k` is out of range or the buffer was taken.
    pub fn fill_lane_with(&mut self, j: usize, k: usize, mut f: impl FnMut(usize) -> T) -> bool {
        let [d0, d1, d2] = *self.shape.dims();
        if j >= d1 || k >= d2 {
            return false;
        }
        let Some(data) = self.storage.data.as_deref_mut() else {
            return false;
        };
        let stride = d1 * d2;
        for i in 0..d0 {
            data[i * stride + j * d2 + k] = f(i);
        }
        true
    }
}

impl<const N: usize, T> Index<[usize; N]> for Tensor<N, T> {
    type Output = T;

    fn index(&self, index: [usize; N]) -> &T {
        match self.get(index) {
            Some(v) => v,
            None => panic!(
                "index {:?} out of range for tensor of shape {} (empty: {})",
                index,
                self.shape,
                self.is_empty()
            ),
        }
    }
}

impl<const N: usize, T> IndexMut<[usize; N]> for Tensor<N, T> {
    fn index_mut(&mut self, index: [usize; N]) -> &mut T {
        let shape = self.shape;
        let empty = self.is_empty();
        match self.get_mut(index) {
            Some(v) => v,
            None => panic!(
                "index {:?} out of range for tensor of shape {} (empty: {})",
                index, shape, empty
            ),
        }
    }
}

impl<const N: usize, T> fmt::Debug for Tensor<N, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("len", &self.len())
            .field("empty", &self.is_empty())
            .field("allocator", &self.storage.allocator.name())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
