//! Shape Descriptors
//!
//! Fixed-rank extent tuples used as invariant guards before buffers are
//! exchanged between tensors.

use std::fmt;

/// Dimension extents of a rank-`N` tensor
///
/// Shapes are plain values: copied freely and compared element-wise.
///
/// # Example
/// ```
/// use wavecache::tensor::Shape3;
///
/// assert_eq!(Shape3::new([2, 3, 4]), Shape3::new([2, 3, 4]));
/// assert_ne!(Shape3::new([2, 3, 4]), Shape3::new([2, 3, 5]));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape<const N: usize> {
    dim: [usize; N],
}

/// Shape of a rank-1 tensor
pub type Shape1 = Shape<1>;
/// Shape of a rank-2 tensor
pub type Shape2 = Shape<2>;
/// Shape of a rank-3 tensor
pub type Shape3 = Shape<3>;

impl<const N: usize> Shape<N> {
    /// Create a shape from explicit extents
    pub const fn new(dim: [usize; N]) -> Self {
        Self { dim }
    }

    /// Borrow the extents
    #[inline]
    pub fn dims(&self) -> &[usize; N] {
        &self.dim
    }

    /// Extent of a single axis
    ///
    /// # Panics
    /// Panics if `axis >= N`
    #[inline]
    pub fn dim(&self, axis: usize) -> usize {
        self.dim[axis]
    }

    /// Number of axes
    #[inline]
    pub const fn rank(&self) -> usize {
        N
    }

    /// Total element count (product of all extents)
    #[inline]
    pub fn num_elements(&self) -> usize {
        self.dim.iter().product()
    }

    /// Same as [`num_elements`](Self::num_elements) but `None` on overflow
    pub fn checked_num_elements(&self) -> Option<usize> {
        self.dim
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Row-major strides: the last axis is contiguous
    pub fn strides(&self) -> [usize; N] {
        let mut strides = [1usize; N];
        let mut acc = 1usize;
        for axis in (0..N).rev() {
            strides[axis] = acc;
            acc *= self.dim[axis];
        }
        strides
    }

    /// Flat row-major offset of `index`, or `None` when any component is
    /// outside its extent
    #[inline]
    pub fn offset(&self, index: [usize; N]) -> Option<usize> {
        let mut offset = 0usize;
        for axis in 0..N {
            if index[axis] >= self.dim[axis] {
                return None;
            }
            offset = offset * self.dim[axis] + index[axis];
        }
        Some(offset)
    }
}

impl<const N: usize> From<[usize; N]> for Shape<N> {
    fn from(dim: [usize; N]) -> Self {
        Self::new(dim)
    }
}

impl<const N: usize> fmt::Display for Shape<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (axis, d) in self.dim.iter().enumerate() {
            if axis > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "}}")
    }
}

// ============================================================================
// Tests
// ============================================================================
