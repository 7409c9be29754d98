//! Borrowed rank-1 views into tensor storage

use std::iter::{Skip, StepBy, Take};
use std::ops::Index;
use std::slice;

/// Read-only strided rank-1 view
///
/// Produced by [`Tensor3::lane`](super::Tensor3) and returned by
/// [`WaveTable::get`](crate::wavetable::WaveTable::get). Creating or reading a
/// lane never allocates.
#[derive(Debug, Clone, Copy)]
pub struct Lane<'a, T> {
    data: &'a [T],
    start: usize,
    stride: usize,
    len: usize,
}

impl<'a, T> Lane<'a, T> {
    /// Build a view of `len` elements starting at `start`, `stride` apart
    ///
    /// # Panics
    /// Panics if the last element would fall outside `data`
    pub fn new(data: &'a [T], start: usize, stride: usize, len: usize) -> Self {
        let stride = stride.max(1);
        if len > 0 {
            let last = start + (len - 1) * stride;
            assert!(
                last < data.len(),
                "lane end {} outside buffer of {}",
                last,
                data.len()
            );
        }
        Self {
            data,
            start: if len == 0 { 0 } else { start },
            stride,
            len,
        }
    }

    /// Number of elements in the view
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Distance between consecutive elements in the underlying buffer
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// True when the elements are adjacent in memory
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.stride == 1 || self.len <= 1
    }

    /// Element at `i`, or `None` past the end
    #[inline]
    pub fn get(&self, i: usize) -> Option<&'a T> {
        if i < self.len {
            Some(&self.data[self.start + i * self.stride])
        } else {
            None
        }
    }

    /// The view as a plain slice, when the elements are adjacent
    pub fn as_slice(&self) -> Option<&'a [T]> {
        if self.is_contiguous() {
            Some(&self.data[self.start..self.start + self.len])
        } else {
            None
        }
    }

    pub fn iter(&self) -> Take<StepBy<Skip<slice::Iter<'a, T>>>> {
        self.data
            .iter()
            .skip(self.start)
            .step_by(self.stride)
            .take(self.len)
    }
}

impl<'a, T: Copy> Lane<'a, T> {
    /// Copy the view into a new vector
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().copied().collect()
    }

    /// Copy the view into `out`, returning how many samples were written
    ///
    /// Real-time callers use this with a preallocated buffer.
    pub fn copy_to(&self, out: &mut [T]) -> usize {
        let n = self.len.min(out.len());
        for (dst, src) in out.iter_mut().zip(self.iter()).take(n) {
            *dst = *src;
        }
        n
    }
}

impl<T> Index<usize> for Lane<'_, T> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        match self.get(i) {
            Some(v) => v,
            None => panic!("lane index {} out of range for length {}", i, self.len),
        }
    }
}

impl<'a, T> IntoIterator for Lane<'a, T> {
    type Item = &'a T;
    type IntoIter = Take<StepBy<Skip<slice::Iter<'a, T>>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: PartialEq> PartialEq<[T]> for Lane<'_, T> {
    fn eq(&self, other: &[T]) -> bool {
        self.len == other.len() && self.iter().zip(other).all(|(a, b)| a == b)
    }
}

// ============================================================================
// Tests
// ============================================================================
