//! Tensor Storage Module
//!
//! Dense row-major buffers of rank 1, 2 and 3:
//! - Shape descriptors used as swap guards
//! - Owning tensors with O(1) take and swap
//! - The allocation hook every buffer is accounted through
//! - Borrowed strided views

mod alloc;
mod shape;
#[allow(clippy::module_inception)]
mod tensor;
mod view;

pub use alloc::{system_allocator, Allocator, BudgetAllocator, SystemAllocator, LOW_MEMORY_RATIO};
pub use shape::{Shape, Shape1, Shape2, Shape3};
pub use tensor::{Tensor, Tensor1, Tensor2, Tensor3};
pub use view::Lane;
