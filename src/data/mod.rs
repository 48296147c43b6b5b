//! Data module: storage buffers and the dense per-level field
#![warn(missing_docs)]

pub mod rect_field;
pub mod storage;

pub use rect_field::{Extent3, Index3, Offset3, RectField};
pub use storage::{Storage, VecStorage};

/// Alias for the common Vec-backed field.
pub type CpuField<T> = RectField<T, VecStorage<T>>;
