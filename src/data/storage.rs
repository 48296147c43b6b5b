//! Pluggable storage for field buffers.
//!
//! A [`RectField`](crate::data::rect_field::RectField) owns exactly one
//! contiguous buffer. This trait abstracts how that buffer is held so a field
//! can be backed by something other than a `Vec` without touching the index
//! arithmetic. Buffers are never resized in place: a field with a new shape
//! gets a freshly allocated buffer and the old one is dropped.

use core::fmt::{self, Debug};

/// Contiguous, exclusively owned storage for `V` with slice access.
pub trait Storage<V>: Debug {
    /// Construct a buffer of `len`, filled with `fill`.
    fn with_len(len: usize, fill: V) -> Self
    where
        V: Clone;

    /// Current length in elements.
    fn len(&self) -> usize;

    /// True if the buffer holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entire read-only buffer.
    fn as_slice(&self) -> &[V];

    /// Entire mutable buffer.
    fn as_mut_slice(&mut self) -> &mut [V];

    /// Overwrite every element with `value`.
    fn fill(&mut self, value: V)
    where
        V: Clone,
    {
        self.as_mut_slice().fill(value);
    }
}

/// `Vec`-backed storage (default).
#[derive(Clone, PartialEq)]
pub struct VecStorage<V>(pub(crate) Vec<V>);

impl<V> Debug for VecStorage<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VecStorage")
            .field("len", &self.0.len())
            .finish()
    }
}

impl<V> Storage<V> for VecStorage<V> {
    fn with_len(len: usize, fill: V) -> Self
    where
        V: Clone,
    {
        Self(vec![fill; len])
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn as_slice(&self) -> &[V] {
        &self.0
    }

    fn as_mut_slice(&mut self) -> &mut [V] {
        &mut self.0
    }
}

impl<V> From<Vec<V>> for VecStorage<V> {
    fn from(v: Vec<V>) -> Self {
        Self(v)
    }
}

impl<V> VecStorage<V> {
    /// Consume the storage and return the underlying vector.
    pub fn into_inner(self) -> Vec<V> {
        self.0
    }
}
