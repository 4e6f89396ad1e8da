//! BucketBuffer: one growable vector per row.
//!
//! The mutable staging shape for per-element lists that are still being
//! appended to in arbitrary order, before a one-way switch to
//! [`SparsePackedBuffer`](crate::storage::SparsePackedBuffer) freezes the
//! layout. Trades locality for O(1) amortized appends at any index.

use serde::{Deserialize, Serialize};

use crate::debug_invariants::DebugInvariants;
use crate::error::TopoMeshError;

/// Per-row vector storage, auto-growing to the highest touched index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketBuffer<T> {
    rows: Vec<Vec<T>>,
}

impl<T> BucketBuffer<T> {
    /// Create an empty buffer.
    pub fn new() -> Self {
        BucketBuffer { rows: Vec::new() }
    }

    /// Number of rows (one past the highest index ever touched).
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `true` if no row was ever touched.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Read-only view of row `index`. Untouched rows yield the empty slice.
    #[inline]
    pub fn get(&self, index: usize) -> &[T] {
        self.rows.get(index).map_or(&[], Vec::as_slice)
    }

    /// Append `value` to row `index`, growing the row table as needed.
    pub fn push_at(&mut self, index: usize, value: T) {
        if index >= self.rows.len() {
            self.rows.resize_with(index + 1, Vec::new);
        }
        self.rows[index].push(value);
    }

    /// Mutable access to row `index`, growing the row table as needed.
    pub fn row_mut(&mut self, index: usize) -> &mut Vec<T> {
        if index >= self.rows.len() {
            self.rows.resize_with(index + 1, Vec::new);
        }
        &mut self.rows[index]
    }

    /// Iterate over `(index, row)` pairs for all rows, empty ones included.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[T])> + '_ {
        self.rows.iter().enumerate().map(|(i, row)| (i, row.as_slice()))
    }

    /// Drop all rows.
    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

impl<T> DebugInvariants for BucketBuffer<T> {
    fn debug_assert_invariants(&self) {
        crate::debug_assert_ok!(self.validate_invariants(), "BucketBuffer");
    }

    fn validate_invariants(&self) -> Result<(), TopoMeshError> {
        // No packing to corrupt; every vector is independently valid.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_at_grows_table() {
        let mut b = BucketBuffer::new();
        b.push_at(3, 30);
        b.push_at(1, 10);
        b.push_at(3, 31);
        assert_eq!(b.len(), 4);
        assert_eq!(b.get(0), &[] as &[i32]);
        assert_eq!(b.get(1), &[10]);
        assert_eq!(b.get(3), &[30, 31]);
    }

    #[test]
    fn get_out_of_range_is_empty() {
        let b = BucketBuffer::<u8>::new();
        assert_eq!(b.get(42), &[] as &[u8]);
    }

    #[test]
    fn iter_covers_empty_rows() {
        let mut b = BucketBuffer::new();
        b.push_at(2, 5u8);
        let rows: Vec<(usize, &[u8])> = b.iter().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], (2, &[5u8][..]));
    }
}
