//! SparsePackedBuffer: packed rows for a sparse subset of indices.
//!
//! Like [`PackedBuffer`](crate::storage::PackedBuffer), all payloads live in a
//! single `Vec<T>`, but rows exist only for the indices that were inserted. A
//! `BTreeMap` keyed by index records each row's `(offset, len)` span, so
//! iteration is in index order while the physical offsets follow insertion
//! order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::debug_invariants::DebugInvariants;
use crate::error::TopoMeshError;

/// Packed storage for a sparse set of rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparsePackedBuffer<T> {
    /// Row index -> (offset, len) into `values`.
    spans: BTreeMap<usize, (usize, usize)>,
    /// All row payloads; the spans tile `0..values.len()` exactly.
    values: Vec<T>,
}

impl<T> Default for SparsePackedBuffer<T> {
    fn default() -> Self {
        SparsePackedBuffer {
            spans: BTreeMap::new(),
            values: Vec::new(),
        }
    }
}

impl<T> SparsePackedBuffer<T> {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// `true` if no rows are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Total number of stored values across all rows.
    #[inline]
    pub fn total_len(&self) -> usize {
        self.values.len()
    }

    /// `true` if a row exists for `index`.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.spans.contains_key(&index)
    }

    /// Length of the row at `index`, or 0 if absent.
    #[inline]
    pub fn len_of(&self, index: usize) -> usize {
        self.spans.get(&index).map_or(0, |&(_, len)| len)
    }

    /// Read-only view of the row at `index`. Absent rows yield the empty slice.
    #[inline]
    pub fn get(&self, index: usize) -> &[T] {
        match self.spans.get(&index) {
            Some(&(offset, len)) => &self.values[offset..offset + len],
            None => &[],
        }
    }

    /// Mutable view of the row at `index`, if present.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut [T]> {
        match self.spans.get(&index) {
            Some(&(offset, len)) => Some(&mut self.values[offset..offset + len]),
            None => None,
        }
    }

    /// Insert or replace the row at `index`.
    ///
    /// New rows are appended at the end of the value array; replacing a row of
    /// a different length shifts all physically-trailing rows.
    pub fn insert(&mut self, index: usize, row: &[T])
    where
        T: Clone,
    {
        if self.spans.contains_key(&index) {
            self.resize_row_with(index, row.len(), || row[0].clone());
            let target = self.get_mut(index).unwrap();
            target.clone_from_slice(row);
        } else {
            self.spans.insert(index, (self.values.len(), row.len()));
            self.values.extend_from_slice(row);
        }
    }

    /// Append one value to the row at `index`, creating the row if absent.
    pub fn push_value(&mut self, index: usize, value: T)
    where
        T: Clone,
    {
        match self.spans.get(&index).copied() {
            Some((offset, len)) => {
                self.values.insert(offset + len, value);
                self.spans.insert(index, (offset, len + 1));
                self.shift_from(offset + len, index, 1);
            }
            None => self.insert(index, std::slice::from_ref(&value)),
        }
    }

    /// Resize the row at `index` to `new_len`, filling grown space with `fill`.
    /// Creates the row if absent. Physically-trailing rows are shifted.
    pub fn resize_row(&mut self, index: usize, new_len: usize, fill: T)
    where
        T: Clone,
    {
        self.resize_row_with(index, new_len, || fill.clone());
    }

    fn resize_row_with<F: FnMut() -> T>(&mut self, index: usize, new_len: usize, mut fill: F) {
        let (offset, old_len) = match self.spans.get(&index).copied() {
            Some(span) => span,
            None => {
                let offset = self.values.len();
                self.spans.insert(index, (offset, new_len));
                self.values.extend((0..new_len).map(|_| fill()));
                return;
            }
        };
        if new_len == old_len {
            return;
        }
        let end = offset + old_len;
        if new_len > old_len {
            let extra = new_len - old_len;
            self.values.splice(end..end, (0..extra).map(|_| fill()));
            self.shift_from(end, index, extra as isize);
        } else {
            let cut = old_len - new_len;
            self.values.drain(end - cut..end);
            self.shift_from(end, index, -(cut as isize));
        }
        self.spans.insert(index, (offset, new_len));
    }

    /// Shift every span whose data starts at or after `point`, except the row
    /// `modified` whose length change caused the shift. The exception matters
    /// for zero-length rows, which can share their start with another span.
    fn shift_from(&mut self, point: usize, modified: usize, delta: isize) {
        for (&i, span) in self.spans.iter_mut() {
            if i != modified && span.0 >= point {
                span.0 = (span.0 as isize + delta) as usize;
            }
        }
    }

    /// Iterate over `(index, row)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[T])> + '_ {
        self.spans
            .iter()
            .map(move |(&index, &(offset, len))| (index, &self.values[offset..offset + len]))
    }

    /// Iterate over the stored row indices in order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.spans.keys().copied()
    }

    /// Drop all rows and values.
    pub fn clear(&mut self) {
        self.spans.clear();
        self.values.clear();
    }
}

impl<T> DebugInvariants for SparsePackedBuffer<T> {
    fn debug_assert_invariants(&self) {
        crate::debug_assert_ok!(self.validate_invariants(), "SparsePackedBuffer");
    }

    fn validate_invariants(&self) -> Result<(), TopoMeshError> {
        let mut spans: Vec<(usize, usize)> = self.spans.values().copied().collect();
        spans.sort_unstable();
        let mut cursor = 0;
        for (i, &(offset, len)) in spans.iter().enumerate() {
            if offset != cursor {
                return Err(TopoMeshError::CorruptOffsets { index: i });
            }
            cursor += len;
        }
        if cursor != self.values.len() {
            return Err(TopoMeshError::RowCountMismatch {
                expected: cursor,
                found: self.values.len(),
            });
        }
        Ok(())
    }
}
