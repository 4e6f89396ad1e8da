//! PackedBuffer: dense per-index rows over one contiguous value array.
//!
//! A `PackedBuffer<T>` stores one variable-length row for every index in
//! `0..len()`, packed back to back in a single `Vec<T>` and addressed through
//! an offset array with `len() + 1` entries. Row `i` occupies
//! `values[offsets[i]..offsets[i + 1]]`.

use serde::{Deserialize, Serialize};

use crate::debug_invariants::DebugInvariants;
use crate::error::TopoMeshError;

/// Dense packed storage: one row per index, rows contiguous in `values`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedBuffer<T> {
    /// Row boundaries; `offsets[0] == 0` and `offsets` is monotone.
    offsets: Vec<usize>,
    /// All row payloads, back to back.
    values: Vec<T>,
}

impl<T> Default for PackedBuffer<T> {
    fn default() -> Self {
        PackedBuffer {
            offsets: vec![0],
            values: Vec::new(),
        }
    }
}

impl<T> PackedBuffer<T> {
    /// Create an empty buffer with no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer with `rows` empty rows.
    pub fn with_empty_rows(rows: usize) -> Self {
        PackedBuffer {
            offsets: vec![0; rows + 1],
            values: Vec::new(),
        }
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// `true` if the buffer holds no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of stored values across all rows.
    #[inline]
    pub fn total_len(&self) -> usize {
        self.values.len()
    }

    /// Length of row `index`, or 0 if the row does not exist.
    #[inline]
    pub fn len_of(&self, index: usize) -> usize {
        if index < self.len() {
            self.offsets[index + 1] - self.offsets[index]
        } else {
            0
        }
    }

    /// Read-only view of row `index`. Out-of-range indices yield the empty slice.
    #[inline]
    pub fn get(&self, index: usize) -> &[T] {
        if index < self.len() {
            &self.values[self.offsets[index]..self.offsets[index + 1]]
        } else {
            &[]
        }
    }

    /// Mutable view of row `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> &mut [T] {
        assert!(index < self.len(), "row index {index} out of range");
        &mut self.values[self.offsets[index]..self.offsets[index + 1]]
    }

    /// Append one row at the end, returning its index.
    pub fn push_row(&mut self, row: &[T]) -> usize
    where
        T: Clone,
    {
        self.values.extend_from_slice(row);
        self.offsets.push(self.values.len());
        self.len() - 1
    }

    /// Append one row of `len` copies of `fill`, returning its index.
    pub fn push_row_filled(&mut self, len: usize, fill: T) -> usize
    where
        T: Clone,
    {
        self.values.resize(self.values.len() + len, fill);
        self.offsets.push(self.values.len());
        self.len() - 1
    }

    /// Bulk-append rows. `row_lens` gives each new row's length and `values`
    /// holds their payloads back to back.
    ///
    /// Returns the index of the first appended row.
    ///
    /// # Errors
    /// Returns `RowCountMismatch` if `values` does not hold exactly
    /// `row_lens.iter().sum()` entries.
    pub fn try_push_rows(&mut self, row_lens: &[usize], values: &[T]) -> Result<usize, TopoMeshError>
    where
        T: Clone,
    {
        let expected: usize = row_lens.iter().sum();
        if values.len() != expected {
            return Err(TopoMeshError::RowCountMismatch {
                expected,
                found: values.len(),
            });
        }
        let first = self.len();
        self.values.extend_from_slice(values);
        self.offsets.reserve(row_lens.len());
        let mut end = self.offsets[first];
        for &len in row_lens {
            end += len;
            self.offsets.push(end);
        }
        Ok(first)
    }

    /// Resize row `index` to `new_len` in place, shifting all trailing rows.
    ///
    /// Grown rows keep their old prefix and gain copies of `fill`; shrunk rows
    /// are truncated. This is `O(total_len)` in the worst case and is meant
    /// for the occasional late materialization of a reserved row, not for hot
    /// loops.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn resize_row(&mut self, index: usize, new_len: usize, fill: T)
    where
        T: Clone,
    {
        assert!(index < self.len(), "row index {index} out of range");
        let old_len = self.len_of(index);
        if new_len == old_len {
            return;
        }
        let end = self.offsets[index + 1];
        if new_len > old_len {
            let extra = new_len - old_len;
            self.values
                .splice(end..end, std::iter::repeat(fill).take(extra));
            for off in &mut self.offsets[index + 1..] {
                *off += extra;
            }
        } else {
            let cut = old_len - new_len;
            self.values.drain(end - cut..end);
            for off in &mut self.offsets[index + 1..] {
                *off -= cut;
            }
        }
    }

    /// Release spare capacity in both backing arrays.
    pub fn shrink_to_fit(&mut self) {
        self.offsets.shrink_to_fit();
        self.values.shrink_to_fit();
    }

    /// Iterate over all rows in index order.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    /// Drop all rows and values.
    pub fn clear(&mut self) {
        self.offsets.clear();
        self.offsets.push(0);
        self.values.clear();
    }
}

impl<T> DebugInvariants for PackedBuffer<T> {
    fn debug_assert_invariants(&self) {
        crate::debug_assert_ok!(self.validate_invariants(), "PackedBuffer");
    }

    fn validate_invariants(&self) -> Result<(), TopoMeshError> {
        if self.offsets.is_empty() || self.offsets[0] != 0 {
            return Err(TopoMeshError::CorruptOffsets { index: 0 });
        }
        for i in 1..self.offsets.len() {
            if self.offsets[i] < self.offsets[i - 1] {
                return Err(TopoMeshError::CorruptOffsets { index: i });
            }
        }
        let last = *self.offsets.last().unwrap();
        if last != self.values.len() {
            return Err(TopoMeshError::RowCountMismatch {
                expected: last,
                found: self.values.len(),
            });
        }
        Ok(())
    }
}
