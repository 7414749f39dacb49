//! Sparse matrix representations for Hessian assembly.
//!
//! Two forms, one per assembly phase:
//! - [`TripletBuffer`] — append-only (row, col, value) list written
//!   while scattering element and constraint blocks. Never requires
//!   synchronization: writers only push.
//! - [`CsrMatrix`] — compressed sparse row form consumed by the inner
//!   solver. Built once per Newton iteration from the triplets via a
//!   sort + merge over (row, col); duplicates are summed.

use weft_types::Scalar;

use crate::Mat3;

/// Append-only triplet accumulation buffer.
///
/// All assembly routines *accumulate* into a caller-supplied buffer;
/// they never clear it.
#[derive(Debug, Clone, Default)]
pub struct TripletBuffer {
    entries: Vec<(usize, usize, Scalar)>,
}

impl TripletBuffer {
    /// Creates an empty buffer with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Appends a single entry.
    #[inline]
    pub fn push(&mut self, row: usize, col: usize, value: Scalar) {
        self.entries.push((row, col, value));
    }

    /// Appends a scalar onto the diagonal entry `(i, i)`.
    #[inline]
    pub fn push_diagonal(&mut self, i: usize, value: Scalar) {
        self.entries.push((i, i, value));
    }

    /// Scatters a 3×3 block at vertex pair `(vi, vj)`, i.e. into rows
    /// `3vi..3vi+3` and columns `3vj..3vj+3`. Entries below `tolerance`
    /// in magnitude are skipped.
    pub fn push_block3(&mut self, vi: usize, vj: usize, block: &Mat3, tolerance: Scalar) {
        let base_r = 3 * vi;
        let base_c = 3 * vj;
        for c in 0..3 {
            let col = block.col(c);
            for r in 0..3 {
                let value = col[r];
                if value.abs() < tolerance {
                    continue;
                }
                self.entries.push((base_r + r, base_c + c, value));
            }
        }
    }

    /// Appends every entry of `other`.
    pub fn extend_from(&mut self, other: &TripletBuffer) {
        self.entries.extend_from_slice(&other.entries);
    }

    /// Number of entries pushed so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been pushed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read access to the raw entries.
    pub fn entries(&self) -> &[(usize, usize, Scalar)] {
        &self.entries
    }

    /// Returns true if every value is finite.
    pub fn all_finite(&self) -> bool {
        self.entries.iter().all(|&(_, _, v)| v.is_finite())
    }
}

/// Compressed Sparse Row (CSR) matrix.
///
/// Column indices within each row are sorted ascending, which makes
/// diagonal lookup and block extraction a linear scan over the row.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    /// Matrix dimension (always square here).
    pub dim: usize,
    /// Row pointer array (length = dim + 1).
    pub row_ptr: Vec<usize>,
    /// Column indices of non-zero entries.
    pub col_idx: Vec<usize>,
    /// Non-zero values.
    pub values: Vec<Scalar>,
}

impl CsrMatrix {
    /// Builds a square CSR matrix from a triplet buffer.
    ///
    /// Entries are bucketed per row, sorted by column, and duplicates
    /// summed. The ordering makes compression deterministic regardless
    /// of the order assembly phases appended their triplets in.
    pub fn from_triplets(dim: usize, triplets: &TripletBuffer) -> Self {
        // Count entries per row, build provisional row pointers.
        let mut counts = vec![0usize; dim];
        for &(r, _, _) in &triplets.entries {
            counts[r] += 1;
        }
        let mut starts = vec![0usize; dim + 1];
        for i in 0..dim {
            starts[i + 1] = starts[i] + counts[i];
        }

        // Scatter into row buckets.
        let total = triplets.entries.len();
        let mut bucket_col = vec![0usize; total];
        let mut bucket_val = vec![0.0 as Scalar; total];
        let mut cursor = starts[..dim].to_vec();
        for &(r, c, v) in &triplets.entries {
            let pos = cursor[r];
            bucket_col[pos] = c;
            bucket_val[pos] = v;
            cursor[r] += 1;
        }

        // Sort each row by column and merge duplicates.
        let mut row_ptr = vec![0usize; dim + 1];
        let mut col_idx = Vec::with_capacity(total);
        let mut values = Vec::with_capacity(total);

        let mut order: Vec<usize> = Vec::new();
        for i in 0..dim {
            let lo = starts[i];
            let hi = starts[i + 1];
            order.clear();
            order.extend(lo..hi);
            order.sort_unstable_by_key(|&k| bucket_col[k]);

            for &k in &order {
                let c = bucket_col[k];
                let v = bucket_val[k];
                if let Some(&last) = col_idx.last() {
                    if col_idx.len() > row_ptr[i] && last == c {
                        *values.last_mut().unwrap() += v;
                        continue;
                    }
                }
                col_idx.push(c);
                values.push(v);
            }
            row_ptr[i + 1] = col_idx.len();
        }

        Self {
            dim,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Returns the number of stored non-zeros.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Matrix-vector product `out = A·x`.
    pub fn mul_vec(&self, x: &[Scalar], out: &mut [Scalar]) {
        debug_assert_eq!(x.len(), self.dim);
        debug_assert_eq!(out.len(), self.dim);
        for i in 0..self.dim {
            let mut acc = 0.0;
            for idx in self.row_ptr[i]..self.row_ptr[i + 1] {
                acc += self.values[idx] * x[self.col_idx[idx]];
            }
            out[i] = acc;
        }
    }

    /// Returns the diagonal entry `(i, i)`, zero if not stored.
    pub fn diagonal_entry(&self, i: usize) -> Scalar {
        for idx in self.row_ptr[i]..self.row_ptr[i + 1] {
            let c = self.col_idx[idx];
            if c == i {
                return self.values[idx];
            }
            if c > i {
                break;
            }
        }
        0.0
    }

    /// Copies the full diagonal into a vector.
    pub fn diagonal(&self) -> Vec<Scalar> {
        (0..self.dim).map(|i| self.diagonal_entry(i)).collect()
    }

    /// Extracts the 3×3 diagonal block for vertex `v` (rows and
    /// columns `3v..3v+3`). Missing entries read as zero.
    pub fn block3(&self, v: usize) -> Mat3 {
        let base = 3 * v;
        let mut cols = [[0.0; 3]; 3];
        for r in 0..3 {
            let row = base + r;
            for idx in self.row_ptr[row]..self.row_ptr[row + 1] {
                let c = self.col_idx[idx];
                if c < base {
                    continue;
                }
                if c >= base + 3 {
                    break;
                }
                cols[c - base][r] = self.values[idx];
            }
        }
        Mat3::from_cols_array_2d(&cols)
    }

    /// Returns true if every stored value is finite.
    pub fn all_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_triplets_sums_duplicates() {
        let mut t = TripletBuffer::default();
        t.push(0, 0, 1.0);
        t.push(0, 0, 2.0);
        t.push(1, 0, 4.0);
        let a = CsrMatrix::from_triplets(2, &t);
        assert_eq!(a.diagonal_entry(0), 3.0);
        assert_eq!(a.nnz(), 2);
    }

    #[test]
    fn from_triplets_sorts_columns() {
        let mut t = TripletBuffer::default();
        t.push(0, 2, 3.0);
        t.push(0, 0, 1.0);
        t.push(0, 1, 2.0);
        let a = CsrMatrix::from_triplets(3, &t);
        assert_eq!(a.col_idx, vec![0, 1, 2]);
        assert_eq!(a.values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn mul_vec_identity() {
        let mut t = TripletBuffer::default();
        for i in 0..3 {
            t.push_diagonal(i, 1.0);
        }
        let a = CsrMatrix::from_triplets(3, &t);
        let x = [1.0, 2.0, 3.0];
        let mut y = [0.0; 3];
        a.mul_vec(&x, &mut y);
        assert_eq!(y, x);
    }

    #[test]
    fn block3_reads_diagonal_block() {
        let mut t = TripletBuffer::default();
        let block = Mat3::from_cols_array_2d(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        t.push_block3(1, 1, &block, 0.0);
        let a = CsrMatrix::from_triplets(6, &t);
        let out = a.block3(1);
        assert_eq!(out, block);
        // Off-block vertex reads as zero.
        assert_eq!(a.block3(0), Mat3::ZERO);
    }
}
