//! Matrix product, Hadamard product, LU decomposition with partial
//! pivoting, and inversion via triangular back/forward substitution
//! (specification §4.11's linear-algebra catalog, §9's LU pivot-search
//! resolution).

use gctx::error::fatal;
use ngrid_shaders::Kernel;

use crate::error::GridError;
use crate::exec;
use crate::grid::NGrid;
use crate::shape::Shape;

fn require_matrix(grid: &NGrid) -> (u32, u32) {
    if grid.rank() != 2 {
        fatal(format!("matrix operation requires rank 2, got rank {}", grid.rank()));
    }
    (grid.shape().dims()[0], grid.shape().dims()[1])
}

impl NGrid {
    /// `self (m×k) · other (k×n) -> (m×n)`.
    pub fn matmul(&self, other: &NGrid) -> NGrid {
        let (m, k) = require_matrix(self);
        let (k2, n) = require_matrix(other);
        if k != k2 {
            fatal(format!("matmul: inner dimensions disagree ({k} vs {k2})"));
        }
        let result = NGrid::new(Shape::new(vec![m, n]));
        let mut push = Vec::with_capacity(12);
        push.extend_from_slice(&m.to_le_bytes());
        push.extend_from_slice(&k.to_le_bytes());
        push.extend_from_slice(&n.to_le_bytes());
        exec::dispatch_2d(Kernel::Matmul, n, m, &[self.data_buf(), other.data_buf(), result.data_buf()], &push);
        result
    }

    /// Elementwise product, same shape required (the Hadamard product
    /// proper — elementwise division reuses [`NGrid::div`], which already
    /// implements the full broadcasting arithmetic catalog).
    pub fn hadamard(&self, other: &NGrid) -> NGrid {
        if self.shape() != other.shape() {
            fatal("hadamard: operand shapes must match exactly");
        }
        if self.len() == 0 {
            return NGrid::new(self.shape().clone());
        }
        let result = NGrid::new(self.shape().clone());
        let n = self.len() as u32;
        exec::dispatch_1d(
            Kernel::Hadamard,
            n,
            &[self.data_buf(), other.data_buf(), result.data_buf()],
            &n.to_le_bytes(),
        );
        result
    }

    /// Doolittle LU decomposition with partial pivoting: returns `(L, U,
    /// perm)` where `perm` is the row permutation applied during
    /// pivoting, such that `A[perm[i], :] == (L · U)[i, :]` — i.e. `P A =
    /// L U` with `P` the permutation matrix built from `perm`.
    pub fn lu(&self) -> (NGrid, NGrid, Vec<u32>) {
        let (rows, cols) = require_matrix(self);
        if rows != cols {
            fatal("lu: matrix must be square");
        }
        let n = rows;
        let (combined, perm) = lu_factorize(self, n);

        let raw = combined.to_vec();
        let mut l_host = vec![0.0f32; (n * n) as usize];
        let mut u_host = vec![0.0f32; (n * n) as usize];
        for row in 0..n {
            for col in 0..n {
                let idx = (row * n + col) as usize;
                if col < row {
                    l_host[idx] = raw[idx];
                } else if col == row {
                    l_host[idx] = 1.0;
                    u_host[idx] = raw[idx];
                } else {
                    u_host[idx] = raw[idx];
                }
            }
        }
        let l = NGrid::from_vec(l_host).reshape(Shape::new(vec![n, n]));
        let u = NGrid::from_vec(u_host).reshape(Shape::new(vec![n, n]));
        (l, u, perm)
    }

    /// Inverse via `A⁻¹ = U⁻¹ L⁻¹ P`. Only square matrices are supported
    /// (§9's open question on non-square pseudo-inverses is resolved as
    /// unsupported — see DESIGN.md).
    pub fn inverse(&self) -> Result<NGrid, GridError> {
        let (rows, cols) = require_matrix(self);
        if rows != cols {
            return Err(GridError::Unsupported);
        }
        let n = rows;
        let (combined, perm) = lu_factorize(self, n);

        let u_inv = invert_upper(&combined, n);
        let l_inv = invert_lower(&combined, n);
        let product = u_inv.matmul(&l_inv);

        // Right-multiplying by the permutation matrix P moves column j of
        // `product` to column `perm[j]` of the result.
        let source = product.to_vec();
        let mut out = vec![0.0f32; (n * n) as usize];
        for row in 0..n {
            for (j, &dest_col) in perm.iter().enumerate() {
                out[(row * n + dest_col) as usize] = source[(row * n + j as u32) as usize];
            }
        }
        Ok(NGrid::from_vec(out).reshape(Shape::new(vec![n, n])))
    }
}

/// Runs the elimination loop, returning the combined L/U storage buffer
/// (Doolittle in-place layout: strictly-lower entries are L's
/// multipliers, at-and-above-diagonal entries are U) plus the row
/// permutation recorded from each pivot step.
fn lu_factorize(source: &NGrid, n: u32) -> (NGrid, Vec<u32>) {
    let working = source.clone();
    let mut perm: Vec<u32> = (0..n).collect();

    for k in 0..n {
        let pivot_row = find_pivot(&working, n, k);
        if pivot_row != k {
            perm.swap(k as usize, pivot_row as usize);
        }
        swap_rows(&working, n, k, pivot_row);
        eliminate_column(&working, n, k);
    }
    (working, perm)
}

fn find_pivot(working: &NGrid, n: u32, k: u32) -> u32 {
    let pivot_buf = crate::grid::temp_u32_buffer(&[0u32]);
    let mut push = Vec::with_capacity(8);
    push.extend_from_slice(&n.to_le_bytes());
    push.extend_from_slice(&k.to_le_bytes());
    exec::dispatch_1d(Kernel::LuPivot, n, &[working.data_buf(), pivot_buf.raw_handle()], &push);
    pivot_buf.get(0)
}

fn swap_rows(working: &NGrid, n: u32, row_a: u32, pivot_row: u32) {
    if row_a == pivot_row {
        return;
    }
    let pivot_buf = crate::grid::temp_u32_buffer(&[pivot_row]);
    let mut push = Vec::with_capacity(8);
    push.extend_from_slice(&n.to_le_bytes());
    push.extend_from_slice(&row_a.to_le_bytes());
    exec::dispatch_1d(Kernel::LuSwap, n, &[working.data_buf(), pivot_buf.raw_handle()], &push);
}

fn eliminate_column(working: &NGrid, n: u32, k: u32) {
    let mut push = Vec::with_capacity(8);
    push.extend_from_slice(&n.to_le_bytes());
    push.extend_from_slice(&k.to_le_bytes());

    let below = n.saturating_sub(k + 1);
    if below > 0 {
        exec::dispatch_1d(Kernel::LuLcol, below, &[working.data_buf()], &push);
        exec::dispatch_2d(Kernel::LuUtrail, below, below, &[working.data_buf()], &push);
    }
}

fn invert_upper(combined: &NGrid, n: u32) -> NGrid {
    let result = NGrid::new(Shape::new(vec![n, n]));
    for row in (0..n).rev() {
        let mut push = Vec::with_capacity(8);
        push.extend_from_slice(&n.to_le_bytes());
        push.extend_from_slice(&row.to_le_bytes());
        exec::dispatch_1d(Kernel::TriInvUpper, n, &[combined.data_buf(), result.data_buf()], &push);
    }
    result
}

fn invert_lower(combined: &NGrid, n: u32) -> NGrid {
    let result = NGrid::new(Shape::new(vec![n, n]));
    for row in 0..n {
        let mut push = Vec::with_capacity(8);
        push.extend_from_slice(&n.to_le_bytes());
        push.extend_from_slice(&row.to_le_bytes());
        exec::dispatch_1d(Kernel::TriInvLower, n, &[combined.data_buf(), result.data_buf()], &push);
    }
    result
}
