//! Shape representation and row-major flattening (specification §3, §4.8).

use gctx::error::fatal;

/// A global bound on tensor rank, per §3: "rank ≤ 10."
pub const MAX_DIMENSIONS: usize = 10;

/// An ordered sequence of positive dimension sizes.
///
/// Kept as a plain host-side vector; `NGrid` additionally maintains a
/// device-side copy (one `u32` per dimension) so kernels can read it
/// without a push-constant per axis.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Shape(Vec<u32>);

impl Shape {
    pub fn new(dims: impl Into<Vec<u32>>) -> Self {
        let dims = dims.into();
        if dims.len() > MAX_DIMENSIONS {
            fatal(format!(
                "shape rank {} exceeds MAX_DIMENSIONS ({MAX_DIMENSIONS})",
                dims.len()
            ));
        }
        if dims.iter().any(|&d| d == 0) {
            fatal("shape dimensions must be positive");
        }
        Self(dims)
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn dims(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.iter().map(|&d| d as usize).product()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Row-major strides: `strides[k] = ∏_{j>k} shape[j]`, per §3's
    /// flattening convention ("the last axis varies fastest").
    pub fn strides(&self) -> Vec<u32> {
        let rank = self.rank();
        let mut strides = vec![1u32; rank];
        for k in (0..rank.saturating_sub(1)).rev() {
            strides[k] = strides[k + 1] * self.0[k + 1];
        }
        strides
    }

    /// Maps a multi-index to its flat offset using this shape's strides.
    /// Fatal if any coordinate is out of range or the rank mismatches.
    pub fn flat_index(&self, multi_index: &[u32]) -> usize {
        if multi_index.len() != self.rank() {
            fatal("multi-index rank does not match shape rank");
        }
        let strides = self.strides();
        let mut offset = 0usize;
        for (i, (&coord, &dim)) in multi_index.iter().zip(self.0.iter()).enumerate() {
            if coord >= dim {
                fatal(format!("index {coord} out of bounds for axis {i} of size {dim}"));
            }
            offset += coord as usize * strides[i] as usize;
        }
        offset
    }

    /// Decomposes a flat index back into a multi-index, matching the
    /// divmod-from-the-last-axis convention kernels use (§4.7).
    pub fn multi_index(&self, mut flat: usize) -> Vec<u32> {
        let mut out = vec![0u32; self.rank()];
        for i in (0..self.rank()).rev() {
            let dim = self.0[i] as usize;
            out[i] = (flat % dim) as u32;
            flat /= dim;
        }
        out
    }
}

impl From<Vec<u32>> for Shape {
    fn from(dims: Vec<u32>) -> Self {
        Shape::new(dims)
    }
}

impl<const N: usize> From<[u32; N]> for Shape {
    fn from(dims: [u32; N]) -> Self {
        Shape::new(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_are_row_major() {
        let shape = Shape::new(vec![2, 3, 4]);
        assert_eq!(shape.strides(), vec![12, 4, 1]);
    }

    #[test]
    fn flat_index_round_trips_through_multi_index() {
        let shape = Shape::new(vec![2, 3, 4]);
        for flat in 0..shape.len() {
            let multi = shape.multi_index(flat);
            assert_eq!(shape.flat_index(&multi), flat);
        }
    }
}
