use serde::{Deserialize, Serialize};

/// The problem handed to every PE: an `n` x `n` product of two row-major matrices.
///
/// Only the coordinator's copy of `a` and `b` is read by the distributed multiply,
/// other PEs may pass empty vectors.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MatMulInput {
    pub n: usize,
    pub a: Vec<f64>,
    pub b: Vec<f64>,
}

impl MatMulInput {
    pub fn new(n: usize, a: Vec<f64>, b: Vec<f64>) -> MatMulInput {
        MatMulInput { n, a, b }
    }

    /// a[i] = up_to - i, b[i] = i * up_to / (n*n - 1), both flat row-major
    pub fn ramp(n: usize, up_to: f64) -> MatMulInput {
        let size = n * n;
        let denom = if size > 1 { (size - 1) as f64 } else { 1.0 };
        let a = (0..size).map(|i| up_to - i as f64).collect();
        let b = (0..size).map(|i| i as f64 * up_to / denom).collect();
        MatMulInput { n, a, b }
    }
}

/// Addressing of the `q` x `q` blocks of an `n` x `n` row-major matrix.
///
/// A block's rows are not contiguous in the full matrix, so moving a block in or
/// out walks `block_size` rows of `block_size` contiguous elements each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    n: usize,
    q: usize,
    block_size: usize,
}

impl BlockLayout {
    pub fn new(n: usize, q: usize) -> BlockLayout {
        assert!(q > 0 && n > 0, "empty block layout");
        assert_eq!(n % q, 0, "{} is not divisible by the grid side {}", n, q);
        BlockLayout {
            n,
            q,
            block_size: n / q,
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn side(&self) -> usize {
        self.q
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn block_len(&self) -> usize {
        self.block_size * self.block_size
    }

    /// flat index, in the full matrix, of the first element of each row of block (grid_row, grid_col)
    fn row_starts(&self, grid_row: usize, grid_col: usize) -> impl Iterator<Item = usize> {
        assert!(grid_row < self.q && grid_col < self.q, "block index out of range");
        let bs = self.block_size;
        let n = self.n;
        let top = grid_row * bs;
        let left = grid_col * bs;
        (0..bs).map(move |r| (top + r) * n + left)
    }

    /// Copy block (grid_row, grid_col) out of `full` into contiguous storage
    pub fn extract(&self, full: &[f64], grid_row: usize, grid_col: usize) -> Vec<f64> {
        assert_eq!(full.len(), self.n * self.n, "matrix has the wrong shape");
        let bs = self.block_size;
        let mut block = Vec::with_capacity(self.block_len());
        for start in self.row_starts(grid_row, grid_col) {
            block.extend_from_slice(&full[start..start + bs]);
        }
        block
    }

    /// Write a contiguous `block` into `full` at block (grid_row, grid_col)
    pub fn place(&self, full: &mut [f64], grid_row: usize, grid_col: usize, block: &[f64]) {
        assert_eq!(full.len(), self.n * self.n, "matrix has the wrong shape");
        assert_eq!(block.len(), self.block_len(), "block has the wrong shape");
        let bs = self.block_size;
        for (start, row) in self
            .row_starts(grid_row, grid_col)
            .zip(block.chunks_exact(bs))
        {
            full[start..start + bs].copy_from_slice(row);
        }
    }
}
