use matrixmultiply::dgemm;
use serde::{Deserialize, Serialize};

/// The local block multiply used inside the systolic loop
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    /// plain i-k-j triple loop
    #[default]
    Naive,
    /// blocked dgemm provided by the matrixmultiply crate
    Matrixmultiply,
}

impl Kernel {
    /// `c += a * b` for row-major `block_size` x `block_size` blocks
    pub fn multiply_accumulate(&self, block_size: usize, a: &[f64], b: &[f64], c: &mut [f64]) {
        let len = block_size * block_size;
        assert_eq!(a.len(), len, "a block has the wrong shape");
        assert_eq!(b.len(), len, "b block has the wrong shape");
        assert_eq!(c.len(), len, "c block has the wrong shape");
        match self {
            Kernel::Naive => naive_mac(block_size, a, b, c),
            Kernel::Matrixmultiply => {
                let stride = block_size as isize;
                // lengths are checked above, beta = 1.0 accumulates into c
                unsafe {
                    dgemm(
                        block_size,
                        block_size,
                        block_size,
                        1.0,
                        a.as_ptr(),
                        stride,
                        1,
                        b.as_ptr(),
                        stride,
                        1,
                        1.0,
                        c.as_mut_ptr(),
                        stride,
                        1,
                    );
                }
            }
        }
    }
}

fn naive_mac(n: usize, a: &[f64], b: &[f64], c: &mut [f64]) {
    for i in 0..n {
        let c_row = &mut c[i * n..(i + 1) * n];
        for k in 0..n {
            let temp = a[i * n + k];
            let b_row = &b[k * n..(k + 1) * n];
            for (c_elem, b_elem) in c_row.iter_mut().zip(b_row) {
                *c_elem += temp * b_elem;
            }
        }
    }
}
