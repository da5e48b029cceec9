use crate::cannon::check_operands;
use crate::{CannonError, CannonResult, MatMulInput};

/// Single threaded `a * b` by the direct triple loop.
///
/// Accepts any positive `n`, there is no grid to divide it over.
#[tracing::instrument(skip_all, fields(n = input.n))]
pub fn serial_matmul(input: &MatMulInput) -> CannonResult<Vec<f64>> {
    check_operands(input).map_err(CannonError::Rejected)?;
    let n = input.n;
    let mut c = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            let mut sum = 0.0;
            for k in 0..n {
                sum += input.a[i * n + k] * input.b[k * n + j];
            }
            c[i * n + j] = sum;
        }
    }
    Ok(c)
}
