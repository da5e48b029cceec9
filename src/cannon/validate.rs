use super::{CannonError, CannonResult, COORDINATOR};
use crate::lamellae::Tag;
use crate::torus_arch::grid_side;
use crate::{CannonWorld, MatMulInput};

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    A,
    B,
}

/// Why a problem cannot be run with Cannon's algorithm on the current PEs
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// n must be positive
    ZeroDimension,
    /// n * n does not fit in a usize
    DimensionOverflow { n: usize },
    /// an operand does not hold n * n elements
    LengthMismatch {
        operand: Operand,
        expected: usize,
        actual: usize,
    },
    /// the number of PEs is not a perfect square
    NonSquareGrid { num_pes: usize },
    /// n is not divisible by the grid side q
    IndivisibleDimension { n: usize, q: usize },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Rejection::ZeroDimension => write!(f, "matrix dimension must be positive"),
            Rejection::DimensionOverflow { n } => {
                write!(f, "matrix dimension {} overflows the element count", n)
            }
            Rejection::LengthMismatch {
                operand,
                expected,
                actual,
            } => write!(
                f,
                "operand {:?} holds {} elements, expected {}",
                operand, actual, expected
            ),
            Rejection::NonSquareGrid { num_pes } => {
                write!(f, "{} pes cannot be arranged as a square grid", num_pes)
            }
            Rejection::IndivisibleDimension { n, q } => {
                write!(f, "dimension {} is not divisible by the grid side {}", n, q)
            }
        }
    }
}

impl std::error::Error for Rejection {}

/// The coordinator's decision, broadcast so that every PE takes the same branch
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
enum Verdict {
    Accept { n: usize },
    Reject(Rejection),
}

/// Checks the operand shapes only, the constraints shared with the serial multiply
pub(crate) fn check_operands(input: &MatMulInput) -> Result<(), Rejection> {
    if input.n == 0 {
        return Err(Rejection::ZeroDimension);
    }
    let expected = input
        .n
        .checked_mul(input.n)
        .ok_or(Rejection::DimensionOverflow { n: input.n })?;
    for (operand, data) in [(Operand::A, &input.a), (Operand::B, &input.b)] {
        if data.len() != expected {
            return Err(Rejection::LengthMismatch {
                operand,
                expected,
                actual: data.len(),
            });
        }
    }
    Ok(())
}

/// Accept iff n > 0, both operands hold n * n elements, `num_pes` is a perfect
/// square q * q and n is divisible by q. Side effect free.
pub fn validate(input: &MatMulInput, num_pes: usize) -> Result<(), Rejection> {
    check_operands(input)?;
    let q = grid_side(num_pes);
    if q == 0 || q * q != num_pes {
        return Err(Rejection::NonSquareGrid { num_pes });
    }
    if input.n % q != 0 {
        return Err(Rejection::IndivisibleDimension { n: input.n, q });
    }
    Ok(())
}

/// Validate on the coordinator and broadcast the verdict, returns n on every PE when accepted
pub(super) fn agree(world: &CannonWorld, input: &MatMulInput) -> CannonResult<usize> {
    let verdict = world.comm().broadcast(COORDINATOR, Tag::Verdict, || {
        match validate(input, world.num_pes()) {
            Ok(()) => Verdict::Accept { n: input.n },
            Err(reason) => Verdict::Reject(reason),
        }
    })?;
    tracing::debug!(?verdict, "validation verdict");
    match verdict {
        Verdict::Accept { n } => Ok(n),
        Verdict::Reject(reason) => Err(CannonError::Rejected(reason)),
    }
}
