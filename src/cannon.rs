//! Cannon's algorithm on a `q` x `q` torus of PEs.
//!
//! Stages, in order: the coordinator validates and broadcasts its verdict,
//! scatters one block of A and B to every PE, every PE pre-skews its blocks
//! (A left by its row, B up by its column), the systolic loop runs `q`
//! multiply-accumulate steps with a one step rotation between them, and the
//! result blocks are gathered on the coordinator and broadcast back out.

mod collect;
mod distribute;
mod skew;
mod systolic;
mod validate;

pub use validate::{validate, Operand, Rejection};
pub(crate) use validate::check_operands;

use crate::cannon_world::{CannonWorldBuilder, LaunchError};
use crate::lamellae::CommError;
use crate::torus_arch::{GridCoord, IdError, Neighbors, TorusArch};
use crate::{BlockLayout, CannonWorld, Kernel, MatMulInput};

/// The PE that owns the full matrices before scatter and after gather
pub const COORDINATOR: usize = 0;

/// Errors returned by the distributed multiply
#[derive(Debug)]
pub enum CannonError {
    /// The problem is malformed or does not fit the number of PEs, observed identically on every PE
    Rejected(Rejection),
    /// A message could not be delivered, the PE set was aborted
    Comm(CommError),
    /// A PE id fell outside the torus
    Topology(IdError),
    /// The PE threads could not be run to completion
    Launch(LaunchError),
    /// `pe` finished with a different result than the coordinator
    Diverged { pe: usize },
}

impl std::fmt::Display for CannonError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CannonError::Rejected(reason) => write!(f, "rejected: {}", reason),
            CannonError::Comm(err) => write!(f, "communication failure: {}", err),
            CannonError::Topology(err) => write!(f, "topology error: {}", err),
            CannonError::Launch(err) => write!(f, "launch failure: {}", err),
            CannonError::Diverged { pe } => {
                write!(f, "pe {} disagrees with the coordinator's result", pe)
            }
        }
    }
}

impl std::error::Error for CannonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CannonError::Rejected(err) => Some(err),
            CannonError::Comm(err) => Some(err),
            CannonError::Topology(err) => Some(err),
            CannonError::Launch(err) => Some(err),
            CannonError::Diverged { .. } => None,
        }
    }
}

impl From<CommError> for CannonError {
    fn from(err: CommError) -> Self {
        CannonError::Comm(err)
    }
}

impl From<IdError> for CannonError {
    fn from(err: IdError) -> Self {
        CannonError::Topology(err)
    }
}

pub type CannonResult<T> = Result<T, CannonError>;

/// The three blocks a PE owns for the duration of one run
#[derive(Debug)]
pub(crate) struct LocalBlocks {
    pub(crate) a: Vec<f64>,
    pub(crate) b: Vec<f64>,
    pub(crate) c: Vec<f64>,
}

impl LocalBlocks {
    fn new(a: Vec<f64>, b: Vec<f64>, block_len: usize) -> LocalBlocks {
        assert_eq!(a.len(), block_len, "a block has the wrong shape");
        assert_eq!(b.len(), block_len, "b block has the wrong shape");
        LocalBlocks {
            a,
            b,
            c: vec![0.0; block_len],
        }
    }
}

/// Everything a PE derives from the grid once the problem has been accepted
#[derive(Debug, Clone, Copy)]
pub(crate) struct GridPlacement {
    pub(crate) torus: TorusArch,
    pub(crate) layout: BlockLayout,
    pub(crate) me: GridCoord,
    pub(crate) neighbors: Neighbors,
}

impl GridPlacement {
    fn new(world: &CannonWorld, n: usize) -> CannonResult<GridPlacement> {
        let torus = TorusArch::from_num_pes(world.num_pes()).ok_or(CannonError::Rejected(
            Rejection::NonSquareGrid {
                num_pes: world.num_pes(),
            },
        ))?;
        Ok(GridPlacement {
            torus,
            layout: BlockLayout::new(n, torus.side()),
            me: torus.coords(world.my_pe())?,
            neighbors: torus.neighbors(world.my_pe())?,
        })
    }
}

/// Multiply `input.a` by `input.b` across every PE of `world`; must be called on every PE.
///
/// Only the coordinator's `input` is read. On success every PE returns the full
/// row-major product. A rejected problem is reported as [CannonError::Rejected] on
/// every PE before any data moves; any later failure aborts the whole PE set.
#[tracing::instrument(skip_all, fields(pe = world.my_pe()))]
pub fn cannon_matmul(world: &CannonWorld, input: &MatMulInput) -> CannonResult<Vec<f64>> {
    let n = validate::agree(world, input)?;
    let res = run(world, input, n);
    if res.is_err() {
        world.abort();
    }
    res
}

fn run(world: &CannonWorld, input: &MatMulInput, n: usize) -> CannonResult<Vec<f64>> {
    let grid = GridPlacement::new(world, n)?;
    tracing::debug!(
        row = grid.me.row,
        col = grid.me.col,
        block_size = grid.layout.block_size(),
        "placed on torus"
    );
    let mut blocks = distribute::scatter(world, &grid, input)?;
    skew::align(world, &grid, &mut blocks)?;
    systolic::multiply(world, &grid, &mut blocks)?;
    collect::gather_and_broadcast(world, &grid, blocks.c)
}

/// Launch `num_pes` PEs, run [cannon_matmul] on each and return the product.
///
/// Every PE must observe the same outcome, otherwise [CannonError::Diverged] is returned.
#[tracing::instrument(skip_all, fields(num_pes = num_pes, n = input.n))]
pub fn distributed_matmul(
    num_pes: usize,
    kernel: Kernel,
    input: &MatMulInput,
) -> CannonResult<Vec<f64>> {
    let mut results = CannonWorldBuilder::new()
        .with_num_pes(num_pes)
        .with_kernel(kernel)
        .launch(|world| cannon_matmul(world, input))
        .map_err(CannonError::Launch)?
        .into_iter();
    let product = results
        .next()
        .ok_or(CannonError::Launch(LaunchError::NoPes))??;
    for (pe, res) in results.enumerate() {
        if res? != product {
            return Err(CannonError::Diverged { pe: pe + 1 });
        }
    }
    Ok(product)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks_after_loop(num_pes: usize, input: &MatMulInput) -> Vec<(GridCoord, LocalBlocks)> {
        CannonWorldBuilder::new()
            .with_num_pes(num_pes)
            .launch(|world| {
                let grid = GridPlacement::new(world, input.n).unwrap();
                let mut blocks = distribute::scatter(world, &grid, input).unwrap();
                skew::align(world, &grid, &mut blocks).unwrap();
                systolic::multiply(world, &grid, &mut blocks).unwrap();
                (grid.me, blocks)
            })
            .unwrap()
    }

    #[test]
    fn loop_leaves_operands_one_rotation_short() {
        let n = 6;
        let input = MatMulInput::new(
            n,
            (0..n * n).map(|x| x as f64).collect(),
            (0..n * n).map(|x| -(x as f64)).collect(),
        );
        let q = 3;
        let layout = BlockLayout::new(n, q);
        for (me, blocks) in blocks_after_loop(q * q, &input) {
            let k = (me.row + me.col + q - 1) % q;
            assert_eq!(layout.extract(&input.a, me.row, k), blocks.a, "{:?}", me);
            assert_eq!(layout.extract(&input.b, k, me.col), blocks.b, "{:?}", me);
        }
    }

    #[test]
    fn single_pe_keeps_its_blocks() {
        let input = MatMulInput::ramp(4, 2.0);
        let (me, blocks) = blocks_after_loop(1, &input).pop().unwrap();
        assert_eq!(GridCoord { row: 0, col: 0 }, me);
        assert_eq!(input.a, blocks.a);
        assert_eq!(input.b, blocks.b);
    }
}
