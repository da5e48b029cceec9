use super::{CannonResult, GridPlacement, LocalBlocks};
use crate::lamellae::Tag;
use crate::CannonWorld;

/// q steps of `c += a * b`, each followed by a one step rotation of A to the left
/// and B upwards, except the last.
///
/// The skipped rotation would only restore the skewed layout. On return A and B are
/// left pre-rotated: PE (row, col) holds A block (row, row + col + q - 1) and
/// B block (row + col + q - 1, col), indices modulo q. Only `c` is read afterwards.
pub(super) fn multiply(
    world: &CannonWorld,
    grid: &GridPlacement,
    blocks: &mut LocalBlocks,
) -> CannonResult<()> {
    let comm = world.comm();
    let kernel = world.kernel();
    let q = grid.torus.side();
    let bs = grid.layout.block_size();
    let n = grid.neighbors;
    for step in 0..q {
        kernel.multiply_accumulate(bs, &blocks.a, &blocks.b, &mut blocks.c);
        tracing::trace!(step, "multiply-accumulate");
        if step + 1 == q {
            break;
        }
        blocks.a = comm.exchange(&blocks.a, n.left, n.right, Tag::ShiftA)?;
        blocks.b = comm.exchange(&blocks.b, n.up, n.down, Tag::ShiftB)?;
    }
    Ok(())
}
