use super::{CannonResult, GridPlacement, LocalBlocks};
use crate::lamellae::Tag;
use crate::CannonWorld;

/// Cannon's pre-skew: rotate A left by the PE's row and B up by its column.
///
/// Done as repeated single step exchanges, every PE of a row performs the same
/// number of A steps and every PE of a column the same number of B steps, so
/// each send has a matching receive.
pub(super) fn align(
    world: &CannonWorld,
    grid: &GridPlacement,
    blocks: &mut LocalBlocks,
) -> CannonResult<()> {
    let comm = world.comm();
    let n = grid.neighbors;
    for _ in 0..grid.me.row {
        blocks.a = comm.exchange(&blocks.a, n.left, n.right, Tag::SkewA)?;
    }
    for _ in 0..grid.me.col {
        blocks.b = comm.exchange(&blocks.b, n.up, n.down, Tag::SkewB)?;
    }
    tracing::trace!(
        a_steps = grid.me.row,
        b_steps = grid.me.col,
        "skew aligned"
    );
    Ok(())
}
