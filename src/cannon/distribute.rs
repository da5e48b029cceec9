use super::{CannonResult, GridPlacement, LocalBlocks, COORDINATOR};
use crate::lamellae::Tag;
use crate::{CannonWorld, MatMulInput};

use itertools::iproduct;

/// Hand block (i, j) of A and B to the PE at grid coordinates (i, j).
///
/// The coordinator extracts every block with a strided copy and ships it point to
/// point; every other PE receives exactly one block of each operand.
pub(super) fn scatter(
    world: &CannonWorld,
    grid: &GridPlacement,
    input: &MatMulInput,
) -> CannonResult<LocalBlocks> {
    let comm = world.comm();
    let layout = &grid.layout;
    let (a, b) = if world.my_pe() == COORDINATOR {
        let q = grid.torus.side();
        for (row, col) in iproduct!(0..q, 0..q) {
            let pe = grid.torus.pe_at(row, col);
            if pe == COORDINATOR {
                continue;
            }
            comm.send(pe, Tag::ScatterA, &layout.extract(&input.a, row, col))?;
            comm.send(pe, Tag::ScatterB, &layout.extract(&input.b, row, col))?;
        }
        let me = grid.me;
        (
            layout.extract(&input.a, me.row, me.col),
            layout.extract(&input.b, me.row, me.col),
        )
    } else {
        let a: Vec<f64> = comm.recv(COORDINATOR, Tag::ScatterA)?;
        let b: Vec<f64> = comm.recv(COORDINATOR, Tag::ScatterB)?;
        (a, b)
    };
    tracing::trace!(row = grid.me.row, col = grid.me.col, "received blocks");
    Ok(LocalBlocks::new(a, b, layout.block_len()))
}
