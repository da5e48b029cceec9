use super::{CannonResult, GridPlacement, COORDINATOR};
use crate::lamellae::Tag;
use crate::CannonWorld;

/// Reassemble C on the coordinator from every PE's block, then broadcast it so
/// every PE returns the full product.
pub(super) fn gather_and_broadcast(
    world: &CannonWorld,
    grid: &GridPlacement,
    c: Vec<f64>,
) -> CannonResult<Vec<f64>> {
    let comm = world.comm();
    let layout = &grid.layout;
    let full = if world.my_pe() == COORDINATOR {
        let mut full = vec![0.0; layout.n() * layout.n()];
        layout.place(&mut full, grid.me.row, grid.me.col, &c);
        for pe in (0..world.num_pes()).filter(|pe| *pe != COORDINATOR) {
            let block: Vec<f64> = comm.recv(pe, Tag::Gather)?;
            let coord = grid.torus.coords(pe)?;
            layout.place(&mut full, coord.row, coord.col, &block);
        }
        tracing::debug!("result gathered");
        Some(full)
    } else {
        comm.send(COORDINATOR, Tag::Gather, &c)?;
        None
    };
    let result = comm.broadcast(COORDINATOR, Tag::Result, || full.unwrap_or_default())?;
    Ok(result)
}
