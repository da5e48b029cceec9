use crate::lamellae::{CommResult, LocalComm, Tag};

use std::sync::atomic::{AtomicUsize, Ordering};

const ROOT: usize = 0;

/// A two phase (arrive at pe 0, then release) barrier over the message layer
pub(crate) struct Barrier {
    barrier_cnt: AtomicUsize,
}

impl Barrier {
    pub(crate) fn new() -> Barrier {
        Barrier {
            barrier_cnt: AtomicUsize::new(0),
        }
    }

    pub(crate) fn barrier(&self, comm: &LocalComm) -> CommResult<()> {
        let barrier_id = self.barrier_cnt.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(pe = comm.my_pe(), barrier_id, "enter barrier");
        if comm.num_pes() == 1 {
            return Ok(());
        }
        if comm.my_pe() == ROOT {
            for pe in 1..comm.num_pes() {
                let id: usize = comm.recv(pe, Tag::BarrierArrive)?;
                debug_assert_eq!(id, barrier_id, "pe {} entered a different barrier", pe);
            }
            for pe in 1..comm.num_pes() {
                comm.send(pe, Tag::BarrierRelease, &barrier_id)?;
            }
        } else {
            comm.send(ROOT, Tag::BarrierArrive, &barrier_id)?;
            let _: usize = comm.recv(ROOT, Tag::BarrierRelease)?;
        }
        tracing::trace!(pe = comm.my_pe(), barrier_id, "leave barrier");
        Ok(())
    }
}
