use crate::config;
use crate::lamellae::Tag;

pub(crate) enum RuntimeWarning {
    RecvTimeout {
        pe: usize,
        src: usize,
        tag: Tag,
        elapsed: f64,
        timeout: f64,
    },
}

impl RuntimeWarning {
    fn print_warning(&self) -> bool {
        match self {
            RuntimeWarning::RecvTimeout {
                elapsed, timeout, ..
            } => config().deadlock_warning.unwrap_or(true) && *elapsed > *timeout,
        }
    }

    pub(crate) fn print(self) {
        if self.print_warning() {
            match self {
                RuntimeWarning::RecvTimeout {
                    pe,
                    src,
                    tag,
                    elapsed,
                    timeout,
                } => {
                    tracing::warn!(
                        "[CANNON WARNING][pe {pe}] waited {elapsed:.1}s for a {tag:?} message from pe {src}. Potential deadlock detected.
                        Every exchange in the skew and systolic phases requires all PEs of the grid to participate.
                        A PE that left the computation early (or never entered it) will stall all of its neighbours.
                        The deadlock timeout can be set via the CANNON_DEADLOCK_TIMEOUT environment variable, the current timeout is {timeout} seconds.
                        Set CANNON_DEADLOCK_WARNING=false to disable this warning."
                    );
                }
            }
        }
    }
}
