use crate::barrier::Barrier;
use crate::config;
use crate::lamellae::{create_fabric, CommError, LocalComm, Tag};
use crate::Kernel;

use serde::de::DeserializeOwned;
use serde::Serialize;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The view one PE (processing element) has of a running computation.
///
/// Each PE runs on its own thread and owns its `CannonWorld`; PEs share no memory
/// and talk only through the message passing methods below.
pub struct CannonWorld {
    my_pe: usize,
    num_pes: usize,
    kernel: Kernel,
    comm: LocalComm,
    barrier: Barrier,
}

impl std::fmt::Debug for CannonWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CannonWorld")
            .field("my_pe", &self.my_pe)
            .field("num_pes", &self.num_pes)
            .field("kernel", &self.kernel)
            .finish()
    }
}

impl CannonWorld {
    fn new(comm: LocalComm, kernel: Kernel) -> CannonWorld {
        CannonWorld {
            my_pe: comm.my_pe(),
            num_pes: comm.num_pes(),
            kernel,
            comm,
            barrier: Barrier::new(),
        }
    }

    /// Returns the id of this PE (roughly equivalent to MPI Rank)
    pub fn my_pe(&self) -> usize {
        self.my_pe
    }

    /// Returns nummber of PE's in this execution
    pub fn num_pes(&self) -> usize {
        self.num_pes
    }

    /// The local block kernel selected for this world
    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    #[doc(hidden)]
    #[allow(non_snake_case)]
    pub fn MB_sent(&self) -> f64 {
        self.comm.bytes_sent() as f64 / 1_000_000.0
    }

    /// Block until every PE of the world has entered the barrier
    #[tracing::instrument(skip_all, fields(pe = self.my_pe))]
    pub fn barrier(&self) -> Result<(), CommError> {
        self.barrier.barrier(&self.comm)
    }

    /// Send `data` to `pe`, tagged with a user chosen `tag`
    pub fn send<T: Serialize + ?Sized>(&self, pe: usize, tag: u32, data: &T) -> Result<(), CommError> {
        self.comm.send(pe, Tag::User(tag), data)
    }

    /// Block until a message tagged `tag` arrives from `src`
    pub fn recv<T: DeserializeOwned>(&self, src: usize, tag: u32) -> Result<T, CommError> {
        self.comm.recv(src, Tag::User(tag))
    }

    /// Send `data` to `dst` and return what `src` sent us with the same tag
    pub fn exchange<T: Serialize + DeserializeOwned>(
        &self,
        data: &T,
        dst: usize,
        src: usize,
        tag: u32,
    ) -> Result<T, CommError> {
        self.comm.exchange(data, dst, src, Tag::User(tag))
    }

    /// `root` computes `value`, every PE returns the same value
    pub fn broadcast<T, F>(&self, root: usize, tag: u32, value: F) -> Result<T, CommError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        self.comm.broadcast(root, Tag::User(tag), value)
    }

    pub(crate) fn comm(&self) -> &LocalComm {
        &self.comm
    }

    /// Tear down the whole PE set, peers blocked in a receive return [CommError::Aborted]
    pub(crate) fn abort(&self) {
        tracing::error!(pe = self.my_pe, "aborting pe set");
        self.comm.abort();
    }
}

/// Errors raised while launching or joining the PE threads
#[derive(Debug)]
pub enum LaunchError {
    /// a world needs at least one PE
    NoPes,
    /// the OS refused to start a PE thread
    Spawn(std::io::Error),
    /// the PE panicked, aborting the rest of the PE set
    PeFailed { pe: usize, msg: String },
}

impl std::fmt::Display for LaunchError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LaunchError::NoPes => write!(f, "cannot launch a world with zero pes"),
            LaunchError::Spawn(err) => write!(f, "failed to spawn pe thread: {}", err),
            LaunchError::PeFailed { pe, msg } => write!(f, "pe {} failed: {}", pe, msg),
        }
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaunchError::Spawn(err) => Some(err),
            _ => None,
        }
    }
}

/// An implementation of the Builder design pattern, used to launch a set of PEs.
///
/// Defaults come from the `CANNON_` environment configuration.
///
/// # Examples
///
///```
/// use cannon::{CannonWorldBuilder, Kernel};
///
/// let pes = CannonWorldBuilder::new()
///                 .with_num_pes(4)
///                 .with_kernel(Kernel::Naive)
///                 .launch(|world| world.my_pe())
///                 .unwrap();
/// assert_eq!(pes, vec![0, 1, 2, 3]);
///```
#[derive(Debug, Clone)]
pub struct CannonWorldBuilder {
    num_pes: usize,
    kernel: Kernel,
}

impl Default for CannonWorldBuilder {
    fn default() -> Self {
        CannonWorldBuilder::new()
    }
}

impl CannonWorldBuilder {
    /// Construct a new world builder
    pub fn new() -> CannonWorldBuilder {
        CannonWorldBuilder {
            num_pes: config().num_pes,
            kernel: config().kernel,
        }
    }

    /// Specify the number of PEs
    pub fn with_num_pes(mut self, num_pes: usize) -> CannonWorldBuilder {
        self.num_pes = num_pes;
        self
    }

    /// Specify the local block kernel
    pub fn with_kernel(mut self, kernel: Kernel) -> CannonWorldBuilder {
        self.kernel = kernel;
        self
    }

    /// Run `f` once on every PE, each on its own thread, and return the per PE results in PE order.
    ///
    /// A panic on any PE aborts the rest of the set and is reported as [LaunchError::PeFailed].
    /// PEs that finish normally synchronize on a final barrier before their world is torn down.
    #[tracing::instrument(skip_all, fields(num_pes = self.num_pes))]
    pub fn launch<F, R>(self, f: F) -> Result<Vec<R>, LaunchError>
    where
        F: Fn(&CannonWorld) -> R + Sync,
        R: Send,
    {
        if self.num_pes == 0 {
            return Err(LaunchError::NoPes);
        }
        let abort = Arc::new(AtomicBool::new(false));
        let comms = create_fabric(self.num_pes, abort.clone());
        let kernel = self.kernel;
        let f = &f;
        tracing::debug!(?kernel, "launching pes");

        std::thread::scope(|s| {
            let mut handles = Vec::with_capacity(self.num_pes);
            let mut spawn_error = None;
            for comm in comms {
                let pe = comm.my_pe();
                let pe_abort = abort.clone();
                let spawned = std::thread::Builder::new()
                    .name(format!("cannon-pe-{}", pe))
                    .spawn_scoped(s, move || {
                        let world = CannonWorld::new(comm, kernel);
                        match panic::catch_unwind(AssertUnwindSafe(|| f(&world))) {
                            Ok(res) => {
                                if !pe_abort.load(Ordering::SeqCst) {
                                    if let Err(err) = world.barrier() {
                                        tracing::debug!(pe, %err, "final barrier interrupted");
                                    }
                                }
                                Ok(res)
                            }
                            Err(payload) => {
                                world.abort();
                                Err(panic_message(payload))
                            }
                        }
                    });
                match spawned {
                    Ok(handle) => handles.push((pe, handle)),
                    Err(err) => {
                        abort.store(true, Ordering::SeqCst);
                        spawn_error = Some(err);
                        break;
                    }
                }
            }

            let mut results = Vec::with_capacity(handles.len());
            let mut failure = None;
            for (pe, handle) in handles {
                match handle.join() {
                    Ok(Ok(res)) => results.push(res),
                    Ok(Err(msg)) => {
                        failure.get_or_insert(LaunchError::PeFailed { pe, msg });
                    }
                    Err(payload) => {
                        failure.get_or_insert(LaunchError::PeFailed {
                            pe,
                            msg: panic_message(payload),
                        });
                    }
                }
            }
            if let Some(err) = spawn_error {
                return Err(LaunchError::Spawn(err));
            }
            match failure {
                Some(err) => Err(err),
                None => Ok(results),
            }
        })
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
