//! Cannon is a dense matrix multiply distributed over a square torus of processing elements (PEs).
//!
//! Each PE runs on its own thread and talks to the others only through messages,
//! the full matrices live on a single coordinator before the multiply and on every PE after it.
//!
//! A run goes through five stages:
//! validation on the coordinator, scatter of one block of A and B to every PE,
//! Cannon's pre-skew, `q` systolic multiply-accumulate steps, and a gather followed by a broadcast of C.
//!
//! EXAMPLES
//! --------
//!
//! # Launching a set of PEs and multiplying on all of them
//! ```
//! use cannon::{cannon_matmul, CannonWorldBuilder, MatMulInput};
//!
//! let input = MatMulInput::ramp(8, 1000.0);
//! let results = CannonWorldBuilder::new()
//!     .with_num_pes(4)
//!     .launch(|world| cannon_matmul(world, &input))
//!     .unwrap();
//! for c in results {
//!     assert_eq!(c.unwrap().len(), 64);
//! }
//! ```
//!
//! # Letting the crate launch the PEs
//! ```
//! use cannon::{distributed_matmul, serial_matmul, Kernel, MatMulInput};
//!
//! let input = MatMulInput::ramp(6, 10.0);
//! let c = distributed_matmul(9, Kernel::Matrixmultiply, &input).unwrap();
//! let reference = serial_matmul(&input).unwrap();
//! assert!(c.iter().zip(&reference).all(|(x, y)| (x - y).abs() < 1e-6));
//! ```
//!
//! The default PE count and kernel are read from `CANNON_` environment variables, see [Config].

#[macro_use]
extern crate lazy_static;

#[doc(hidden)]
pub extern crate serde;

#[doc(hidden)]
pub extern crate tracing;

pub(crate) mod barrier;
mod cannon;
pub use crate::cannon::{
    cannon_matmul, distributed_matmul, validate, CannonError, CannonResult, Operand, Rejection,
    COORDINATOR,
};

mod cannon_world;
pub use crate::cannon_world::{CannonWorld, CannonWorldBuilder, LaunchError};

mod env_var;
pub use env_var::{config, Config};

mod kernel;
pub use kernel::Kernel;

pub(crate) mod lamellae;
pub use lamellae::CommError;

mod matrix;
pub use matrix::{BlockLayout, MatMulInput};

mod serial;
pub use serial::serial_matmul;

mod torus_arch;
pub use torus_arch::{
    BlockedArch, GridCoord, IdError, Neighbors, StridedArch, TeamArch, TorusArch,
};

pub(crate) mod warnings;

use bincode::Options;

lazy_static! {
    pub(crate) static ref BINCODE: bincode::config::WithOtherTrailing<bincode::DefaultOptions, bincode::config::AllowTrailing> =
        bincode::DefaultOptions::new().allow_trailing_bytes();
}

#[doc(hidden)]
pub fn serialize<T: ?Sized>(obj: &T) -> Result<Vec<u8>, anyhow::Error>
where
    T: serde::Serialize,
{
    Ok(bincode::Options::serialize(*BINCODE, obj)?)
}

#[doc(hidden)]
pub fn deserialize<T>(bytes: &[u8]) -> Result<T, anyhow::Error>
where
    T: serde::de::DeserializeOwned,
{
    Ok(bincode::Options::deserialize(*BINCODE, bytes)?)
}
