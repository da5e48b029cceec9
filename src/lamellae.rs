pub(crate) mod local_lamellae;
pub(crate) use local_lamellae::{create_fabric, LocalComm};

/// Identifies which step of a computation a message belongs to.
///
/// Receives match on (source pe, tag), so two phases never consume each other's messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Tag {
    Verdict,
    ScatterA,
    ScatterB,
    SkewA,
    SkewB,
    ShiftA,
    ShiftB,
    Gather,
    Result,
    BarrierArrive,
    BarrierRelease,
    User(u32),
}

#[derive(Debug)]
pub(crate) struct Envelope {
    pub(crate) src: usize,
    pub(crate) tag: Tag,
    pub(crate) payload: Vec<u8>,
}

/// Errors raised by the message passing layer
#[derive(Debug)]
pub enum CommError {
    /// Another PE failed, the whole PE set is shutting down
    Aborted { pe: usize },
    /// The inbox of `peer` no longer exists
    Disconnected { pe: usize, peer: usize },
    /// `pe` is not part of the world
    InvalidPe { pe: usize, num_pes: usize },
    /// A payload could not be (de)serialized
    Codec(anyhow::Error),
}

impl std::fmt::Display for CommError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CommError::Aborted { pe } => {
                write!(f, "pe {} observed an abort of the pe set", pe)
            }
            CommError::Disconnected { pe, peer } => {
                write!(f, "pe {} lost its connection to pe {}", pe, peer)
            }
            CommError::InvalidPe { pe, num_pes } => {
                write!(f, "pe {} is not part of a world of {} pes", pe, num_pes)
            }
            CommError::Codec(err) => write!(f, "payload codec error: {}", err),
        }
    }
}

impl std::error::Error for CommError {}

pub(crate) type CommResult<T> = Result<T, CommError>;
