/// An abstraction which represents the PEs that are associated with a group of the grid (a row, a column, or the whole torus)
pub trait TeamArch: Send + Sync {
    /// The number of  PEs in the team defined by this TeamArch
    fn num_pes(&self) -> usize;
    /// The id of the first (lowest numbered) PE in the team
    fn start_pe(&self) -> usize; //with respect to parent
    /// The id of the last (highest numbered) PE in the team
    fn end_pe(&self) -> usize; //with respect to parent
    /// Converts a team PE id into the id space of the parent (the world)
    ///
    /// Returns an error if the pe does not exist in the team
    fn parent_pe_id(&self, team_pe: &usize) -> ArchResult<usize>;
    /// Converts a parent PE id into the id space of the team specified by this TeamArch
    ///
    /// Returns an error if the pe does not exist in the team
    fn team_pe_id(&self, parent_pe: &usize) -> ArchResult<usize>;
}

/// An error that occurs when trying to access a PE that does not exist on a team
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdError {
    pub parent_pe: usize,
    pub team_pe: usize,
}

pub(crate) type ArchResult<T> = Result<T, IdError>;

impl std::fmt::Display for IdError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Invalid Id => parent_pe:{} team_pe => {}",
            self.parent_pe, self.team_pe
        )
    }
}

impl std::error::Error for IdError {}

/// A grouping of PE's using a "strided" pattern, a column of the torus is `StridedArch::new(col, q, q)`
///
/// # examples
///
///```
/// use cannon::{StridedArch, TeamArch};
///
/// let column = StridedArch::new(
///    1, // start pe
///    3, // stride
///    3, // num_pes in team
/// );
/// // the team will consist of the 3 pes => 1,4,7
/// assert_eq!(column.parent_pe_id(&2), Ok(7));
///```
#[derive(Copy, Clone, std::hash::Hash, Debug, PartialEq, Eq)]
pub struct StridedArch {
    pub(crate) num_pes: usize,
    pub(crate) start_pe: usize, //this is with respect to the parent arch
    pub(crate) end_pe: usize,   //this is with respect to the parent arch
    pub(crate) stride: usize,
}

impl StridedArch {
    /// Construct a new StridedArch using a starting PE, the stride length, and the number of PEs to include
    pub fn new(start_pe: usize, stride: usize, num_team_pes: usize) -> StridedArch {
        assert!(num_team_pes > 0, "a team needs at least one pe");
        assert!(stride > 0, "stride must be non zero");
        StridedArch {
            num_pes: num_team_pes,
            start_pe,
            end_pe: start_pe + (num_team_pes - 1) * stride,
            stride,
        }
    }
}

impl TeamArch for StridedArch {
    fn num_pes(&self) -> usize {
        self.num_pes
    }
    fn start_pe(&self) -> usize {
        self.start_pe
    }
    fn end_pe(&self) -> usize {
        self.end_pe
    }
    fn parent_pe_id(&self, team_pe: &usize) -> ArchResult<usize> {
        let parent_pe = self.start_pe + team_pe * self.stride;
        if *team_pe < self.num_pes {
            Ok(parent_pe)
        } else {
            Err(IdError {
                parent_pe,
                team_pe: *team_pe,
            })
        }
    }
    fn team_pe_id(&self, parent_pe: &usize) -> ArchResult<usize> {
        if *parent_pe >= self.start_pe
            && *parent_pe <= self.end_pe
            && (parent_pe - self.start_pe) % self.stride == 0
        {
            Ok((parent_pe - self.start_pe) / self.stride)
        } else {
            Err(IdError {
                parent_pe: *parent_pe,
                team_pe: 0,
            })
        }
    }
}

/// A grouping of PE's using a "block" pattern, a row of the torus is `BlockedArch::new(row * q, q)`
///
/// PEs in the group are contiguous with respect to their PE id.
///
/// # examples
///
///```
/// use cannon::{BlockedArch, TeamArch};
///
/// let row = BlockedArch::new(
///    4, //start pe
///    2, //num_pes in team
/// );
/// // the team will consist of the 2 pes => 4,5
/// assert_eq!(row.team_pe_id(&5), Ok(1));
///```
#[derive(Copy, Clone, std::hash::Hash, Debug, PartialEq, Eq)]
pub struct BlockedArch {
    pub(crate) num_pes: usize,
    pub(crate) start_pe: usize, //this is with respect to the parent arch (inclusive)
    pub(crate) end_pe: usize,   //this is with respect to the parent arch (inclusive)
}

impl BlockedArch {
    /// Construct a new BlockedArch using a starting PE and the number of PEs to include
    pub fn new(start_pe: usize, num_team_pes: usize) -> BlockedArch {
        assert!(num_team_pes > 0, "a team needs at least one pe");
        BlockedArch {
            num_pes: num_team_pes,
            start_pe,
            end_pe: start_pe + num_team_pes - 1,
        }
    }
}

impl TeamArch for BlockedArch {
    fn num_pes(&self) -> usize {
        self.num_pes
    }
    fn start_pe(&self) -> usize {
        self.start_pe
    }
    fn end_pe(&self) -> usize {
        self.end_pe
    }
    fn parent_pe_id(&self, team_pe: &usize) -> ArchResult<usize> {
        let parent_pe = self.start_pe + team_pe;
        if *team_pe < self.num_pes {
            Ok(parent_pe)
        } else {
            Err(IdError {
                parent_pe,
                team_pe: *team_pe,
            })
        }
    }
    fn team_pe_id(&self, parent_pe: &usize) -> ArchResult<usize> {
        if *parent_pe >= self.start_pe && *parent_pe <= self.end_pe {
            Ok(parent_pe - self.start_pe)
        } else {
            Err(IdError {
                parent_pe: *parent_pe,
                team_pe: 0,
            })
        }
    }
}

/// Grid coordinates of a PE, row-major unravel of its linear id
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GridCoord {
    pub row: usize,
    pub col: usize,
}

/// The four wraparound neighbours of a PE on the torus
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Neighbors {
    pub left: usize,
    pub right: usize,
    pub up: usize,
    pub down: usize,
}

/// A periodic `side` x `side` arrangement of `side * side` PEs.
///
/// PE `pe` sits at `(pe / side, pe % side)`. Rows are [BlockedArch] teams and
/// columns are [StridedArch] teams, neighbour lookups wrap around both.
///
/// # examples
///
///```
/// use cannon::TorusArch;
///
/// let torus = TorusArch::from_num_pes(9).unwrap();
/// let n = torus.neighbors(0).unwrap();
/// assert_eq!((n.left, n.right, n.up, n.down), (2, 1, 6, 3));
///```
#[derive(Copy, Clone, std::hash::Hash, Debug, PartialEq, Eq)]
pub struct TorusArch {
    side: usize,
}

impl TorusArch {
    pub fn new(side: usize) -> TorusArch {
        assert!(side > 0, "a torus needs at least one pe");
        TorusArch { side }
    }

    /// Build the torus for `num_pes` PEs, `None` unless `num_pes` is a non zero perfect square
    pub fn from_num_pes(num_pes: usize) -> Option<TorusArch> {
        let side = grid_side(num_pes);
        if side > 0 && side * side == num_pes {
            Some(TorusArch::new(side))
        } else {
            None
        }
    }

    /// q, the number of PEs along one dimension
    pub fn side(&self) -> usize {
        self.side
    }

    pub fn coords(&self, pe: usize) -> ArchResult<GridCoord> {
        if pe < self.num_pes() {
            Ok(GridCoord {
                row: pe / self.side,
                col: pe % self.side,
            })
        } else {
            Err(IdError {
                parent_pe: pe,
                team_pe: pe,
            })
        }
    }

    /// Inverse of [coords][TorusArch::coords], both coordinates wrap modulo the side
    pub fn pe_at(&self, row: usize, col: usize) -> usize {
        (row % self.side) * self.side + (col % self.side)
    }

    pub fn row_team(&self, row: usize) -> BlockedArch {
        BlockedArch::new((row % self.side) * self.side, self.side)
    }

    pub fn col_team(&self, col: usize) -> StridedArch {
        StridedArch::new(col % self.side, self.side, self.side)
    }

    pub fn neighbors(&self, pe: usize) -> ArchResult<Neighbors> {
        let GridCoord { row, col } = self.coords(pe)?;
        let q = self.side;
        let row_team = self.row_team(row);
        let col_team = self.col_team(col);
        Ok(Neighbors {
            left: row_team.parent_pe_id(&((col + q - 1) % q))?,
            right: row_team.parent_pe_id(&((col + 1) % q))?,
            up: col_team.parent_pe_id(&((row + q - 1) % q))?,
            down: col_team.parent_pe_id(&((row + 1) % q))?,
        })
    }
}

impl TeamArch for TorusArch {
    fn num_pes(&self) -> usize {
        self.side * self.side
    }
    fn start_pe(&self) -> usize {
        0
    }
    fn end_pe(&self) -> usize {
        self.num_pes() - 1
    }
    fn parent_pe_id(&self, team_pe: &usize) -> ArchResult<usize> {
        if *team_pe < self.num_pes() {
            Ok(*team_pe)
        } else {
            Err(IdError {
                parent_pe: *team_pe,
                team_pe: *team_pe,
            })
        }
    }
    fn team_pe_id(&self, parent_pe: &usize) -> ArchResult<usize> {
        self.parent_pe_id(parent_pe)
    }
}

/// floor(sqrt(num_pes))
pub(crate) fn grid_side(num_pes: usize) -> usize {
    let mut side = (num_pes as f64).sqrt() as usize;
    while side * side > num_pes {
        side -= 1;
    }
    while (side + 1) * (side + 1) <= num_pes {
        side += 1;
    }
    side
}
