use crate::{EdgeId, LaneId};
use std::fmt;

/// Errors that can occur while building a road network and its sensors.
///
/// All of these are load-time failures: a simulation is never started
/// from a network that produced one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The road source contained no polylines, or none of them produced an edge.
    EmptyNetwork,
    /// An edge whose endpoints coincide, so it has no direction to build lanes along.
    DegenerateEdge { edge: EdgeId },
    /// A lane index at or beyond the edge's lane count.
    NoSuchLane { lane: LaneId, lanes: u8 },
    /// An edge id that is not part of the network.
    UnknownEdge(EdgeId),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::EmptyNetwork => write!(f, "empty road network"),
            BuildError::DegenerateEdge { edge } => {
                write!(f, "road {edge} has zero length and cannot carry lanes")
            }
            BuildError::NoSuchLane { lane, lanes } => {
                write!(f, "{lane} does not exist, the road only has {lanes} lanes")
            }
            BuildError::UnknownEdge(edge) => write!(f, "road {edge} is not in the network"),
        }
    }
}

impl std::error::Error for BuildError {}
