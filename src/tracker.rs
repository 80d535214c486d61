use crate::{EdgeId, LaneId};
use smallvec::SmallVec;
use std::fmt;

/// Records the lanes a vehicle is currently on.
///
/// The tracker is driven purely by sensor contacts. Begin and end events for
/// overlapping lanes can arrive in any order within a step, so the set of
/// lanes is the state to rely on, not the sequence of transitions.
#[derive(Clone, Debug, Default)]
pub struct RoadTracker {
    /// The active lanes, in the order they were entered.
    lanes: SmallVec<[LaneId; 4]>,
}

impl RoadTracker {
    pub fn new() -> Self {
        Default::default()
    }

    /// Marks a lane as entered. Entering a lane already present changes nothing.
    pub fn entered(&mut self, lane: LaneId) {
        if !self.lanes.contains(&lane) {
            log::trace!("entered {lane}");
            self.lanes.push(lane);
        }
    }

    /// Marks a lane as exited. Exiting a lane that is not present changes nothing.
    pub fn exited(&mut self, lane: LaneId) {
        if let Some(idx) = self.lanes.iter().position(|l| *l == lane) {
            log::trace!("exited {lane}");
            self.lanes.remove(idx);
        }
    }

    /// Returns true if the lane is currently occupied.
    pub fn contains(&self, lane: LaneId) -> bool {
        self.lanes.contains(&lane)
    }

    /// Returns true if any lane of the edge is currently occupied.
    pub fn is_on_edge(&self, edge: EdgeId) -> bool {
        self.lanes.iter().any(|l| l.edge == edge)
    }

    /// The occupied lanes, in the order they were entered.
    pub fn lanes(&self) -> &[LaneId] {
        &self.lanes
    }

    /// The most recently entered lane that is still occupied.
    pub fn current(&self) -> Option<LaneId> {
        self.lanes.last().copied()
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}

impl fmt::Display for RoadTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.current() {
            Some(lane) => write!(f, "Road {} lane {}", lane.edge, lane.index),
            None => write!(f, "No current road"),
        }
    }
}
