pub use cgmath;
pub use clock::FixedTimestep;
pub use contact::{ContactTag, TagPair, TaggedUserData};
pub use dispatch::{ContactPhase, SimEvent};
pub use error::BuildError;
pub use lane::{LaneId, LaneQuad, LANE_WIDTH};
pub use network::{EdgeId, NodeId, Polyline, RoadEdge, RoadNetwork, RoadNode, SpawnPoint};
pub use rapier2d_f64 as rapier;
pub use simulation::{Simulation, SimulationConfig};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use tracker::RoadTracker;
pub use util::Interval;
pub use vehicle::{EngineState, KeyState, Vehicle, VehicleAttributes, VehicleKey};

mod clock;
mod contact;
mod debug;
mod dispatch;
mod error;
mod lane;
pub mod math;
mod network;
pub mod physics;
mod simulation;
mod tracker;
mod util;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
