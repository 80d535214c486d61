use crate::clock::{FixedTimestep, MAX_FRAME_TIME};
#[cfg(feature = "debug")]
use crate::debug::{debug_circle, debug_polygon, take_debug_frame};
use crate::dispatch::{dispatch, DispatchContext, SimEvent};
use crate::math::Point2d;
use crate::physics::PhysicsWorld;
use crate::vehicle::{KeyState, Vehicle, VehicleAttributes, VehicleKey};
use crate::{BuildError, Polyline, RoadNetwork, VehicleId, VehicleSet};
use rand::Rng;

/// The settings of a simulation.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationConfig {
    /// The number of fixed ticks per simulated second.
    pub ticks_per_second: u32,
    /// The longest frame the simulation catches up on, in s.
    pub max_frame_time: f64,
    /// Velocity solver iterations per physics step.
    pub velocity_iterations: usize,
    /// Position correction iterations per physics step.
    pub position_iterations: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 50,
            max_frame_time: MAX_FRAME_TIME,
            velocity_iterations: 8,
            position_iterations: 3,
        }
    }
}

/// A simulation of vehicles driving on a road network.
pub struct Simulation {
    /// The road network.
    network: RoadNetwork,
    /// The physics world holding the road sensors and vehicle bodies.
    physics: PhysicsWorld,
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// Turns frame times into ticks.
    clock: FixedTimestep,
    /// The settings the simulation was created with.
    config: SimulationConfig,
    /// Events raised by contact handlers and not yet taken.
    events: Vec<SimEvent>,
    /// The number of ticks simulated.
    frame: usize,
    /// Debugging information from the previously simulated tick.
    #[cfg(feature = "debug")]
    debug: serde_json::Value,
}

impl Simulation {
    /// Creates a simulation of the roads described by the polylines, with default settings.
    pub fn new(polylines: &[Polyline]) -> Result<Self, BuildError> {
        Self::with_config(polylines, SimulationConfig::default())
    }

    /// Creates a simulation of the roads described by the polylines.
    ///
    /// Builds the road network, then a sensor for every lane and junction.
    pub fn with_config(polylines: &[Polyline], config: SimulationConfig) -> Result<Self, BuildError> {
        let network = RoadNetwork::build(polylines)?;
        let mut physics = PhysicsWorld::new();

        let lanes = network.all_lane_quads()?;
        for quad in &lanes {
            physics.add_lane_sensor(quad)?;
        }
        for node in network.nodes() {
            physics.add_road_join_sensor(node.id(), node.pos(), node.road_join_radius());
        }
        log::info!(
            "created simulation with {} lane sensors and {} junction sensors",
            lanes.len(),
            network.nodes().count()
        );

        Ok(Self {
            network,
            physics,
            vehicles: VehicleSet::with_key(),
            clock: FixedTimestep::new(config.ticks_per_second, config.max_frame_time),
            config,
            events: vec![],
            frame: 0,
            #[cfg(feature = "debug")]
            debug: serde_json::Value::Null,
        })
    }

    /// Adds a vehicle at the given position, rotated by `angle` radians.
    /// An angle of zero faces the positive y axis.
    pub fn add_vehicle(
        &mut self,
        attributes: &VehicleAttributes,
        pos: Point2d,
        angle: f64,
    ) -> VehicleId {
        let physics = &mut self.physics;
        self.vehicles.insert_with_key(|id| {
            let body = physics.add_vehicle_body(id, attributes, pos, angle);
            Vehicle::new(id, body)
        })
    }

    /// Adds a vehicle at a random point on the network, facing along its road.
    pub fn spawn_vehicle(
        &mut self,
        attributes: &VehicleAttributes,
        rng: &mut impl Rng,
    ) -> Option<VehicleId> {
        let spawn = self.network.spawn_point(rng)?;
        Some(self.add_vehicle(attributes, spawn.position, spawn.angle))
    }

    /// Presses or releases one of a vehicle's keys.
    pub fn set_vehicle_key(&mut self, vehicle_id: VehicleId, key: VehicleKey, pressed: bool) {
        self.vehicles[vehicle_id].set_key(key, pressed);
    }

    /// Replaces the state of all of a vehicle's keys.
    pub fn set_vehicle_keys(&mut self, vehicle_id: VehicleId, keys: KeyState) {
        self.vehicles[vehicle_id].set_keys(keys);
    }

    /// Advances the simulation by a frame lasting `frame_time` seconds,
    /// running as many fixed ticks as fit.
    ///
    /// # Returns
    /// The number of ticks run.
    pub fn advance(&mut self, frame_time: f64) -> usize {
        self.clock.accumulate(frame_time);
        let mut ticks = 0;
        while self.clock.consume() {
            self.tick();
            ticks += 1;
        }
        ticks
    }

    /// Runs a single fixed tick: drives every vehicle, steps the physics world,
    /// then routes the contacts it reported.
    pub fn tick(&mut self) {
        let dt = self.clock.timestep();
        let bodies = self.physics.bodies_mut();
        for vehicle in self.vehicles.values_mut() {
            vehicle.tick(bodies, dt);
        }

        let contacts = self.physics.step(
            dt,
            self.config.velocity_iterations,
            self.config.position_iterations,
        );

        let mut ctx = DispatchContext {
            vehicles: &mut self.vehicles,
            events: &mut self.events,
        };
        for contact in contacts {
            dispatch(&mut ctx, contact.phase, contact.a, contact.b);
        }

        self.frame += 1;

        #[cfg(feature = "debug")]
        {
            self.record_debug();
            self.debug = take_debug_frame();
        }
    }

    /// Takes the events raised since the last call.
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Gets the number of ticks simulated so far.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// The settings the simulation was created with.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The road network being driven on.
    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    /// The physics world.
    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> &Vehicle {
        &self.vehicles[vehicle_id]
    }

    /// The vehicle's current speed along its heading, in m/s.
    pub fn vehicle_speed(&self, vehicle_id: VehicleId) -> f64 {
        crate::vehicle::dynamics::forward_speed(self.vehicle_body(vehicle_id))
    }

    /// The vehicle's current position in world space.
    pub fn vehicle_position(&self, vehicle_id: VehicleId) -> Point2d {
        let pos = self.vehicle_body(vehicle_id).translation();
        Point2d::new(pos.x, pos.y)
    }

    /// The vehicle's current rotation in radians.
    pub fn vehicle_angle(&self, vehicle_id: VehicleId) -> f64 {
        self.vehicle_body(vehicle_id).rotation().angle()
    }

    fn vehicle_body(&self, vehicle_id: VehicleId) -> &rapier2d_f64::prelude::RigidBody {
        &self.physics.bodies()[self.vehicles[vehicle_id].body()]
    }

    /// Gets the debugging information for the previously simulated tick as a JSON array.
    #[cfg(feature = "debug")]
    pub fn debug(&mut self) -> serde_json::Value {
        self.debug.clone()
    }

    /// Records each vehicle's detector and the lanes it is tracking.
    #[cfg(feature = "debug")]
    fn record_debug(&self) {
        for vehicle in self.vehicles.values() {
            debug_circle("detector", self.vehicle_position(vehicle.id()), 0.1);
            for lane in vehicle.tracker().lanes() {
                if let Ok(quad) = self.network.lane_quad(*lane) {
                    debug_polygon("tracked_lane", quad.corners());
                }
            }
        }
    }
}
