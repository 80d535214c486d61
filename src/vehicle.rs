use self::dynamics::{angular_velocity, drive, kill_lateral_motion, longitudinal};
pub use self::input::{EngineState, KeyState, VehicleKey};
use crate::tracker::RoadTracker;
use crate::VehicleId;
use rapier2d_f64::prelude::{RigidBodyHandle, RigidBodySet};

pub(crate) mod dynamics;
mod input;

/// The default vehicle width in m.
pub const VEHICLE_WIDTH: f64 = 1.8;

/// The default vehicle length in m.
pub const VEHICLE_LENGTH: f64 = 4.2;

/// A simulated vehicle.
///
/// The vehicle's rigid body lives in the physics world; the vehicle only holds
/// its handle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID
    id: VehicleId,
    /// The vehicle's rigid body.
    body: RigidBodyHandle,
    /// The engine state derived during the last tick.
    engine_state: EngineState,
    /// The steering input during the last tick, in [-1, 1].
    wheels_force: f64,
    /// The forward speed measured during the last tick, in m/s.
    speed: f64,
    /// The keys currently held.
    keys: KeyState,
    /// The lanes the vehicle is on.
    tracker: RoadTracker,
}

/// The attributes of a vehicle.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleAttributes {
    /// The vehicle width in m.
    pub width: f64,
    /// The vehicle length in m.
    pub length: f64,
    /// The density of the chassis in kg/m².
    pub density: f64,
    /// The friction coefficient of the chassis.
    pub friction: f64,
    /// The linear damping of the body.
    pub linear_damping: f64,
}

impl Default for VehicleAttributes {
    fn default() -> Self {
        Self {
            width: VEHICLE_WIDTH,
            length: VEHICLE_LENGTH,
            density: 16.0,
            friction: 0.5,
            linear_damping: 0.1,
        }
    }
}

impl Vehicle {
    /// Creates a new vehicle driving the given body.
    pub(crate) fn new(id: VehicleId, body: RigidBodyHandle) -> Self {
        Self {
            id,
            body,
            engine_state: EngineState::Drift,
            wheels_force: 0.0,
            speed: 0.0,
            keys: KeyState::default(),
            tracker: RoadTracker::new(),
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The handle of the vehicle's rigid body.
    pub fn body(&self) -> RigidBodyHandle {
        self.body
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine_state
    }

    /// The steering input applied during the last tick.
    pub fn wheels_force(&self) -> f64 {
        self.wheels_force
    }

    /// The forward speed measured at the start of the last tick, in m/s.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn keys(&self) -> KeyState {
        self.keys
    }

    /// Presses or releases a key.
    pub fn set_key(&mut self, key: VehicleKey, pressed: bool) {
        self.keys.set(key, pressed);
    }

    /// Replaces the state of every key at once.
    pub fn set_keys(&mut self, keys: KeyState) {
        self.keys = keys;
    }

    /// The lanes the vehicle is currently on.
    pub fn tracker(&self) -> &RoadTracker {
        &self.tracker
    }

    pub(crate) fn tracker_mut(&mut self) -> &mut RoadTracker {
        &mut self.tracker
    }

    /// Applies one tick of driving, lasting `dt` seconds, to the vehicle's body.
    ///
    /// # Panics
    /// If the vehicle's body is not in `bodies`.
    pub(crate) fn tick(&mut self, bodies: &mut RigidBodySet, dt: f64) {
        let body = &mut bodies[self.body];

        kill_lateral_motion(body);

        self.engine_state = EngineState::from_keys(&self.keys);
        self.wheels_force = self.keys.steering();
        self.speed = dynamics::forward_speed(body);

        let vel_sqrd = body.linvel().norm_squared();
        let action = longitudinal(self.engine_state, self.speed, vel_sqrd, body.mass(), dt);
        drive(body, action);

        body.set_angvel(angular_velocity(self.wheels_force, self.speed), true);
    }
}
