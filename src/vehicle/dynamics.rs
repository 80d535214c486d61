use super::EngineState;
use rapier2d_f64::prelude::{Real, RigidBody, Vector};

/// The driving force of the engine when accelerating, in N.
pub const ACCELERATION_FORCE: f64 = 1400.0;

/// The driving force of the engine when reversing, in N.
pub const REVERSE_FORCE: f64 = 1000.0;

/// The force of the brakes, in N.
pub const BRAKE_FORCE: f64 = 6000.0;

/// A braking vehicle slower than this (squared, in m²/s²) is brought to a stop.
pub const STOPPED_EPSILON_SQRD: f64 = 2.25;

/// Angular velocity per unit of steering per m/s of forward speed.
pub const TURN_RATE: f64 = 0.15;

/// Forward speeds above this, in m/s, turn no faster.
pub const MAX_TURN_SPEED: f64 = 10.0;

/// The longitudinal action for one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Longitudinal {
    /// Apply a force of this magnitude along the vehicle's heading.
    Force(f64),
    /// Zero the vehicle's velocity.
    Stop,
}

/// Determines the longitudinal force for a tick.
///
/// Braking never pushes a vehicle past rest: if a full tick of braking would
/// reach or cross zero speed, the vehicle is stopped instead.
///
/// # Parameters
/// * `state` - The engine state
/// * `speed` - The forward speed in m/s
/// * `vel_sqrd` - The squared magnitude of the full linear velocity
/// * `mass` - The mass of the body in kg
/// * `dt` - The length of the tick in s
pub(crate) fn longitudinal(
    state: EngineState,
    speed: f64,
    vel_sqrd: f64,
    mass: f64,
    dt: f64,
) -> Longitudinal {
    match state {
        EngineState::Accelerate => Longitudinal::Force(ACCELERATION_FORCE),
        EngineState::Reverse => Longitudinal::Force(-REVERSE_FORCE),
        EngineState::Brake if vel_sqrd < STOPPED_EPSILON_SQRD => Longitudinal::Stop,
        EngineState::Brake if BRAKE_FORCE * dt >= mass * speed.abs() => Longitudinal::Stop,
        EngineState::Brake => Longitudinal::Force(-BRAKE_FORCE * speed.signum()),
        EngineState::Drift => Longitudinal::Force(0.0),
    }
}

/// Determines the angular velocity from the steering input and forward speed.
///
/// Turning scales with speed up to `MAX_TURN_SPEED`, flips when reversing,
/// and is exactly zero without steering.
pub(crate) fn angular_velocity(steering: f64, speed: f64) -> f64 {
    if steering == 0.0 {
        return 0.0;
    }
    -steering * TURN_RATE * speed.clamp(-MAX_TURN_SPEED, MAX_TURN_SPEED)
}

/// The body's local x axis in world space.
fn right_axis(body: &RigidBody) -> Vector<Real> {
    body.position().rotation * Vector::<Real>::x()
}

/// The body's local y axis in world space.
fn forward_axis(body: &RigidBody) -> Vector<Real> {
    body.position().rotation * Vector::<Real>::y()
}

/// The component of the body's velocity along its heading, in m/s.
pub(crate) fn forward_speed(body: &RigidBody) -> f64 {
    forward_axis(body).dot(body.linvel())
}

/// Cancels the body's sideways velocity with an impulse, modelling tyre grip.
pub(crate) fn kill_lateral_motion(body: &mut RigidBody) {
    let right = right_axis(body);
    let lateral = right.dot(body.linvel());
    let impulse = right * (-body.mass() * lateral);
    body.apply_impulse(impulse, true);
}

/// Replaces the body's driving force for the next physics step.
pub(crate) fn drive(body: &mut RigidBody, action: Longitudinal) {
    body.reset_forces(true);
    match action {
        Longitudinal::Force(force) => {
            let forward = forward_axis(body);
            body.add_force(forward * force, true);
        }
        Longitudinal::Stop => body.set_linvel(Vector::<Real>::zeros(), true),
    }
}
