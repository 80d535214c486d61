//! The boundary with the rigid-body physics engine.
//!
//! The world has no gravity. Road sensors hang off a single fixed body, and
//! each vehicle gets a dynamic body carrying a solid chassis and two sensors.

use crate::contact::{ContactTag, TaggedUserData};
use crate::dispatch::{interaction_partners, ContactPhase};
use crate::lane::LaneQuad;
use crate::math::Point2d;
use crate::{BuildError, NodeId, VehicleAttributes, VehicleId};
use rapier2d_f64::prelude::*;
use std::sync::Mutex;

/// The radius of a vehicle's lane detector in m.
const DETECTOR_RADIUS: f64 = 0.1;

/// The sight sensor's width as a multiple of the vehicle's width.
const SIGHT_WIDTH_SCALE: f64 = 1.5;

/// How far ahead of its centre a vehicle can see, as a multiple of its length.
const SIGHT_DISTANCE_SCALE: f64 = 2.0;

/// Collision group shared by solid chassis, which only collide with each other.
const SOLID_GROUP: Group = Group::GROUP_16;

/// A begin or end contact reported by the physics engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawContact {
    pub phase: ContactPhase,
    /// The `user_data` of the first collider.
    pub a: u128,
    /// The `user_data` of the second collider.
    pub b: u128,
}

/// Collects contacts while the physics pipeline is stepping.
#[derive(Default)]
struct ContactCollector {
    contacts: Mutex<Vec<RawContact>>,
}

impl ContactCollector {
    fn take(&self) -> Vec<RawContact> {
        let mut contacts = self.contacts.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *contacts)
    }
}

impl EventHandler for ContactCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        let phase = if event.started() {
            ContactPhase::Begin
        } else {
            ContactPhase::End
        };
        // Removed colliders read as untagged
        let user_data = |handle| colliders.get(handle).map_or(0, |c| c.user_data);
        let contact = RawContact {
            phase,
            a: user_data(event.collider1()),
            b: user_data(event.collider2()),
        };
        self.contacts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(contact);
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// Builds the collision groups of a tagged sensor from the dispatch table.
fn sensor_groups(tag: ContactTag) -> InteractionGroups {
    InteractionGroups::new(
        Group::from_bits_truncate(tag.bits() as u32),
        Group::from_bits_truncate(interaction_partners(tag) as u32),
    )
}

/// Builds a sensor collider carrying tagged user data.
fn sensor(builder: ColliderBuilder, data: TaggedUserData) -> ColliderBuilder {
    builder
        .sensor(true)
        .density(0.0)
        .collision_groups(sensor_groups(data.tag()))
        .active_events(ActiveEvents::COLLISION_EVENTS)
        .user_data(data.encode())
}

fn to_point(p: Point2d) -> Point<Real> {
    point![p.x, p.y]
}

/// A physics world.
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    /// The fixed body that road sensors are attached to.
    static_frame: RigidBodyHandle,
    collector: ContactCollector,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Creates an empty world with zero gravity.
    pub fn new() -> Self {
        let mut bodies = RigidBodySet::new();
        let static_frame = bodies.insert(RigidBodyBuilder::fixed().build());
        Self {
            gravity: Vector::zeros(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            static_frame,
            collector: ContactCollector::default(),
        }
    }

    /// Adds the sensor of a lane.
    pub fn add_lane_sensor(&mut self, quad: &LaneQuad) -> Result<ColliderHandle, BuildError> {
        let points = quad.corners().map(to_point);
        let shape = ColliderBuilder::convex_hull(&points).ok_or(BuildError::DegenerateEdge {
            edge: quad.id().edge,
        })?;
        let collider = sensor(shape, TaggedUserData::Lane(quad.id())).build();
        Ok(self
            .colliders
            .insert_with_parent(collider, self.static_frame, &mut self.bodies))
    }

    /// Adds the sensor around a junction.
    pub fn add_road_join_sensor(&mut self, node: NodeId, pos: Point2d, radius: f64) -> ColliderHandle {
        let shape = ColliderBuilder::ball(radius).translation(vector![pos.x, pos.y]);
        let collider = sensor(shape, TaggedUserData::RoadJoin(node)).build();
        self.colliders
            .insert_with_parent(collider, self.static_frame, &mut self.bodies)
    }

    /// Creates the body of a vehicle: a solid chassis, a lane detector at its
    /// centre and a sight sensor extending ahead of it along its local y axis.
    pub fn add_vehicle_body(
        &mut self,
        vehicle: VehicleId,
        attributes: &VehicleAttributes,
        pos: Point2d,
        angle: f64,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![pos.x, pos.y])
            .rotation(angle)
            .linear_damping(attributes.linear_damping)
            .can_sleep(false)
            .build();
        let handle = self.bodies.insert(body);

        let half_width = 0.5 * attributes.width;
        let half_length = 0.5 * attributes.length;
        let chassis = ColliderBuilder::cuboid(half_width, half_length)
            .density(attributes.density)
            .friction(attributes.friction)
            .collision_groups(InteractionGroups::new(SOLID_GROUP, SOLID_GROUP))
            .build();
        self.colliders
            .insert_with_parent(chassis, handle, &mut self.bodies);

        let detector = sensor(
            ColliderBuilder::ball(DETECTOR_RADIUS),
            TaggedUserData::CarLaneDetector(vehicle),
        )
        .build();
        self.colliders
            .insert_with_parent(detector, handle, &mut self.bodies);

        let sight_half_width = SIGHT_WIDTH_SCALE * half_width;
        let sight_half_length = 0.5 * SIGHT_DISTANCE_SCALE * attributes.length;
        let sight = sensor(
            ColliderBuilder::cuboid(sight_half_width, sight_half_length)
                .translation(vector![0.0, sight_half_length]),
            TaggedUserData::CarSight(vehicle),
        )
        .build();
        self.colliders
            .insert_with_parent(sight, handle, &mut self.bodies);

        handle
    }

    /// Advances the world by `dt` seconds.
    ///
    /// # Returns
    /// The contacts that began or ended during the step.
    pub fn step(
        &mut self,
        dt: f64,
        velocity_iterations: usize,
        position_iterations: usize,
    ) -> Vec<RawContact> {
        let params = IntegrationParameters {
            dt,
            max_velocity_iterations: velocity_iterations,
            max_stabilization_iterations: position_iterations,
            ..IntegrationParameters::default()
        };
        self.pipeline.step(
            &self.gravity,
            &params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &self.collector,
        );
        self.collector.take()
    }

    /// The rigid bodies in the world.
    pub fn bodies(&self) -> &RigidBodySet {
        &self.bodies
    }

    pub(crate) fn bodies_mut(&mut self) -> &mut RigidBodySet {
        &mut self.bodies
    }

    /// Gets a rigid body.
    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    /// The number of colliders in the world.
    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }
}
