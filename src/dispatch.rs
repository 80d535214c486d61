//! Routes classified contacts to the handler registered for their tag pair.

use crate::contact::{classify, ContactTag, TagPair, TaggedUserData};
use crate::{NodeId, VehicleId, VehicleSet};

/// Whether a contact is starting or ending.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContactPhase {
    Begin,
    End,
}

/// A notification raised by a contact handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SimEvent {
    /// A vehicle's sight sensor started overlapping a junction.
    JunctionSighted { vehicle: VehicleId, node: NodeId },
}

/// The state contact handlers may change.
///
/// Handlers run between physics steps and only touch bookkeeping state,
/// never the physics world.
pub(crate) struct DispatchContext<'a> {
    pub vehicles: &'a mut VehicleSet,
    pub events: &'a mut Vec<SimEvent>,
}

/// A contact handler. The endpoint with the smaller tag is always passed first.
type Handler = fn(&mut DispatchContext, ContactPhase, TaggedUserData, TaggedUserData);

const HANDLERS: &[(TagPair, Handler)] = &[
    (
        ContactTag::Lane.pair(ContactTag::CarLaneDetector),
        handle_lane_and_car,
    ),
    (
        ContactTag::CarSight.pair(ContactTag::RoadJoin),
        handle_sight_and_join,
    ),
];

/// Finds the handler registered for a tag pair.
fn handler_for(key: TagPair) -> Option<Handler> {
    HANDLERS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, handler)| *handler)
}

/// The bits of every tag that has a registered handler together with `tag`.
///
/// Used as the physics collision filter, so the engine only reports
/// contacts that something will handle.
pub fn interaction_partners(tag: ContactTag) -> u8 {
    HANDLERS
        .iter()
        .filter(|(key, _)| key.contains(tag))
        .map(|(key, _)| key.bits() & !tag.bits())
        .fold(0, |acc, bits| acc | bits)
}

/// Dispatches a raw contact between two colliders' `user_data` fields.
///
/// Contacts involving an untagged collider, or a tag pair without a handler,
/// are ignored. Returns true if a handler ran.
pub(crate) fn dispatch(ctx: &mut DispatchContext, phase: ContactPhase, a: u128, b: u128) -> bool {
    let Some(contact) = classify(a, b) else {
        return false;
    };
    let Some(handler) = handler_for(contact.key) else {
        return false;
    };
    handler(ctx, phase, contact.first, contact.second);
    true
}

fn handle_lane_and_car(
    ctx: &mut DispatchContext,
    phase: ContactPhase,
    lane: TaggedUserData,
    car: TaggedUserData,
) {
    let (TaggedUserData::Lane(lane), TaggedUserData::CarLaneDetector(vehicle)) = (lane, car) else {
        return;
    };
    let Some(vehicle) = ctx.vehicles.get_mut(vehicle) else {
        return;
    };
    let tracker = vehicle.tracker_mut();
    match phase {
        ContactPhase::Begin => tracker.entered(lane),
        ContactPhase::End => tracker.exited(lane),
    }
}

fn handle_sight_and_join(
    ctx: &mut DispatchContext,
    phase: ContactPhase,
    sight: TaggedUserData,
    join: TaggedUserData,
) {
    let (TaggedUserData::CarSight(vehicle), TaggedUserData::RoadJoin(node)) = (sight, join) else {
        return;
    };
    if phase != ContactPhase::Begin || !ctx.vehicles.contains_key(vehicle) {
        return;
    }
    log::debug!("vehicle {vehicle:?} sighted junction {node}");
    ctx.events.push(SimEvent::JunctionSighted { vehicle, node });
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{EdgeId, LaneId, Vehicle};
    use rapier2d_f64::prelude::RigidBodyHandle;

    fn vehicles() -> (VehicleSet, VehicleId) {
        let mut vehicles = VehicleSet::with_key();
        let id = vehicles.insert_with_key(|id| Vehicle::new(id, RigidBodyHandle::invalid()));
        (vehicles, id)
    }

    #[test]
    fn lane_contacts_drive_the_tracker() {
        let (mut vehicles, id) = vehicles();
        let mut events = vec![];
        let mut ctx = DispatchContext {
            vehicles: &mut vehicles,
            events: &mut events,
        };
        let lane = TaggedUserData::Lane(LaneId::new(EdgeId(2), 1)).encode();
        let car = TaggedUserData::CarLaneDetector(id).encode();

        assert!(dispatch(&mut ctx, ContactPhase::Begin, lane, car));
        assert!(ctx.vehicles[id].tracker().contains(LaneId::new(EdgeId(2), 1)));
        assert!(dispatch(&mut ctx, ContactPhase::End, car, lane));
        assert!(ctx.vehicles[id].tracker().is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn argument_order_does_not_depend_on_engine_order() {
        let lane = TaggedUserData::Lane(LaneId::new(EdgeId(0), 0)).encode();

        let (mut a, id_a) = vehicles();
        let car_a = TaggedUserData::CarLaneDetector(id_a).encode();
        dispatch(
            &mut DispatchContext {
                vehicles: &mut a,
                events: &mut vec![],
            },
            ContactPhase::Begin,
            lane,
            car_a,
        );

        let (mut b, id_b) = vehicles();
        let car_b = TaggedUserData::CarLaneDetector(id_b).encode();
        dispatch(
            &mut DispatchContext {
                vehicles: &mut b,
                events: &mut vec![],
            },
            ContactPhase::Begin,
            car_b,
            lane,
        );

        assert_eq!(a[id_a].tracker().lanes(), b[id_b].tracker().lanes());
        assert_eq!(a[id_a].tracker().len(), 1);
    }

    #[test]
    fn sighting_a_junction_only_fires_on_begin() {
        let (mut vehicles, id) = vehicles();
        let mut events = vec![];
        let mut ctx = DispatchContext {
            vehicles: &mut vehicles,
            events: &mut events,
        };
        let sight = TaggedUserData::CarSight(id).encode();
        let join = TaggedUserData::RoadJoin(NodeId(5)).encode();

        dispatch(&mut ctx, ContactPhase::Begin, join, sight);
        dispatch(&mut ctx, ContactPhase::End, sight, join);
        assert_eq!(
            events,
            vec![SimEvent::JunctionSighted {
                vehicle: id,
                node: NodeId(5)
            }]
        );
    }

    #[test]
    fn unhandled_contacts_are_dropped() {
        let (mut vehicles, id) = vehicles();
        let mut events = vec![];
        let mut ctx = DispatchContext {
            vehicles: &mut vehicles,
            events: &mut events,
        };
        let lane = TaggedUserData::Lane(LaneId::new(EdgeId(0), 0)).encode();
        let sight = TaggedUserData::CarSight(id).encode();
        let detector = TaggedUserData::CarLaneDetector(id).encode();

        assert!(!dispatch(&mut ctx, ContactPhase::Begin, lane, sight));
        assert!(!dispatch(&mut ctx, ContactPhase::Begin, lane, 0));
        assert!(!dispatch(&mut ctx, ContactPhase::Begin, 0, detector));
        assert!(ctx.vehicles[id].tracker().is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn contacts_for_missing_vehicles_are_ignored() {
        let (mut vehicles, id) = vehicles();
        vehicles.remove(id);
        let mut events = vec![];
        let mut ctx = DispatchContext {
            vehicles: &mut vehicles,
            events: &mut events,
        };
        let lane = TaggedUserData::Lane(LaneId::new(EdgeId(0), 0)).encode();
        let detector = TaggedUserData::CarLaneDetector(id).encode();
        let sight = TaggedUserData::CarSight(id).encode();
        let join = TaggedUserData::RoadJoin(NodeId(0)).encode();
        assert!(dispatch(&mut ctx, ContactPhase::Begin, lane, detector));
        dispatch(&mut ctx, ContactPhase::Begin, sight, join);
        assert!(events.is_empty());
    }

    #[test]
    fn interaction_partners_follow_the_handlers() {
        assert_eq!(
            interaction_partners(ContactTag::Lane),
            ContactTag::CarLaneDetector.bits()
        );
        assert_eq!(
            interaction_partners(ContactTag::CarLaneDetector),
            ContactTag::Lane.bits()
        );
        assert_eq!(
            interaction_partners(ContactTag::CarSight),
            ContactTag::RoadJoin.bits()
        );
        assert_eq!(
            interaction_partners(ContactTag::RoadJoin),
            ContactTag::CarSight.bits()
        );
    }
}
