//! Semantic tags attached to physics colliders.

use crate::{EdgeId, Key, KeyData, LaneId, NodeId, VehicleId};

/// The role a tagged collider plays in the simulation.
///
/// Every tag is a distinct bit, so the tags of both sides of a contact can be
/// combined into a single [TagPair] without losing information.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ContactTag {
    /// The sensor volume of a lane.
    Lane = 1 << 0,
    /// The small sensor at a vehicle's centre that detects the lanes it is on.
    CarLaneDetector = 1 << 1,
    /// The sensor extending ahead of a vehicle.
    CarSight = 1 << 2,
    /// The sensor around a junction.
    RoadJoin = 1 << 3,
}

impl ContactTag {
    /// Gets the tag's bit.
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Combines two tags into a dispatch key.
    pub const fn pair(self, other: ContactTag) -> TagPair {
        TagPair(self.bits() | other.bits())
    }

    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(Self::Lane),
            2 => Some(Self::CarLaneDetector),
            4 => Some(Self::CarSight),
            8 => Some(Self::RoadJoin),
            _ => None,
        }
    }
}

/// The bitwise union of the tags on both sides of a contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TagPair(u8);

impl TagPair {
    /// Gets the combined bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if the pair includes the given tag.
    pub const fn contains(self, tag: ContactTag) -> bool {
        self.0 & tag.bits() != 0
    }
}

/// The data attached to a tagged collider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaggedUserData {
    Lane(LaneId),
    CarLaneDetector(VehicleId),
    CarSight(VehicleId),
    RoadJoin(NodeId),
}

impl TaggedUserData {
    /// Gets the tag of this data.
    pub fn tag(&self) -> ContactTag {
        match self {
            TaggedUserData::Lane(_) => ContactTag::Lane,
            TaggedUserData::CarLaneDetector(_) => ContactTag::CarLaneDetector,
            TaggedUserData::CarSight(_) => ContactTag::CarSight,
            TaggedUserData::RoadJoin(_) => ContactTag::RoadJoin,
        }
    }

    /// Packs the data into a collider's `user_data` field.
    ///
    /// The low byte holds the tag and the payload sits above it,
    /// so a zeroed field always reads as untagged.
    pub fn encode(&self) -> u128 {
        let payload = match *self {
            TaggedUserData::Lane(lane) => (lane.edge.0 as u128) | ((lane.index as u128) << 32),
            TaggedUserData::CarLaneDetector(vehicle) | TaggedUserData::CarSight(vehicle) => {
                vehicle.data().as_ffi() as u128
            }
            TaggedUserData::RoadJoin(node) => node.0 as u128,
        };
        (payload << 8) | self.tag().bits() as u128
    }

    /// Unpacks a collider's `user_data` field, returning `None` if it is untagged.
    pub fn decode(bits: u128) -> Option<Self> {
        let payload = bits >> 8;
        let data = match ContactTag::from_bits(bits as u8)? {
            ContactTag::Lane => TaggedUserData::Lane(LaneId::new(
                EdgeId(payload as u32),
                (payload >> 32) as u8,
            )),
            ContactTag::CarLaneDetector => {
                TaggedUserData::CarLaneDetector(KeyData::from_ffi(payload as u64).into())
            }
            ContactTag::CarSight => TaggedUserData::CarSight(KeyData::from_ffi(payload as u64).into()),
            ContactTag::RoadJoin => TaggedUserData::RoadJoin(NodeId(payload as u32)),
        };
        Some(data)
    }
}

/// A contact between two tagged colliders, with the endpoints ordered by tag value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassifiedContact {
    /// The dispatch key.
    pub key: TagPair,
    /// The endpoint with the smaller tag.
    pub first: TaggedUserData,
    /// The endpoint with the larger tag.
    pub second: TaggedUserData,
}

/// Classifies a raw contact between two colliders' `user_data` fields.
///
/// Returns `None` if either collider is untagged. The result does not depend
/// on which collider the physics engine reported first.
pub fn classify(a: u128, b: u128) -> Option<ClassifiedContact> {
    let a = TaggedUserData::decode(a)?;
    let b = TaggedUserData::decode(b)?;
    let (first, second) = if b.tag() < a.tag() { (b, a) } else { (a, b) };
    Some(ClassifiedContact {
        key: a.tag().pair(b.tag()),
        first,
        second,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn tags_are_distinct_bits() {
        let tags = [
            ContactTag::Lane,
            ContactTag::CarLaneDetector,
            ContactTag::CarSight,
            ContactTag::RoadJoin,
        ];
        for (i, a) in tags.iter().enumerate() {
            assert_eq!(a.bits().count_ones(), 1);
            for b in &tags[i + 1..] {
                assert_eq!(a.bits() & b.bits(), 0);
            }
        }
    }

    #[test]
    fn user_data_survives_encoding() {
        let mut vehicles = SlotMap::<VehicleId, ()>::with_key();
        vehicles.insert(());
        let vehicle = vehicles.insert(());
        let samples = [
            TaggedUserData::Lane(LaneId::new(EdgeId(u32::MAX), 3)),
            TaggedUserData::CarLaneDetector(vehicle),
            TaggedUserData::CarSight(vehicle),
            TaggedUserData::RoadJoin(NodeId(12)),
        ];
        for data in samples {
            assert_eq!(TaggedUserData::decode(data.encode()), Some(data));
        }
    }

    #[test]
    fn tags_from_bits() {
        for tag in [
            ContactTag::Lane,
            ContactTag::CarLaneDetector,
            ContactTag::CarSight,
            ContactTag::RoadJoin,
        ] {
            assert_eq!(ContactTag::from_bits(tag.bits()), Some(tag));
        }
        assert_eq!(ContactTag::from_bits(0), None);
        assert_eq!(ContactTag::from_bits(3), None);
    }

    #[test]
    fn untagged_and_unknown_bits_decode_to_none() {
        assert_eq!(TaggedUserData::decode(0), None);
        assert_eq!(TaggedUserData::decode(0x30), None);
        assert_eq!(TaggedUserData::decode(1 << 8), None);
    }

    #[test]
    fn classification_orders_by_tag() {
        let lane = TaggedUserData::Lane(LaneId::new(EdgeId(1), 0));
        let join = TaggedUserData::RoadJoin(NodeId(4));
        let forward = classify(lane.encode(), join.encode()).unwrap();
        let reverse = classify(join.encode(), lane.encode()).unwrap();
        assert_eq!(forward, reverse);
        assert_eq!(forward.first, lane);
        assert_eq!(forward.key, ContactTag::Lane.pair(ContactTag::RoadJoin));
        assert!(forward.key.contains(ContactTag::RoadJoin));
        assert!(!forward.key.contains(ContactTag::CarSight));
    }

    #[test]
    fn untagged_side_drops_the_contact() {
        let lane = TaggedUserData::Lane(LaneId::new(EdgeId(1), 0));
        assert!(classify(lane.encode(), 0).is_none());
        assert!(classify(0, lane.encode()).is_none());
    }
}
