use crate::lane::{lane_centre_offset, lane_quad, lane_quads, LaneId, LaneQuad, LANE_WIDTH};
use crate::math::{heading_angle, rot90, segment_intersection, try_normalize, Point2d, Vector2d};
use crate::BuildError;
use cgmath::prelude::*;
use itertools::Itertools;
use rand::seq::IteratorRandom;
use rand::Rng;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

/// The number of lanes given to every edge.
pub const LANES_PER_EDGE: u8 = 2;

/// Space left between the network's bounds and the coordinate origin, in m.
const PADDING: f64 = 1.0;

/// Crossings closer than this (squared, in map units²) to a road's end join the road there.
const CROSSING_TOLERANCE_SQRD: f64 = 2.0;

/// The road-join sensor radius as a multiple of the widest incident road's half width.
const ROAD_JOIN_SCALE: f64 = 1.25;

/// Unique ID of a [RoadNode].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

/// Unique ID of a [RoadEdge].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A road centre line read from a map.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polyline {
    /// The points of the polyline, in map coordinates (y pointing down).
    pub points: Vec<Point2d>,
    /// Whether the last point connects back to the first.
    pub closed: bool,
}

impl Polyline {
    /// Creates an open polyline.
    pub fn open(points: impl Into<Vec<Point2d>>) -> Self {
        Self {
            points: points.into(),
            closed: false,
        }
    }

    /// Creates a closed polyline.
    pub fn closed(points: impl Into<Vec<Point2d>>) -> Self {
        Self {
            points: points.into(),
            closed: true,
        }
    }

    /// Iterates over the line segments of the polyline.
    fn segments(&self) -> impl Iterator<Item = (Point2d, Point2d)> + '_ {
        let closing = match (self.closed && self.points.len() > 2, self.points.first()) {
            (true, Some(first)) => self.points.last().map(|last| (*last, *first)),
            _ => None,
        };
        self.points
            .iter()
            .copied()
            .tuple_windows()
            .chain(closing)
    }
}

/// A junction or end point of the road network.
#[derive(Clone, Debug)]
pub struct RoadNode {
    id: NodeId,
    pos: Point2d,
    edges: SmallVec<[EdgeId; 4]>,
    max_lanes: u8,
}

impl RoadNode {
    /// Gets the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The position of the node in world space.
    pub fn pos(&self) -> Point2d {
        self.pos
    }

    /// The edges that start or end at this node.
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    /// The largest lane count of any edge at this node.
    pub fn max_lanes(&self) -> u8 {
        self.max_lanes
    }

    /// The radius of the sensor used to sight this junction.
    pub fn road_join_radius(&self) -> f64 {
        self.max_lanes as f64 * ROAD_JOIN_SCALE * LANE_WIDTH / 2.0
    }
}

/// A straight road between two nodes.
#[derive(Clone, Debug)]
pub struct RoadEdge {
    id: EdgeId,
    src: NodeId,
    dst: NodeId,
    lanes: u8,
    length: f64,
    /// Unit vector from `src` to `dst`; zero for a zero-length edge.
    direction: Vector2d,
    /// Unit vector to the left of `direction`.
    normal: Vector2d,
}

impl RoadEdge {
    /// Gets the edge's ID.
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// The node the edge starts at.
    pub fn src(&self) -> NodeId {
        self.src
    }

    /// The node the edge ends at.
    pub fn dst(&self) -> NodeId {
        self.dst
    }

    /// The number of lanes on the edge.
    pub fn lanes(&self) -> u8 {
        self.lanes
    }

    /// The length of the edge's centre line in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// The total width of the edge's lanes in m.
    pub fn width(&self) -> f64 {
        self.lanes as f64 * LANE_WIDTH
    }

    pub fn direction(&self) -> Vector2d {
        self.direction
    }

    pub fn normal(&self) -> Vector2d {
        self.normal
    }
}

/// A position and heading at which a vehicle can be placed on the network.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnPoint {
    /// The edge the point lies on.
    pub edge: EdgeId,
    /// The position in world space.
    pub position: Point2d,
    /// The body angle in radians which faces along the edge.
    pub angle: f64,
}

/// The graph of roads a simulation drives on.
///
/// Nodes and edges live in arenas indexed by their IDs and never change after
/// the network is built. Lane geometry is derived from the edges on demand.
#[derive(Clone, Debug)]
pub struct RoadNetwork {
    nodes: Vec<RoadNode>,
    edges: Vec<RoadEdge>,
}

impl RoadNetwork {
    /// Builds a road network from a set of polylines in map coordinates.
    ///
    /// Points that fall on the same whole map unit are merged into one node.
    /// Once every edge is added, the network is translated so that it sits just
    /// above the origin and its y axis is flipped to point up.
    pub fn build(polylines: &[Polyline]) -> Result<Self, BuildError> {
        if polylines.is_empty() {
            return Err(BuildError::EmptyNetwork);
        }

        let mut merger = NodeMerger::default();
        let mut raw_edges = vec![];

        for (idx, polyline) in polylines.iter().enumerate() {
            if polyline.points.len() < 2 {
                log::warn!("skipping polyline {idx} with fewer than two points");
                continue;
            }
            if polyline.points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
                log::warn!("skipping polyline {idx} with non-finite points");
                continue;
            }
            for (a, b) in polyline.segments() {
                raw_edges.push((merger.node(a), merger.node(b)));
            }
        }

        if raw_edges.is_empty() {
            return Err(BuildError::EmptyNetwork);
        }

        let raw_edges = split_crossings(&mut merger, raw_edges);
        let mut positions = merger.positions;
        normalize_positions(&mut positions);

        let mut nodes = positions
            .iter()
            .enumerate()
            .map(|(idx, pos)| RoadNode {
                id: NodeId(idx as u32),
                pos: *pos,
                edges: SmallVec::new(),
                max_lanes: 0,
            })
            .collect::<Vec<_>>();

        let edges = raw_edges
            .into_iter()
            .enumerate()
            .map(|(idx, (src, dst))| {
                let id = EdgeId(idx as u32);
                let delta = positions[dst.0 as usize] - positions[src.0 as usize];
                let direction = try_normalize(delta).unwrap_or_else(Vector2d::zero);
                let lanes = LANES_PER_EDGE;
                for node in [src, dst] {
                    let node = &mut nodes[node.0 as usize];
                    if !node.edges.contains(&id) {
                        node.edges.push(id);
                    }
                    node.max_lanes = node.max_lanes.max(lanes);
                }
                RoadEdge {
                    id,
                    src,
                    dst,
                    lanes,
                    length: delta.magnitude(),
                    direction,
                    normal: rot90(direction),
                }
            })
            .collect::<Vec<_>>();

        for edge in edges.iter().filter(|e| e.length < e.width()) {
            log::warn!(
                "road {} is too short for its width: length {:.2} m, width {:.2} m",
                edge.id,
                edge.length,
                edge.width()
            );
        }

        log::info!(
            "built road network with {} nodes and {} edges",
            nodes.len(),
            edges.len()
        );

        Ok(Self { nodes, edges })
    }

    /// Returns an iterator over all the nodes in the network.
    pub fn nodes(&self) -> impl Iterator<Item = &RoadNode> {
        self.nodes.iter()
    }

    /// Returns an iterator over all the edges in the network.
    pub fn edges(&self) -> impl Iterator<Item = &RoadEdge> {
        self.edges.iter()
    }

    /// Gets the node with the given ID.
    pub fn node(&self, id: NodeId) -> Option<&RoadNode> {
        self.nodes.get(id.0 as usize)
    }

    /// Gets the edge with the given ID.
    pub fn edge(&self, id: EdgeId) -> Option<&RoadEdge> {
        self.edges.get(id.0 as usize)
    }

    /// Gets the world space positions of an edge's start and end nodes.
    pub fn edge_endpoints(&self, edge: &RoadEdge) -> (Point2d, Point2d) {
        (
            self.nodes[edge.src.0 as usize].pos,
            self.nodes[edge.dst.0 as usize].pos,
        )
    }

    /// Computes the sensor quads of every lane on an edge.
    pub fn lane_quads(&self, id: EdgeId) -> Result<SmallVec<[LaneQuad; 4]>, BuildError> {
        let edge = self.edge(id).ok_or(BuildError::UnknownEdge(id))?;
        let (src, dst) = self.edge_endpoints(edge);
        lane_quads(id, src, dst, edge.lanes)
    }

    /// Computes the sensor quad of a single lane.
    pub fn lane_quad(&self, lane: LaneId) -> Result<LaneQuad, BuildError> {
        let edge = self.edge(lane.edge).ok_or(BuildError::UnknownEdge(lane.edge))?;
        let (src, dst) = self.edge_endpoints(edge);
        lane_quad(lane.edge, src, dst, edge.lanes, lane.index)
    }

    /// Computes the sensor quads of every lane in the network.
    ///
    /// Fails on the first edge with degenerate geometry.
    pub fn all_lane_quads(&self) -> Result<Vec<LaneQuad>, BuildError> {
        let mut quads = Vec::with_capacity(self.edges.len() * LANES_PER_EDGE as usize);
        for edge in &self.edges {
            quads.extend(self.lane_quads(edge.id)?);
        }
        Ok(quads)
    }

    /// Iterates over the nodes directly connected to `node`, with the edge connecting them.
    pub fn neighbours(&self, node: NodeId) -> impl Iterator<Item = (NodeId, EdgeId)> + '_ {
        self.node(node)
            .into_iter()
            .flat_map(|n| n.edges.iter())
            .map(move |id| {
                let edge = &self.edges[id.0 as usize];
                let other = if edge.src == node { edge.dst } else { edge.src };
                (other, edge.id)
            })
    }

    /// Finds the shortest route between two nodes, travelling along edges in either direction.
    ///
    /// # Returns
    /// The nodes along the route, including both ends, and its length in m.
    pub fn route(&self, from: NodeId, to: NodeId) -> Option<(Vec<NodeId>, f64)> {
        self.node(from)?;
        self.node(to)?;
        let (path, cost) = pathfinding::directed::dijkstra::dijkstra(
            &from,
            |node| {
                self.neighbours(*node)
                    .map(|(other, edge)| {
                        (other, (self.edges[edge.0 as usize].length * 1000.0).round() as u64)
                    })
                    .collect::<Vec<_>>()
            },
            |node| *node == to,
        )?;
        Some((path, cost as f64 / 1000.0))
    }

    /// Picks a random point at the centre of the first lane of a random edge,
    /// facing along the edge.
    pub fn spawn_point(&self, rng: &mut impl Rng) -> Option<SpawnPoint> {
        let edge = self.edges.iter().filter(|e| e.length > 0.0).choose(rng)?;
        let (src, _) = self.edge_endpoints(edge);
        let along = rng.gen::<f64>() * edge.length;
        let position = src
            + edge.direction * along
            + edge.normal * lane_centre_offset(edge.lanes, 0);
        Some(SpawnPoint {
            edge: edge.id,
            position,
            angle: heading_angle(edge.direction),
        })
    }
}

/// Merges points falling on the same whole map unit into one node.
#[derive(Default)]
struct NodeMerger {
    keys: HashMap<(i64, i64), NodeId>,
    positions: Vec<Point2d>,
}

impl NodeMerger {
    /// Gets the node at the floored point, adding it if it's new.
    fn node(&mut self, p: Point2d) -> NodeId {
        let key = (p.x.floor() as i64, p.y.floor() as i64);
        let positions = &mut self.positions;
        *self.keys.entry(key).or_insert_with(|| {
            positions.push(Point2d::new(key.0 as f64, key.1 as f64));
            NodeId(positions.len() as u32 - 1)
        })
    }

    fn pos(&self, node: NodeId) -> Point2d {
        self.positions[node.0 as usize]
    }
}

/// Splits edges where they cross each other, adding a node at every crossing.
///
/// Each edge is extended past both ends by its width before testing, so roads
/// that stop just short of another road still join it: a crossing beyond an
/// edge's end gets a short connecting edge instead of a split. A crossing within
/// `CROSSING_TOLERANCE_SQRD` of an endpoint of either edge uses that endpoint as
/// the junction, and an edge is never split at a node this close to its own ends.
fn split_crossings(merger: &mut NodeMerger, edges: Vec<(NodeId, NodeId)>) -> Vec<(NodeId, NodeId)> {
    let extended = |(src, dst): (NodeId, NodeId), merger: &NodeMerger| {
        let (a, b) = (merger.pos(src), merger.pos(dst));
        let reach = try_normalize(b - a)? * (LANES_PER_EDGE as f64 * LANE_WIDTH);
        Some((a - reach, b + reach))
    };

    let mut cuts = vec![SmallVec::<[NodeId; 2]>::new(); edges.len()];
    let mut connectors = vec![];
    for (i, j) in (0..edges.len()).tuple_combinations() {
        let (e1, e2) = (edges[i], edges[j]);
        if e1.0 == e2.0 || e1.0 == e2.1 || e1.1 == e2.0 || e1.1 == e2.1 {
            continue;
        }
        let (Some(s1), Some(s2)) = (extended(e1, &*merger), extended(e2, &*merger)) else {
            continue;
        };
        let Some(crossing) = segment_intersection(s1, s2) else {
            continue;
        };

        let at = Point2d::new(crossing.x.floor(), crossing.y.floor());
        let nearest = {
            let merger = &*merger;
            [e1.0, e1.1, e2.0, e2.1]
                .into_iter()
                .map(|node| (node, (merger.pos(node) - at).magnitude2()))
                .filter(|(_, dist)| *dist <= CROSSING_TOLERANCE_SQRD)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(node, _)| node)
        };
        let junction = nearest.unwrap_or_else(|| merger.node(crossing));

        let pos = merger.pos(junction);
        for (idx, (src, dst)) in [(i, e1), (j, e2)] {
            let (a, b) = (merger.pos(src), merger.pos(dst));
            let near_end = [a, b]
                .into_iter()
                .any(|end| (end - pos).magnitude2() <= CROSSING_TOLERANCE_SQRD);
            if near_end {
                continue;
            }
            let along = (pos - a).dot(b - a) / (b - a).magnitude2();
            let edge = if along <= 0.0 {
                Some((junction, src))
            } else if along >= 1.0 {
                Some((dst, junction))
            } else {
                if !cuts[idx].contains(&junction) {
                    cuts[idx].push(junction);
                }
                None
            };
            if let Some(edge) = edge.filter(|e| !connectors.contains(e)) {
                connectors.push(edge);
            }
        }
    }

    let splits = cuts.iter().filter(|c| !c.is_empty()).count();
    if splits + connectors.len() > 0 {
        log::debug!(
            "split {splits} roads and extended {} roads where they cross",
            connectors.len()
        );
    }

    edges
        .into_iter()
        .zip(cuts)
        .flat_map(|((src, dst), mut cuts)| {
            let origin = merger.pos(src);
            cuts.sort_by(|a, b| {
                let dist = |node: &NodeId| (merger.pos(*node) - origin).magnitude2();
                dist(a).total_cmp(&dist(b))
            });
            std::iter::once(src)
                .chain(cuts)
                .chain(std::iter::once(dst))
                .tuple_windows()
                .collect::<Vec<_>>()
        })
        .chain(connectors)
        .collect()
}

/// Translates the points so that they sit `PADDING` away from the origin,
/// and flips the y axis so it points up.
fn normalize_positions(positions: &mut [Point2d]) {
    let (min_x, min_y, max_y) = positions.iter().fold(
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(min_x, min_y, max_y), p| (min_x.min(p.x), min_y.min(p.y), max_y.max(p.y)),
    );
    let flip = max_y - min_y + PADDING;
    for p in positions {
        p.x -= min_x - PADDING;
        p.y = flip - (p.y - min_y);
    }
}
