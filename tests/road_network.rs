//! Tests of road networks built from map polylines.

use car_sim::{math::Point2d, Polyline, Simulation, VehicleAttributes};
use rand::SeedableRng;

fn triangle() -> Polyline {
    Polyline::closed(vec![
        Point2d::new(0.0, 0.0),
        Point2d::new(40.0, 0.0),
        Point2d::new(20.0, 30.0),
    ])
}

/// Test that a closed triangle becomes three roads joined at three junctions.
#[test]
fn closed_triangle_forms_a_loop() {
    let sim = Simulation::new(&[triangle()]).unwrap();
    let network = sim.network();
    assert_eq!(network.edges().count(), 3);
    assert_eq!(network.nodes().count(), 3);
    for node in network.nodes() {
        assert_eq!(node.edges().len(), 2);
        assert!(node.pos().x >= 1.0 && node.pos().y >= 1.0);
    }
}

/// Test that a cross street sharing a vertex with the loop joins it.
#[test]
fn shared_vertices_join_roads() {
    let cross = Polyline::open(vec![Point2d::new(20.0, 30.0), Point2d::new(20.0, 60.0)]);
    let sim = Simulation::new(&[triangle(), cross]).unwrap();
    let network = sim.network();
    assert_eq!(network.nodes().count(), 4);
    let junction = network.nodes().find(|n| n.edges().len() == 3).unwrap();
    assert_eq!(network.neighbours(junction.id()).count(), 3);

    let dead_end = network.nodes().find(|n| n.edges().len() == 1).unwrap();
    let other = network
        .nodes()
        .find(|n| n.id() != junction.id() && n.id() != dead_end.id())
        .unwrap();
    let (path, length) = network.route(dead_end.id(), other.id()).unwrap();
    assert_eq!(path.len(), 3);
    assert_eq!(path[1], junction.id());
    assert!(length > 30.0);
}

/// Test that spawned vehicles start on a lane.
#[test]
fn spawned_vehicles_start_on_a_lane() {
    let mut sim = Simulation::new(&[triangle()]).unwrap();
    let mut rng = rand::rngs::StdRng::seed_from_u64(3);
    let vehicles = (0..5)
        .map(|_| {
            sim.spawn_vehicle(&VehicleAttributes::default(), &mut rng)
                .unwrap()
        })
        .collect::<Vec<_>>();
    sim.tick();
    for veh in vehicles {
        assert!(!sim.get_vehicle(veh).tracker().is_empty());
    }
    assert_eq!(sim.iter_vehicles().count(), 5);
}
