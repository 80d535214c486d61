use car_sim::math::Point2d;
use car_sim::{BuildError, Polyline, SimEvent, Simulation, VehicleAttributes, VehicleKey};
use rand::SeedableRng;

/// Seconds of simulated time per rendered frame.
const FRAME_TIME: f64 = 1.0 / 60.0;

fn main() -> Result<(), BuildError> {
    env_logger::init();

    let roads = [
        Polyline::closed(vec![
            Point2d::new(0.0, 0.0),
            Point2d::new(60.0, 0.0),
            Point2d::new(120.0, 0.0),
            Point2d::new(120.0, 80.0),
            Point2d::new(60.0, 80.0),
            Point2d::new(0.0, 80.0),
        ]),
        Polyline::open(vec![Point2d::new(60.0, 0.0), Point2d::new(60.0, 80.0)]),
    ];
    let mut sim = Simulation::new(&roads)?;
    println!(
        "Built {} roads meeting at {} junctions",
        sim.network().edges().count(),
        sim.network().nodes().count()
    );

    let attributes = VehicleAttributes::default();
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let Some(vehicle) = sim.spawn_vehicle(&attributes, &mut rng) else {
        return Ok(());
    };

    sim.set_vehicle_key(vehicle, VehicleKey::Forward, true);
    for frame in 0..600 {
        match frame {
            180 => sim.set_vehicle_key(vehicle, VehicleKey::Right, true),
            240 => sim.set_vehicle_key(vehicle, VehicleKey::Right, false),
            420 => {
                sim.set_vehicle_key(vehicle, VehicleKey::Forward, false);
                sim.set_vehicle_key(vehicle, VehicleKey::Brake, true);
            }
            _ => {}
        }

        sim.advance(FRAME_TIME);

        for event in sim.take_events() {
            match event {
                SimEvent::JunctionSighted { node, .. } => println!("Approaching junction {node}"),
            }
        }

        if frame % 60 == 0 {
            let pos = sim.vehicle_position(vehicle);
            println!(
                "t={:>5.2}s  {}  pos=({:.1}, {:.1})  speed={:.2} m/s  {:?}",
                sim.frame() as f64 / sim.config().ticks_per_second as f64,
                sim.get_vehicle(vehicle).tracker(),
                pos.x,
                pos.y,
                sim.vehicle_speed(vehicle),
                sim.get_vehicle(vehicle).engine_state(),
            );
        }
    }

    Ok(())
}
