//! Headless ink diagnostic
//!
//! Stirs the fluid with a circling impulse and prints grid statistics:
//! - Kinetic energy and enstrophy over time
//! - Divergence before and after projection
//! - Particle respawn counts and spread
//!
//! Run with: RUST_LOG=debug cargo run --example ink_diagnostic -p ink-sim --release

use ink::diagnostics::GridStats;
use ink::{DragTracker, InkConfig, InkSimulation, Vec3};

const RESOLUTION: usize = 32;
const CELL_SIZE: f32 = 1.0 / 32.0;
const DT: f32 = 1.0 / 60.0;
const FRAMES: usize = 240;
const STIR_FRAMES: usize = 120;

fn main() {
    env_logger::init();

    println!("=== Ink Diagnostic ===\n");

    let mut config = InkConfig::with_grid(RESOLUTION, RESOLUTION, RESOLUTION, CELL_SIZE);
    config.max_particles = 20_000;
    config.initial_particles = 20_000;
    config.max_age = Some(6.0);

    let mut sim = match InkSimulation::new(config) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("bad config: {}", err);
            return;
        }
    };

    // A pointer circling the center stands in for mouse drags
    let mut drag = DragTracker::new(0.08, 0.5);
    let mut total_respawned = 0;

    println!(
        "{:>5} {:>10} {:>10} {:>9} {:>10} {:>10} {:>8}",
        "frame", "energy", "enstrophy", "max|v|", "div_in", "div_out", "respawn"
    );

    for frame in 0..FRAMES {
        if frame < STIR_FRAMES {
            let angle = frame as f32 * 0.15;
            let pointer = Vec3::new(0.5 + 0.25 * angle.cos(), 0.5, 0.5 + 0.25 * angle.sin());
            if let Some(impulse) = drag.move_to(pointer, DT) {
                sim.enqueue(impulse);
            }
        } else if frame == STIR_FRAMES {
            drag.release();
        }

        let report = match sim.step(DT) {
            Ok(report) => report,
            Err(err) => {
                eprintln!("frame {} failed: {}", frame, err);
                return;
            }
        };
        total_respawned += report.respawned;

        if let Some(instability) = report.instability {
            println!("!! frame {}: {:?}", report.frame, instability);
        }

        if frame % 20 == 0 || frame + 1 == FRAMES {
            let stats = GridStats::collect(sim.grid());
            println!(
                "{:>5} {:>10.3e} {:>10.3e} {:>9.4} {:>10.3e} {:>10.3e} {:>8}",
                report.frame,
                stats.kinetic_energy,
                stats.enstrophy,
                stats.max_speed,
                report.solve.divergence_before,
                report.solve.divergence_after,
                report.respawned
            );
        }
    }

    // Particle spread
    let snapshot = sim.snapshot();
    let n = snapshot.len().max(1) as f32;
    let centroid = snapshot
        .iter()
        .map(|v| Vec3::from_array(v.position))
        .sum::<Vec3>()
        / n;
    let spread = (snapshot
        .iter()
        .map(|v| Vec3::from_array(v.position).distance_squared(centroid))
        .sum::<f32>()
        / n)
        .sqrt();

    println!("\n=== Summary ===");
    println!("Simulated time: {:.2}s over {} frames", sim.time(), sim.frame());
    println!("Particles alive: {} / {}", sim.particles().len(), sim.particles().capacity());
    println!("Total respawns: {}", total_respawned);
    println!("Centroid: {:?}", centroid);
    println!("RMS spread: {:.4}", spread);
}
