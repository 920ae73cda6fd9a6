use std::ops::ControlFlow;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

use grid_traffic_sim::simulation::{
    CrossingTiming, LightTiming, ParkingConfig, RoadSize, SimConfig, SimWorld, TickSnapshot,
};

#[derive(Parser)]
#[command(name = "grid_traffic_sim")]
#[command(about = "Discrete-time traffic simulation on a grid road network")]
struct Cli {
    /// Road network size: small (10x15), medium (15x20) or large (20x30)
    #[arg(long, default_value = "small")]
    size: RoadSize,

    /// Number of simulation ticks to run
    #[arg(long, default_value = "50")]
    ticks: u64,

    /// Traffic light durations as "red,green"
    #[arg(long, default_value = "5,4")]
    light_timing: LightTiming,

    /// Crossing durations as "single_lane,double_lane"
    #[arg(long, default_value = "1,3")]
    crossing_timing: CrossingTiming,

    /// Chance per tick that an idle crossing activates
    #[arg(long, default_value = "0.3")]
    crossing_probability: f64,

    /// Only activate crossings while no vehicle stands on them
    #[arg(long)]
    crossing_waits_for_clear_road: bool,

    /// Chance that a vehicle at a junction turns instead of going straight
    #[arg(long, default_value = "0.5")]
    turn_probability: f64,

    /// Spawn a vehicle every this many ticks (0 disables spawning)
    #[arg(long, default_value = "1")]
    spawn_interval: u32,

    /// Enable street and building parking
    #[arg(long)]
    parking: bool,

    /// Average parking stay in ticks
    #[arg(long, default_value = "5")]
    parking_stay: u32,

    /// Ticks a parking maneuver blocks its cell
    #[arg(long, default_value = "1")]
    parking_delay: u32,

    /// Fraction of every lot occupied before the first tick
    #[arg(long, default_value = "0.3")]
    parking_occupancy: f64,

    /// Chance per tick that a vehicle on a lot cell asks to park
    #[arg(long, default_value = "0.2")]
    parking_probability: f64,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Print the map every N ticks (0 prints only the final map)
    #[arg(long, default_value = "0")]
    map_every: u64,

    /// Print the road network layout before running
    #[arg(long)]
    show_network: bool,
}

impl Cli {
    fn config(&self) -> SimConfig {
        SimConfig {
            road_size: self.size,
            ticks: self.ticks,
            light_timing: self.light_timing,
            crossing_timing: self.crossing_timing,
            crossing_probability: self.crossing_probability,
            crossing_waits_for_clear_road: self.crossing_waits_for_clear_road,
            turn_probability: self.turn_probability,
            spawn_interval: self.spawn_interval,
            seed: self.seed,
            parking: ParkingConfig {
                enabled: self.parking,
                average_stay: self.parking_stay,
                maneuver_delay_ticks: self.parking_delay,
                initial_occupancy: self.parking_occupancy,
                request_probability: self.parking_probability,
            },
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    run_headless(cli.config(), cli.map_every, cli.show_network)
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(config: SimConfig, map_every: u64, show_network: bool) -> Result<()> {
    let ticks = config.ticks;
    let mut world = SimWorld::new(config).context("failed to build the simulation world")?;

    info!(
        "Running {} ticks on a {}x{} grid",
        ticks,
        world.network.rows(),
        world.network.cols()
    );
    if show_network {
        println!("{}", world.network);
    }

    println!("Initial state:");
    world.print_summary();
    println!();

    let network = world.network.clone();
    let mut print_maps = |snapshot: &TickSnapshot| {
        if map_every > 0 && snapshot.tick % map_every == 0 {
            println!("--- After tick {} ---", snapshot.tick);
            print!("{}", snapshot.render(&network));
            println!();
        }
        ControlFlow::Continue(())
    };
    world
        .run(ticks, &mut print_maps)
        .context("simulation aborted")?;

    println!("=== Final State ===");
    world.print_summary();
    world.draw_map();

    world.metrics.log_report();
    Ok(())
}
