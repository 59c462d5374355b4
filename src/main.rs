//! Cloud lattice CLI - Run simulations from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::path::PathBuf;
use std::time::Instant;

use cloud_lattice::{
    compute::{CloudSimulator, LatticeStats},
    schema::{Seed, SimulationConfig},
    texture::{NullSink, SnapshotLayout, SnapshotRecorder, TextureSink},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let mut args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print_example_config();
        return;
    }

    let record_path = take_flag(&mut args, "--record").map(PathBuf::from);
    let batch_cycles: Option<u64> = take_flag(&mut args, "--batch").map(|s| {
        s.parse().unwrap_or_else(|e| {
            eprintln!("Invalid --batch value {:?}: {}", s, e);
            std::process::exit(1);
        })
    });

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <config.json> [seconds] [fps] [--record <out.cldt>] [--batch <cycles>]",
            args[0]
        );
        eprintln!();
        eprintln!("Run a cloud lattice simulation from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to simulation configuration file");
        eprintln!("  seconds      Simulated host time (default: two run periods)");
        eprintln!("  fps          Host frame rate (default: 60)");
        eprintln!("  --record     Append every finished droplet frame to a .cldt file");
        eprintln!("  --batch      Run whole cycles on the parallel batch path instead");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    let config_path = PathBuf::from(&args[1]);
    let config = SimulationConfig::from_json_file(&config_path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });
    let seconds: f32 = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(config.run_period * 2.0);
    let fps: f32 = args
        .get(3)
        .and_then(|s| s.parse().ok())
        .filter(|fps: &f32| *fps > 0.0)
        .unwrap_or(60.0);

    // Load or create seed
    let seed_path = config_path.with_extension("seed.json");
    let seed: Seed = if seed_path.exists() {
        let seed_str = std::fs::read_to_string(&seed_path).unwrap_or_else(|e| {
            eprintln!("Error reading seed file: {}", e);
            std::process::exit(1);
        });
        serde_json::from_str(&seed_str).unwrap_or_else(|e| {
            eprintln!("Error parsing seed: {}", e);
            std::process::exit(1);
        })
    } else {
        Seed::default()
    };

    println!("Cloud Lattice Simulation");
    println!("========================");
    println!(
        "Lattice: {}x{}x{} ({} cells)",
        config.width,
        config.height,
        config.depth,
        config.volume()
    );
    println!("Mode: {:?}", config.mode);
    println!("Run period: {}s", config.run_period);
    match batch_cycles {
        Some(cycles) => println!("Batch cycles: {}", cycles),
        None => println!("Host time: {}s at {} fps", seconds, fps),
    }
    println!();

    let mut sim = CloudSimulator::with_seed(config, &seed).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    let mut recorder = record_path.as_ref().map(|path| {
        SnapshotRecorder::create(path, sim.lattice().dims(), SnapshotLayout::Volume)
            .unwrap_or_else(|e| {
                eprintln!("Error creating {}: {}", path.display(), e);
                std::process::exit(1);
            })
    });

    print_stats("Initial state", &LatticeStats::from_lattice(sim.lattice()));

    println!("Running simulation...");
    let start = Instant::now();
    {
        let mut null_sink = NullSink;
        let sink: &mut dyn TextureSink = match recorder.as_mut() {
            Some(recorder) => recorder,
            None => &mut null_sink,
        };
        match batch_cycles {
            Some(cycles) => run_batch(&mut sim, cycles, sink),
            None => run_frames(&mut sim, seconds, fps, sink),
        }
    }
    let elapsed = start.elapsed();

    println!();
    print_stats("Final state", &LatticeStats::from_lattice(sim.lattice()));
    println!("Frames: {}", sim.frames());
    println!("Cycles completed: {}", sim.cycles_completed());
    println!("Time: {:.2}s", elapsed.as_secs_f32());

    if let Some(recorder) = recorder {
        match recorder.finalize() {
            Ok(frames) => println!("Recorded {} frames", frames),
            Err(e) => {
                eprintln!("Error writing recording: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run_frames(sim: &mut CloudSimulator, seconds: f32, fps: f32, sink: &mut dyn TextureSink) {
    let dt = 1.0 / fps;
    let frames = (seconds * fps).ceil().max(1.0) as u64;
    for i in 0..frames {
        let report = sim.advance_with(dt, &mut *sink);
        if report.restarted {
            println!("  Run period elapsed at frame {}", i + 1);
        }

        // Print progress every 10%
        if (i + 1) % (frames / 10).max(1) == 0 {
            let stats = LatticeStats::from_lattice(sim.lattice());
            println!(
                "  Frame {}/{}: stage={:?}, cycles={}, mass={:.6}, max_droplets={:.6}",
                i + 1,
                frames,
                sim.stage(),
                sim.cycles_completed(),
                stats.total_mass(),
                stats.max_droplets
            );
        }
    }
}

fn run_batch(sim: &mut CloudSimulator, cycles: u64, sink: &mut dyn TextureSink) {
    for i in 0..cycles {
        let report = sim.run_batch_cycle(&mut *sink);
        if (i + 1) % (cycles / 10).max(1) == 0 {
            let stats = LatticeStats::from_lattice(sim.lattice());
            println!(
                "  Cycle {}/{}: dropped={}, mass={:.6}, max_droplets={:.6}",
                i + 1,
                cycles,
                report.dropped_cells,
                stats.total_mass(),
                stats.max_droplets
            );
        }
    }
}

fn print_stats(label: &str, stats: &LatticeStats) {
    println!("{}:", label);
    println!("  Total vapor: {:.6}", stats.total_vapor);
    println!("  Total droplets: {:.6}", stats.total_droplets);
    println!("  Active cells: {}", stats.active_cells);
    println!(
        "  Droplets mean/max: {:.6}/{:.6}",
        stats.mean_droplets, stats.max_droplets
    );
    println!();
}

/// Remove `flag` and its value from `args`.
fn take_flag(args: &mut Vec<String>, flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    if pos + 1 >= args.len() {
        eprintln!("{} needs a value", flag);
        std::process::exit(1);
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Some(value)
}

fn print_example_config() {
    let config = SimulationConfig::default();
    let seed = Seed::default();

    let to_json = |value: serde_json::Result<String>| {
        value.unwrap_or_else(|e| {
            eprintln!("Error serializing example: {}", e);
            std::process::exit(1);
        })
    };

    println!("Example configuration (config.json):");
    println!("{}", to_json(serde_json::to_string_pretty(&config)));
    println!();
    println!("Example seed (config.seed.json):");
    println!("{}", to_json(serde_json::to_string_pretty(&seed)));
}
