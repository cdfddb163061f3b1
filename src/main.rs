//! Keyframe reduction CLI - Reduce an animation CSV from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use keyframe_reduce::{
    animation::{format_summary, load_series, save_error_table, save_history, save_series},
    compute::{
        AnimationSeries, CpuBackend, HighDimCubic, Interpolator, PairwiseErrorBackend, SelectionError,
        SelectionManager, gpu::GpuBackend, reduce_channel,
    },
    schema::{BackendKind, ReductionConfig},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_config();
        return;
    }

    if args.len() < 2 {
        eprintln!("Usage: {} <animation.csv> [config.json]", args[0]);
        eprintln!();
        eprintln!("Select keyframes for an animation stored as CSV.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  animation.csv  One pose per row, header Frame,Dimension-1,...");
        eprintln!("  config.json    Reduction configuration (default: 10 keyframes, line error)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    let series_path = PathBuf::from(&args[1]);

    // Load configuration
    let config: ReductionConfig = match args.get(2) {
        Some(path) => {
            let config_str = fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("Error reading config file: {}", e);
                std::process::exit(1);
            });
            serde_json::from_str(&config_str).unwrap_or_else(|e| {
                eprintln!("Error parsing config: {}", e);
                std::process::exit(1);
            })
        }
        None => ReductionConfig::default(),
    };
    config.validate().unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    let series = load_series(&series_path).unwrap_or_else(|e| {
        eprintln!("Error reading animation {}: {}", series_path.display(), e);
        std::process::exit(1);
    });

    println!("Keyframe Reduction");
    println!("==================");
    println!(
        "Animation: {} frames x {} channels",
        series.n_frames(),
        series.n_dims()
    );
    println!("Metric: {:?}", config.metric);
    println!("Target keyframes: {}", config.keyframes);
    println!("Fixed keyframes: {:?}", config.fixed_keyframes);
    println!();

    let backend = create_backend(&config);

    let start = Instant::now();
    let mut manager = SelectionManager::with_backend(
        &series,
        config.metric,
        &config.fixed_keyframes,
        backend.as_ref(),
    )
    .unwrap_or_else(|e| {
        eprintln!("Error preparing segments: {}", e);
        std::process::exit(1);
    });

    match manager.increment_until_n_keyframes(config.keyframes) {
        Ok(()) => {}
        Err(SelectionError::AllocationExhausted { reached, .. }) => {
            println!("Every frame is a keyframe at {} keyframes", reached);
        }
        Err(e) => {
            eprintln!("Error selecting keyframes: {}", e);
            std::process::exit(1);
        }
    }
    let elapsed = start.elapsed();

    println!("Segments: {:?}", manager.segment_bounds());
    println!();
    println!("Selections (error|keyframes):");
    print!("{}", format_summary(manager.history()));
    println!();

    let selection = manager.combined_selection().unwrap_or_else(|e| {
        eprintln!("Error reading selection: {}", e);
        std::process::exit(1);
    });
    let interpolator = Interpolator::fit(&series, &selection).unwrap_or_else(|e| {
        eprintln!("Error fitting curves: {}", e);
        std::process::exit(1);
    });
    println!("Curves:");
    print_curves(&interpolator);

    if let Some(dim) = config.output.curve_channel {
        match reduce_channel(&series, dim, &selection) {
            Ok(channel) => {
                println!();
                println!("Channel {} curves:", dim);
                print_curves(&channel);
            }
            Err(e) => {
                eprintln!("Error fitting channel {}: {}", dim, e);
                std::process::exit(1);
            }
        }
    }

    write_outputs(&config, &manager, &series);

    println!();
    println!(
        "Selected {} keyframes, max error {:.4} ({:.2}s)",
        manager.total_keyframes(),
        manager.max_error_across_segments().unwrap_or_default(),
        elapsed.as_secs_f32()
    );
}

/// Backend named by the configuration, falling back to the CPU when no GPU is usable.
fn create_backend(config: &ReductionConfig) -> Box<dyn PairwiseErrorBackend> {
    match config.backend.kind {
        BackendKind::Cpu => Box::new(CpuBackend),
        BackendKind::Gpu => match GpuBackend::blocking(config.backend.shader_dir.as_deref()) {
            Ok(gpu) => Box::new(gpu),
            Err(e) => {
                log::warn!("GPU backend unavailable ({}), using CPU backend", e);
                Box::new(CpuBackend)
            }
        },
    }
}

fn print_curves(interpolator: &Interpolator) {
    for (w, cubic) in interpolator
        .keyframes()
        .windows(2)
        .zip(interpolator.segments())
    {
        println!("  [{}, {}] {}", w[0], w[1], describe_cubic(cubic));
    }
}

fn describe_cubic(cubic: &HighDimCubic) -> String {
    let points: Vec<String> = [&cubic.p1, &cubic.p2, &cubic.p3, &cubic.p4]
        .iter()
        .map(|p| {
            let coords: Vec<String> = p.iter().map(|v| format!("{:.4}", v)).collect();
            format!("({})", coords.join(", "))
        })
        .collect();
    points.join(" ")
}

fn write_outputs(config: &ReductionConfig, manager: &SelectionManager, series: &AnimationSeries) {
    let output = &config.output;

    if let Some(path) = &output.selections_csv {
        save_history(path, manager.history()).unwrap_or_else(|e| {
            eprintln!("Error writing {}: {}", path.display(), e);
            std::process::exit(1);
        });
        println!("Wrote selections to {}", path.display());
    }

    if let Some(path) = &output.error_table_csv
        && let Some(selector) = manager.selector(0)
    {
        save_error_table(path, selector.table()).unwrap_or_else(|e| {
            eprintln!("Error writing {}: {}", path.display(), e);
            std::process::exit(1);
        });
        println!("Wrote error table to {}", path.display());
    }

    if let Some(path) = &output.series_csv {
        save_series(path, series).unwrap_or_else(|e| {
            eprintln!("Error writing {}: {}", path.display(), e);
            std::process::exit(1);
        });
        println!("Wrote series to {}", path.display());
    }
}

fn print_example_config() {
    let config = ReductionConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
