use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

use strix::config;
use strix::evaluator::{DesignComparison, EvaluationResult, Evaluator};
use strix::geometry::{quick_estimate, Preset};
use strix::io;
use strix::metrics::{BaselineComparison, NTR_REDUCTION_TARGET_PCT};
use strix::optimizer::{
    BestDesign, MultiObjectiveScore, Objective, ObjectiveWeights, OptimizationTrial, Optimizer,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SCHEMA_VERSION: &str = "1.0.0";
const PROGRAM_ID: &str = "STRIX-BIOACOUSTIC";

#[derive(Parser, Debug)]
#[command(name = "strix")]
#[command(version)]
#[command(about = "Strix - Bio-inspired propeller noise evaluation and design search")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Output path (CSV; JSON goes next to it)
    #[arg(short, long, global = true)]
    out: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate the configured design with and without its bio-inspired features
    Run {
        /// Generate JSON result bundle
        #[arg(long)]
        json: bool,
    },
    /// Rank the configured design against the standard presets by NTR
    Compare {
        /// Generate JSON result bundle
        #[arg(long)]
        json: bool,
    },
    /// Random search over feature parameters
    Optimize {
        /// Number of trials (overrides optimizer.iterations)
        #[arg(long)]
        iterations: Option<usize>,
        /// Random seed for reproducibility (overrides optimizer.seed)
        #[arg(long)]
        seed: Option<u64>,
        /// minimize_ntr, maximize_efficiency or maximize_reduction
        #[arg(long)]
        objective: Option<Objective>,
        /// Generate JSON result bundle
        #[arg(long)]
        json: bool,
    },
    /// Score feature combinations with the weighted multi-objective function
    Rank {
        /// Generate JSON result bundle
        #[arg(long)]
        json: bool,
    },
    /// Recommend features for the configured operating conditions
    Recommend,
    /// Validate a configuration file
    Validate,
    /// Print version information
    Version,
}

// ============================================================================
// JSON Output Structures
// ============================================================================

#[derive(Serialize)]
struct Manifest {
    schema_version: String,
    strix_version: String,
    program_id: String,
    timestamp_utc: String,
    git_commit: Option<String>,
    git_dirty: bool,
    platform: String,
    rust_version: String,
    config_hash: String,
    config_snapshot: config::Root,
}

#[derive(Serialize)]
struct RunBundle {
    manifest: Manifest,
    baseline: EvaluationResult,
    bio_inspired: EvaluationResult,
    comparison: Option<BaselineComparison>,
    wall_time_ms: f64,
}

#[derive(Serialize)]
struct CompareBundle {
    manifest: Manifest,
    comparison: DesignComparison,
}

#[derive(Serialize)]
struct OptimizeBundle {
    manifest: Manifest,
    objective: Objective,
    iterations: usize,
    seed: u64,
    best: Option<BestDesign>,
    history: Vec<OptimizationTrial>,
    wall_time_ms: f64,
}

#[derive(Serialize)]
struct RankBundle {
    manifest: Manifest,
    weights: ObjectiveWeights,
    ranking: Vec<MultiObjectiveScore>,
}

// ============================================================================
// Helper Functions
// ============================================================================

fn compute_hash(data: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn get_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let secs_per_day = 86400u64;
    let days_since_epoch = now / secs_per_day;
    let secs_today = now % secs_per_day;
    let hours = secs_today / 3600;
    let mins = (secs_today % 3600) / 60;
    let secs = secs_today % 60;

    let is_leap = |y: u64| y % 4 == 0 && (y % 100 != 0 || y % 400 == 0);
    let mut year = 1970u64;
    let mut remaining_days = days_since_epoch;
    loop {
        let days_in_year = if is_leap(year) { 366 } else { 365 };
        if remaining_days < days_in_year {
            break;
        }
        remaining_days -= days_in_year;
        year += 1;
    }
    let month_days = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let mut month = 1u64;
    for &days in &month_days {
        let d = if month == 2 && is_leap(year) { 29 } else { days };
        if remaining_days < d {
            break;
        }
        remaining_days -= d;
        month += 1;
    }
    let day = remaining_days + 1;

    format!("{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z", year, month, day, hours, mins, secs)
}

fn create_manifest(cfg: &config::Root, cfg_text: &str) -> Manifest {
    Manifest {
        schema_version: SCHEMA_VERSION.to_string(),
        strix_version: VERSION.to_string(),
        program_id: PROGRAM_ID.to_string(),
        timestamp_utc: get_timestamp(),
        git_commit: None,
        git_dirty: false,
        platform: std::env::consts::OS.to_string(),
        rust_version: "stable".to_string(),
        config_hash: compute_hash(cfg_text),
        config_snapshot: cfg.clone(),
    }
}

fn evaluator_for(cfg: &config::Root) -> Evaluator {
    Evaluator::new().with_observer_distance(cfg.observer.distance_m)
}

fn create_writer(out_path: &str) -> Result<io::CsvWriter> {
    if let Some(dir) = Path::new(out_path).parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create output dir: {}", dir.display()))?;
        }
    }
    io::CsvWriter::create(out_path)
        .with_context(|| format!("failed to create output: {}", out_path))
}

fn write_json<T: Serialize>(out_path: &str, bundle: &T) -> Result<()> {
    let json_path = io::json_path(out_path);
    let json = serde_json::to_string_pretty(bundle)?;
    fs::write(&json_path, json)?;
    eprintln!("[strix] JSON bundle: {}", json_path.display());
    Ok(())
}

fn load_config(cfg_path: Option<String>) -> Result<(config::Root, String)> {
    let cfg_path = cfg_path.context("--config required")?;
    let (cfg, cfg_text) = config::Root::load(&cfg_path)?;
    eprintln!("[strix] {} v{} - {}", cfg.strix.program, cfg.strix.version, cfg.strix.module);
    Ok((cfg, cfg_text))
}

// ============================================================================
// Run Modes
// ============================================================================

fn run_single(cfg: &config::Root, cfg_text: &str, out_path: &str, json_output: bool) -> Result<()> {
    let base = cfg.geometry.build();
    let features = cfg.features.kinds()?;
    let configs = cfg.features.configs(&base);
    let evaluator = evaluator_for(cfg);

    let start = Instant::now();
    let baseline = evaluator.evaluate(&base, &cfg.conditions, None);
    let bio = evaluator.evaluate_bio_inspired_with(
        &base,
        &features,
        &cfg.conditions,
        Some(baseline.metrics.ntr),
        Some(&configs),
    );
    let wall_time_ms = start.elapsed().as_secs_f64() * 1000.0;

    let mut w = create_writer(out_path)?;
    w.write_header()?;
    w.write_row("baseline", &baseline)?;
    w.write_row("bio_inspired", &bio)?;
    w.flush()?;

    let quick = quick_estimate(&base, &cfg.conditions);
    eprintln!(
        "[strix] baseline: spl={:.2} dB thrust={:.4} N power={:.2} W ntr={:.4} (quick ntr={:.4})",
        baseline.noise.total_spl_db,
        baseline.thrust.thrust_n,
        baseline.thrust.power_w,
        baseline.metrics.ntr,
        quick.ntr
    );

    if let Some(composition) = &bio.composition {
        for estimate in &composition.individual {
            eprintln!(
                "  {:<22} -{:.2} dB (effectiveness {:.3})",
                estimate.kind.label(),
                estimate.reduction_db,
                estimate.effectiveness_factor
            );
        }
        eprintln!(
            "  synergy x{:.2}, total -{:.2} dB",
            composition.synergy_multiplier, composition.total_reduction_db
        );
    }

    let comparison = bio.metrics.compare_to_baseline(baseline.metrics.ntr);
    eprintln!(
        "[strix] bio-inspired: spl={:.2} dB ntr={:.4} reduction={:.2}%",
        bio.noise.total_spl_db,
        bio.metrics.ntr,
        bio.metrics.reduction_pct.unwrap_or(0.0)
    );
    match comparison {
        Some(c) if c.meets_target => {
            eprintln!("[strix] target met ({:.0}% NTR reduction)", NTR_REDUCTION_TARGET_PCT)
        }
        Some(_) => eprintln!(
            "[strix] WARNING: below the {:.0}% NTR reduction target",
            NTR_REDUCTION_TARGET_PCT
        ),
        None => eprintln!("[strix] WARNING: baseline NTR is not positive, no comparison"),
    }

    if json_output {
        let bundle = RunBundle {
            manifest: create_manifest(cfg, cfg_text),
            baseline,
            bio_inspired: bio,
            comparison,
            wall_time_ms,
        };
        write_json(out_path, &bundle)?;
    }

    Ok(())
}

fn run_compare(cfg: &config::Root, cfg_text: &str, out_path: &str, json_output: bool) -> Result<()> {
    let mut configured = cfg.geometry.build();
    if configured.name.is_empty() {
        configured.name = "Configured".to_string();
    }
    let mut designs = vec![configured];
    for preset in [Preset::Standard2Blade, Preset::Standard3Blade, Preset::Standard4Blade] {
        designs.push(preset.geometry());
    }

    let comparison = evaluator_for(cfg).compare(&designs, &cfg.conditions);

    let mut w = create_writer(out_path)?;
    w.write_header()?;
    for (rank, design) in comparison.designs.iter().enumerate() {
        w.write_row(&design.name, &design.evaluation)?;
        eprintln!(
            "  #{} {:<28} ntr={:.4} spl={:.2} dB thrust={:.4} N",
            rank + 1,
            design.name,
            design.ntr,
            design.noise_db,
            design.thrust_n
        );
    }
    w.flush()?;

    if let Some(best) = comparison.best() {
        eprintln!("[strix] best design: {} (ntr={:.4})", best.name, best.ntr);
    }

    if json_output {
        let bundle = CompareBundle {
            manifest: create_manifest(cfg, cfg_text),
            comparison,
        };
        write_json(out_path, &bundle)?;
    }

    Ok(())
}

fn run_optimize(
    cfg: &config::Root,
    cfg_text: &str,
    out_path: &str,
    iterations: usize,
    seed: u64,
    objective: Objective,
    json_output: bool,
) -> Result<()> {
    let base = cfg.geometry.build();
    let features = cfg.features.kinds()?;

    let mut optimizer = Optimizer::new(StdRng::seed_from_u64(seed))
        .with_evaluator(evaluator_for(cfg))
        .with_ranges(cfg.optimizer.ranges);

    eprintln!(
        "[strix] optimize: objective={} iterations={} seed={} features={}",
        objective.name(),
        iterations,
        seed,
        features.len()
    );

    let start = Instant::now();
    let best = optimizer.optimize(&base, &features, &cfg.conditions, objective, iterations);
    let wall_time_ms = start.elapsed().as_secs_f64() * 1000.0;

    let mut w = create_writer(out_path)?;
    w.write_trial_header()?;
    for trial in optimizer.history() {
        w.write_trial(trial)?;
    }
    w.flush()?;

    match &best {
        Some(b) => {
            eprintln!(
                "[strix] best trial {}: score={:.6} ntr={:.4} (baseline {:.4}, {:.2}% better)",
                b.iteration, b.score, b.evaluation.metrics.ntr, b.baseline_ntr, b.improvement_pct
            );
        }
        None => eprintln!("[strix] WARNING: no trial improved on the initial score"),
    }
    eprintln!("[strix] {} trials in {:.1} ms", optimizer.history().len(), wall_time_ms);

    if json_output {
        let bundle = OptimizeBundle {
            manifest: create_manifest(cfg, cfg_text),
            objective,
            iterations,
            seed,
            best,
            history: optimizer.history().to_vec(),
            wall_time_ms,
        };
        write_json(out_path, &bundle)?;
    }

    Ok(())
}

fn run_rank(cfg: &config::Root, cfg_text: &str, out_path: &str, json_output: bool) -> Result<()> {
    let base = cfg.geometry.build();
    let evaluator = evaluator_for(cfg);
    let combinations: Vec<_> = evaluator
        .composer
        .generate_variants(&base, 5)
        .into_iter()
        .map(|v| v.features)
        .collect();

    let optimizer = Optimizer::new(StdRng::seed_from_u64(cfg.optimizer.seed)).with_evaluator(evaluator);
    let weights = cfg.optimizer.weights;
    let ranking = optimizer.multi_objective(&base, &combinations, &cfg.conditions, &weights);

    let mut w = create_writer(out_path)?;
    w.write_header()?;
    for (rank, score) in ranking.iter().enumerate() {
        let name = if score.features.is_empty() {
            "baseline".to_string()
        } else {
            score.features.iter().map(|k| k.name()).collect::<Vec<_>>().join("+")
        };
        w.write_row(&name, &score.evaluation)?;
        eprintln!(
            "  #{} {:<56} score={:.2} reduction={:.2}% efficiency={:.3} manufacturability={:.0}",
            rank + 1,
            name,
            score.total_score,
            score.noise_reduction_pct,
            score.efficiency,
            score.manufacturability
        );
    }
    w.flush()?;

    if json_output {
        let bundle = RankBundle {
            manifest: create_manifest(cfg, cfg_text),
            weights,
            ranking,
        };
        write_json(out_path, &bundle)?;
    }

    Ok(())
}

fn run_recommend(cfg: &config::Root) -> Result<()> {
    let evaluator = evaluator_for(cfg);
    let picks = evaluator
        .composer
        .recommend(&cfg.conditions, Some(&cfg.constraints));

    eprintln!(
        "[strix] rpm={} velocity={} m/s complexity={:?} stiffness={}",
        cfg.conditions.rpm,
        cfg.conditions.velocity_m_s,
        cfg.constraints.manufacturing_complexity,
        cfg.constraints.require_stiffness
    );
    if picks.is_empty() {
        eprintln!("[strix] no features recommended");
        return Ok(());
    }
    for kind in &picks {
        eprintln!("  - {} ({})", kind.label(), kind.name());
    }

    let base = cfg.geometry.build();
    let baseline = evaluator.evaluate(&base, &cfg.conditions, None);
    let bio = evaluator.evaluate_bio_inspired(&base, &picks, &cfg.conditions, Some(baseline.metrics.ntr));
    eprintln!(
        "[strix] expected: ntr {:.4} -> {:.4} ({:.2}% reduction)",
        baseline.metrics.ntr,
        bio.metrics.ntr,
        bio.metrics.reduction_pct.unwrap_or(0.0)
    );
    Ok(())
}

fn validate_config(cfg_path: &str) -> Result<()> {
    let (cfg, _) = config::Root::load(cfg_path)?;
    let g = cfg.geometry.build();

    eprintln!("[strix] config valid: {}", cfg_path);
    eprintln!("  program: {} v{}", cfg.strix.program, cfg.strix.version);
    eprintln!(
        "  geometry: {} blades={} radius={} m chord={} m pitch={} deg",
        g.name, g.blade_count, g.radius_m, g.chord_length_m, g.pitch_angle_deg
    );
    eprintln!(
        "  conditions: rpm={} velocity={} m/s density={} kg/m3",
        cfg.conditions.rpm, cfg.conditions.velocity_m_s, cfg.conditions.air_density
    );
    eprintln!("  features: {}", cfg.features.enabled.join(", "));
    eprintln!(
        "  optimizer: objective={} iterations={} seed={}",
        cfg.optimizer.objective.name(),
        cfg.optimizer.iterations,
        cfg.optimizer.seed
    );
    eprintln!("  observer: distance={} m", cfg.observer.distance_m);

    Ok(())
}

fn print_version() {
    eprintln!("STRIX - Bio-Inspired Propeller Noise Evaluation");
    eprintln!();
    eprintln!("  Program ID:        {}", PROGRAM_ID);
    eprintln!("  Version:           {}", VERSION);
    eprintln!("  Schema Version:    {}", SCHEMA_VERSION);
    eprintln!("  Platform:          {}", std::env::consts::OS);
    eprintln!("  Architecture:      {}", std::env::consts::ARCH);
    eprintln!();
    eprintln!("Acoustic Model:");
    eprintln!("  - Broadband, tonal (blade passage harmonics) and tip-vortex components");
    eprintln!("  - Noise-to-thrust ratio against blade-element thrust");
    eprintln!();
    eprintln!("Bio-Inspired Features:");
    eprintln!("  - owl_serrations:         trailing-edge serrations");
    eprintln!("  - humpback_tubercles:     leading-edge tubercles");
    eprintln!("  - dragonfly_corrugations: surface corrugations");
    eprintln!();
    eprintln!("Design Search:");
    eprintln!("  - Seeded random search (minimize_ntr, maximize_efficiency, maximize_reduction)");
    eprintln!("  - Weighted multi-objective ranking of feature combinations");
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Version => {
            print_version();
            Ok(())
        }
        Commands::Validate => {
            let cfg_path = args.config.context("--config required for validate")?;
            validate_config(&cfg_path)
        }
        Commands::Recommend => {
            let (cfg, _) = load_config(args.config)?;
            run_recommend(&cfg)
        }
        Commands::Run { json } => {
            let out_path = args.out.unwrap_or_else(|| "results/run.csv".to_string());
            let (cfg, cfg_text) = load_config(args.config)?;
            run_single(&cfg, &cfg_text, &out_path, json)
        }
        Commands::Compare { json } => {
            let out_path = args.out.unwrap_or_else(|| "results/comparison.csv".to_string());
            let (cfg, cfg_text) = load_config(args.config)?;
            run_compare(&cfg, &cfg_text, &out_path, json)
        }
        Commands::Optimize { iterations, seed, objective, json } => {
            let out_path = args.out.unwrap_or_else(|| "results/optimization.csv".to_string());
            let (cfg, cfg_text) = load_config(args.config)?;
            let iterations = iterations.unwrap_or(cfg.optimizer.iterations);
            let seed = seed.unwrap_or(cfg.optimizer.seed);
            let objective = objective.unwrap_or(cfg.optimizer.objective);
            run_optimize(&cfg, &cfg_text, &out_path, iterations, seed, objective, json)
        }
        Commands::Rank { json } => {
            let out_path = args.out.unwrap_or_else(|| "results/ranking.csv".to_string());
            let (cfg, cfg_text) = load_config(args.config)?;
            run_rank(&cfg, &cfg_text, &out_path, json)
        }
    }
}
