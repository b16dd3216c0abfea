//! 3-max CFR+ training binary.
//!
//! Usage:
//!   cargo run --release --bin solve_3max -- [OPTIONS]
//!
//! Options:
//!   --config <FILE>            Run configuration JSON (table, solver, abstraction)
//!   --iterations <N>           Iterations to train (default: 1000)
//!   --hands <N>                Hands per iteration
//!   --threads <N>              Train on N threads (default: sequential)
//!   --seed <N>                 Random seed
//!   --stack <BB>               Starting stack for every seat
//!   --coarse                   Use the coarse abstraction
//!   --checkpoint-every <N>     Checkpoint interval in iterations
//!   --out <DIR>                Checkpoint directory (default: policy)
//!   --compress                 Write .json.zst checkpoints (needs the zstd feature)
//!   --warm-start <FILE>        Seed strategy sums from a policy file
//!   --resume <FILE>            Resume from a saved solver state
//!   --save-state <FILE>        Save the solver state after training
//!
//! Set `RUST_LOG=debug` to see the per-checkpoint policy change.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};

use rust_solver_3max::cfr::{CfrPlusSolver, PolicyTable};
use rust_solver_3max::games::holdem::{AbstractionMode, RunConfig, ThreeMaxGame};
use rust_solver_3max::Result;

struct Args {
    config_file: Option<PathBuf>,
    iterations: u64,
    hands: Option<usize>,
    threads: Option<usize>,
    seed: Option<u64>,
    stack: Option<f64>,
    coarse: bool,
    checkpoint_every: Option<u64>,
    out_dir: PathBuf,
    compress: bool,
    warm_start: Option<PathBuf>,
    resume: Option<PathBuf>,
    save_state: Option<PathBuf>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config_file: None,
            iterations: 1000,
            hands: None,
            threads: None,
            seed: None,
            stack: None,
            coarse: false,
            checkpoint_every: None,
            out_dir: PathBuf::from("policy"),
            compress: false,
            warm_start: None,
            resume: None,
            save_state: None,
        }
    }
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<&String>) -> std::result::Result<T, String> {
    let raw = value.ok_or_else(|| format!("{} needs a value", flag))?;
    raw.parse()
        .map_err(|_| format!("invalid value '{}' for {}", raw, flag))
}

fn parse_args() -> std::result::Result<Option<Args>, String> {
    let argv: Vec<String> = env::args().skip(1).collect();
    let mut args = Args::default();
    let mut it = argv.iter();

    while let Some(flag) = it.next() {
        match flag.as_str() {
            "--config" | "-c" => args.config_file = Some(parse_value(flag, it.next())?),
            "--iterations" | "-i" => args.iterations = parse_value(flag, it.next())?,
            "--hands" => args.hands = Some(parse_value(flag, it.next())?),
            "--threads" | "-t" => args.threads = Some(parse_value(flag, it.next())?),
            "--seed" | "-s" => args.seed = Some(parse_value(flag, it.next())?),
            "--stack" => args.stack = Some(parse_value(flag, it.next())?),
            "--coarse" => args.coarse = true,
            "--checkpoint-every" => args.checkpoint_every = Some(parse_value(flag, it.next())?),
            "--out" | "-o" => args.out_dir = parse_value(flag, it.next())?,
            "--compress" => args.compress = true,
            "--warm-start" => args.warm_start = Some(parse_value(flag, it.next())?),
            "--resume" => args.resume = Some(parse_value(flag, it.next())?),
            "--save-state" => args.save_state = Some(parse_value(flag, it.next())?),
            "--help" | "-h" => return Ok(None),
            other => return Err(format!("unknown argument: {}", other)),
        }
    }
    Ok(Some(args))
}

fn print_help() {
    println!("Usage: solve_3max [OPTIONS]");
    println!();
    println!("  --config <FILE>          Run configuration JSON");
    println!("  --iterations <N>         Iterations to train (default: 1000)");
    println!("  --hands <N>              Hands per iteration");
    println!("  --threads <N>            Train on N threads");
    println!("  --seed <N>               Random seed");
    println!("  --stack <BB>             Starting stack for every seat");
    println!("  --coarse                 Use the coarse abstraction");
    println!("  --checkpoint-every <N>   Checkpoint interval");
    println!("  --out <DIR>              Checkpoint directory (default: policy)");
    println!("  --compress               Write .json.zst checkpoints");
    println!("  --warm-start <FILE>      Seed strategy sums from a policy file");
    println!("  --resume <FILE>          Resume from a saved solver state");
    println!("  --save-state <FILE>      Save the solver state after training");
}

/// Config file first, then command-line overrides.
fn build_config(args: &Args) -> Result<RunConfig> {
    let mut config = match &args.config_file {
        Some(path) => {
            info!("loading configuration from {}", path.display());
            RunConfig::from_json_file(path)?
        }
        None => RunConfig::default(),
    };

    if let Some(stack) = args.stack {
        config.table.stacks = [stack; 3];
    }
    if args.coarse {
        config.abstraction = AbstractionMode::Coarse;
    }
    if let Some(seed) = args.seed {
        config.solver.seed = Some(seed);
    }
    if let Some(hands) = args.hands {
        config.solver.hands_per_iteration = hands;
    }
    if let Some(threads) = args.threads {
        config.solver.num_threads = Some(threads);
    }
    if let Some(every) = args.checkpoint_every {
        config.solver.checkpoint_every = every;
    }
    if args.compress {
        config.solver.compress_checkpoints = true;
    }
    if config.solver.checkpoint_dir.is_none() {
        config.solver.checkpoint_dir = Some(args.out_dir.clone());
    }

    config.validate()?;
    Ok(config)
}

fn run(args: Args) -> Result<()> {
    let config = build_config(&args)?;
    let game = ThreeMaxGame::from_run_config(&config);
    let parallel = config.solver.num_threads.is_some();

    info!(
        "stacks {:?}, blinds {}/{}, raise cap {}, {:?} abstraction",
        config.table.stacks,
        config.table.small_blind,
        config.table.big_blind,
        config.table.raise_cap,
        config.abstraction
    );
    info!(
        "{} iterations x {} hands, checkpoints every {} into {}",
        args.iterations,
        config.solver.hands_per_iteration,
        config.solver.checkpoint_every,
        args.out_dir.display()
    );

    let mut solver = CfrPlusSolver::new(game, config.solver.clone());

    if let Some(path) = &args.resume {
        solver.load_state(path)?;
        info!("resumed from {} at iteration {}", path.display(), solver.iteration());
    }
    if let Some(path) = &args.warm_start {
        let policy = PolicyTable::load(path)?;
        info!("warm start from {} ({} infosets)", path.display(), policy.len());
        solver.warm_start(&policy);
    }

    let bar = ProgressBar::new(args.iterations);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let start_iteration = solver.iteration();
    let update = |stats: &rust_solver_3max::cfr::TrainStats| {
        bar.set_position(stats.iterations - start_iteration);
        bar.set_message(format!(
            "{} infosets, {:.0} it/s",
            stats.info_sets, stats.iterations_per_second
        ));
    };

    let stats = if parallel {
        solver.train_parallel_with_callback(args.iterations, update)?.clone()
    } else {
        let interval = (args.iterations / 100).max(1);
        solver.train_with_callback(args.iterations, interval, update)?.clone()
    };
    bar.finish_and_clear();

    println!("Iterations:   {}", stats.iterations);
    println!("Hands:        {}", stats.hands_played);
    println!("Infosets:     {}", stats.info_sets);
    println!("Time:         {:.2}s ({:.1} it/s)", stats.elapsed_seconds, stats.iterations_per_second);
    if let Some(change) = stats.last_policy_change {
        println!("Policy change at last checkpoint: {:.3}", change);
    }

    if let Some(path) = &args.save_state {
        solver.save_state(path)?;
        info!("solver state saved to {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_help();
            return ExitCode::SUCCESS;
        }
        Err(msg) => {
            eprintln!("{}", msg);
            print_help();
            return ExitCode::FAILURE;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
