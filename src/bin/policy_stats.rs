//! Inspect a trained policy file.
//!
//! Usage:
//!   cargo run --release --bin policy_stats -- <POLICY> [OPTIONS]
//!
//! Options:
//!   --describe <KEY>   Decode an infoset key (decimal or 0x hex) and show its entry
//!   --top <N>          Show the N most visited infosets
//!   --demo             Play one hand with every seat following the policy
//!   --seed <N>         Seed for the demo hand (default: 1)
//!   --stack <BB>       Demo stacks (default: 100)
//!   --coarse           Demo keys use the coarse abstraction

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use log::error;
use rand::rngs::StdRng;
use rand::SeedableRng;

use rust_solver_3max::cfr::policy::parse_key;
use rust_solver_3max::cfr::{Action, PolicyTable};
use rust_solver_3max::games::holdem::{
    describe_key, AbstractionMode, HandState, InfosetEncoder, PolicyStats, TableConfig,
};
use rust_solver_3max::Result;

struct Args {
    policy: PathBuf,
    describe: Vec<String>,
    top: usize,
    demo: bool,
    seed: u64,
    stack: f64,
    coarse: bool,
}

fn parse_args() -> std::result::Result<Option<Args>, String> {
    let mut policy = None;
    let mut args = Args {
        policy: PathBuf::new(),
        describe: Vec::new(),
        top: 0,
        demo: false,
        seed: 1,
        stack: 100.0,
        coarse: false,
    };

    let argv: Vec<String> = env::args().skip(1).collect();
    let mut it = argv.iter();
    while let Some(arg) = it.next() {
        let mut value = |flag: &str| {
            it.next()
                .cloned()
                .ok_or_else(|| format!("{} needs a value", flag))
        };
        match arg.as_str() {
            "--describe" | "-d" => args.describe.push(value(arg)?),
            "--top" => {
                args.top = value(arg)?
                    .parse()
                    .map_err(|_| "--top needs a number".to_string())?
            }
            "--demo" => args.demo = true,
            "--seed" => {
                args.seed = value(arg)?
                    .parse()
                    .map_err(|_| "--seed needs a number".to_string())?
            }
            "--stack" => {
                args.stack = value(arg)?
                    .parse()
                    .map_err(|_| "--stack needs a number".to_string())?
            }
            "--coarse" => args.coarse = true,
            "--help" | "-h" => return Ok(None),
            flag if flag.starts_with('-') => return Err(format!("unknown argument: {}", flag)),
            path => policy = Some(PathBuf::from(path)),
        }
    }

    args.policy = policy.ok_or_else(|| "missing policy file".to_string())?;
    Ok(Some(args))
}

fn print_help() {
    println!("Usage: policy_stats <POLICY> [OPTIONS]");
    println!();
    println!("  --describe <KEY>   Decode an infoset key and show its entry");
    println!("  --top <N>          Show the N most visited infosets");
    println!("  --demo             Play one hand following the policy");
    println!("  --seed <N>         Seed for the demo hand (default: 1)");
    println!("  --stack <BB>       Demo stacks (default: 100)");
    println!("  --coarse           Demo keys use the coarse abstraction");
}

fn format_probs(probs: &[f64]) -> String {
    let mut parts: Vec<(Action, f64)> = Action::ALL
        .into_iter()
        .map(|a| (a, probs[a.index()]))
        .filter(|(_, p)| *p > 0.0)
        .collect();
    parts.sort_by(|a, b| b.1.total_cmp(&a.1));
    parts
        .iter()
        .map(|(a, p)| format!("{:<6} {:6.2}%", a.name(), 100.0 * p))
        .collect::<Vec<_>>()
        .join("  |  ")
}

fn describe(policy: &PolicyTable, raw: &str) -> Result<()> {
    let key = parse_key(raw)?;
    println!("{} ({:#x})", key, key);
    println!("  {}", describe_key(key));
    match policy.get(key) {
        Some(entry) => {
            println!("  {}", format_probs(&entry.probs));
            if let Some(visits) = entry.visits {
                println!("  visits: {}", visits);
            }
        }
        None => println!("  (not in policy)"),
    }
    Ok(())
}

fn show_top(policy: &PolicyTable, n: usize) {
    let mut entries: Vec<_> = policy.iter().collect();
    entries.sort_by_key(|(key, entry)| (std::cmp::Reverse(entry.visits.unwrap_or(0)), *key));
    println!("Top {} infosets by visits:", n);
    for (key, entry) in entries.into_iter().take(n) {
        println!(
            "{:>8}  {:<48} {}",
            entry.visits.unwrap_or(0),
            describe_key(key),
            format_probs(&entry.probs)
        );
    }
}

/// One hand with every seat sampling from the policy.
fn demo_hand(policy: &PolicyTable, args: &Args) -> Result<()> {
    let mode = if args.coarse {
        AbstractionMode::Coarse
    } else {
        AbstractionMode::Full
    };
    let encoder = InfosetEncoder::new(mode);
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut state = HandState::new(TableConfig::with_stacks(args.stack), &mut rng)?;

    println!("{}", state);
    while !state.is_terminal() {
        let seat = state.to_act;
        let legal = state.require_legal_actions()?;
        let key = encoder.key(&state, seat)?;
        let known = if policy.get(key).is_some() { "" } else { " (unknown, uniform)" };
        let action = policy.act(key, legal, &mut rng)?;
        println!(
            "{:<5} key={:<16} {}{} legal={} -> {}",
            seat,
            key,
            describe_key(key),
            known,
            legal,
            action
        );
        state.apply_action(seat, action)?;
    }

    println!("{}", state);
    if let Some(net) = state.net_change_by_name() {
        for (name, chips) in net {
            println!("{:<5} {:+.2}", name, chips);
        }
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let policy = PolicyTable::load(&args.policy)?;
    println!("Policy: {}", args.policy.display());
    println!("{}", PolicyStats::from_policy(&policy));

    for raw in &args.describe {
        describe(&policy, raw)?;
    }
    if args.top > 0 {
        show_top(&policy, args.top);
    }
    if args.demo {
        demo_hand(&policy, &args)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

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
