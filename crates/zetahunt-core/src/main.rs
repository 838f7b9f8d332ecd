//! `zetahunt` binary: run the hunt or inspect its persisted state.

use clap::{value_parser, Arg, ArgAction, Command as Cli};
use std::path::PathBuf;
use std::sync::Arc;
use zetahunt_backend::CpuBackend;
use zetahunt_core::{command_channel, EngineOptions, JsonlSink, ScanEngine, StateStore};
use zetahunt_ledger::RegionLedger;
use zetahunt_types::{ScanDomain, MIN_DIGITS, POINTS_FLOOR};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::new("zetahunt")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Open-ended hunt for an off-critical-line zero of the Riemann zeta function")
        .subcommand_required(true)
        .subcommand(
            Cli::new("run")
                .about("Run the scan loop until interrupted or the domain is exhausted")
                .arg(
                    Arg::new("data-dir")
                        .long("data-dir")
                        .default_value("zetahunt-data")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory for the ledger, state, and result files"),
                )
                .arg(
                    Arg::new("t-min")
                        .long("t-min")
                        .default_value("3.0001753329e12")
                        .value_parser(value_parser!(f64))
                        .help("Domain lower bound (fresh ledgers and --reset only)"),
                )
                .arg(
                    Arg::new("t-max")
                        .long("t-max")
                        .default_value("1e15")
                        .value_parser(value_parser!(f64))
                        .help("Domain upper bound (fresh ledgers and --reset only)"),
                )
                .arg(
                    Arg::new("reset")
                        .long("reset")
                        .action(ArgAction::SetTrue)
                        .help("Deliberately restart the hunt over --t-min/--t-max"),
                )
                .arg(
                    Arg::new("points")
                        .long("points")
                        .value_parser(value_parser!(u32))
                        .help("Override points per region"),
                )
                .arg(
                    Arg::new("digits")
                        .long("digits")
                        .value_parser(value_parser!(u32))
                        .help("Override verification digit count"),
                )
                .arg(
                    Arg::new("threshold")
                        .long("threshold")
                        .value_parser(value_parser!(f64))
                        .help("Override the approximate detection threshold"),
                )
                .arg(
                    Arg::new("inject-test-anomaly")
                        .long("inject-test-anomaly")
                        .action(ArgAction::SetTrue)
                        .help("Plant one synthetic candidate per region to exercise verification"),
                ),
        )
        .subcommand(
            Cli::new("status")
                .about("Summarize the persisted ledger without scanning")
                .arg(
                    Arg::new("data-dir")
                        .long("data-dir")
                        .default_value("zetahunt-data")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory holding the ledger files"),
                ),
        );

    match cli.get_matches().subcommand() {
        Some(("run", args)) => run(args).await,
        Some(("status", args)) => status(args),
        _ => unreachable!("subcommand required"),
    }
}

async fn run(args: &clap::ArgMatches) -> anyhow::Result<()> {
    let data_dir = args.get_one::<PathBuf>("data-dir").unwrap().clone();
    std::fs::create_dir_all(&data_dir)?;

    let t_min = *args.get_one::<f64>("t-min").unwrap();
    let t_max = *args.get_one::<f64>("t-max").unwrap();
    let domain = ScanDomain::new(t_min, t_max)?;

    let mut ledger = RegionLedger::open(&data_dir.join("ledger.jsonl"), domain)?;
    if args.get_flag("reset") {
        ledger.reset_domain(t_min, t_max)?;
    }

    let state_store = StateStore::new(data_dir.join("state.json"));
    let mut state = state_store.load_or_default()?;
    let mut overridden = false;
    if let Some(&points) = args.get_one::<u32>("points") {
        anyhow::ensure!(
            points >= POINTS_FLOOR,
            "--points must be at least {POINTS_FLOOR}"
        );
        state.points_per_region = points;
        overridden = true;
    }
    if let Some(&digits) = args.get_one::<u32>("digits") {
        anyhow::ensure!(digits >= MIN_DIGITS, "--digits must be at least {MIN_DIGITS}");
        state.digits = digits;
        overridden = true;
    }
    if let Some(&threshold) = args.get_one::<f64>("threshold") {
        anyhow::ensure!(
            threshold > 0.0 && threshold.is_finite(),
            "--threshold must be a positive finite magnitude"
        );
        state.approx_threshold = threshold;
        overridden = true;
    }
    if overridden {
        state_store.persist(&state)?;
    }

    let sink = Arc::new(JsonlSink::open(&data_dir)?);
    let (controller, inbox) = command_channel();
    let options = EngineOptions {
        inject_test_anomaly: args.get_flag("inject-test-anomaly"),
    };

    let engine = ScanEngine::new(
        ledger,
        Arc::new(CpuBackend::new()),
        sink,
        state_store,
        inbox,
        options,
    )?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received; stopping at the next suspension point");
            controller.shutdown().await;
        }
    });

    let report = engine.run().await?;

    println!("Scan session summary");
    println!("  Regions scanned:  {}", report.regions_scanned);
    println!("  Anomalies:        {}", report.anomalies_flagged);
    println!("  Verified:         {}", report.results_verified);
    println!("  Counterexamples:  {}", report.counterexamples);
    println!("  Frontier:         {:.6e}", report.frontier);
    Ok(())
}

fn status(args: &clap::ArgMatches) -> anyhow::Result<()> {
    let data_dir = args.get_one::<PathBuf>("data-dir").unwrap().clone();
    anyhow::ensure!(
        data_dir.is_dir(),
        "no data directory at {}",
        data_dir.display()
    );

    let ledger = RegionLedger::open(&data_dir.join("ledger.jsonl"), ScanDomain::default())?;
    let domain = ledger.domain();
    let stats = ledger.stats();

    println!("Zetahunt Ledger Status");
    println!("======================");
    println!();
    println!("Domain:              [{:.6e}, {:.6e})", domain.t_lo, domain.t_hi);
    println!("Frontier:            {:.6e}", ledger.frontier());
    println!("Regions scanned:     {}", stats.regions_scanned);
    println!("Regions in progress: {}", stats.regions_in_progress);
    println!("Points scanned:      {}", stats.points_scanned);
    println!("Anomalies flagged:   {}", stats.anomalies);
    println!("Results verified:    {}", stats.verified);
    println!("Counterexamples:     {}", stats.counterexamples);

    let counterexamples: Vec<_> = ledger
        .verified_results()
        .iter()
        .filter(|r| r.classification.is_counterexample())
        .collect();
    if !counterexamples.is_empty() {
        println!();
        println!("CONFIRMED COUNTEREXAMPLES:");
        for result in counterexamples {
            println!(
                "  sigma = {:.15}, t = {:.6e}, |zeta| = {:.3e}, digits = {}, at {}",
                result.sigma, result.t, result.zeta_abs, result.digits, result.verified_at
            );
        }
    }
    Ok(())
}
