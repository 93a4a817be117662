use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "runegrid", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run both worker phases and write the merged canvas as a PNG.
    Run(RunArgs),
    /// Print the default scenario as JSON.
    DumpConfig,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Scenario JSON. Defaults to the built-in scenario.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Override the scenario's canvas size (pixels per side).
    #[arg(long)]
    size: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::DumpConfig => cmd_dump_config(),
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let mut scenario = match &args.config {
        Some(path) => runegrid::ScenarioConfig::from_path(path)
            .with_context(|| format!("load scenario '{}'", path.display()))?,
        None => runegrid::ScenarioConfig::default(),
    };
    if let Some(size) = args.size {
        scenario.canvas_size = size;
        scenario.validate()?;
    }

    let engine = scenario.engine()?.with_png_output(&args.out);
    let base = scenario.base_canvas(&engine);
    let orchestrator = runegrid::Orchestrator::new(Arc::new(engine), scenario.settings())?;
    let report = orchestrator.run(base)?;

    for worker in report.phase1.iter().chain(&report.phase2) {
        eprintln!(
            "{:<16} {:<14} steps={} {:?}",
            worker.name,
            format!("{:?}", worker.kind),
            worker.steps_completed,
            worker.outcome
        );
    }
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_dump_config() -> anyhow::Result<()> {
    let json = runegrid::ScenarioConfig::default().to_json_pretty()?;
    println!("{json}");
    Ok(())
}
