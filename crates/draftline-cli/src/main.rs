//! `draftline` command line

mod simulate;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use draftline_composer::ComposerConfig;
use draftline_staging::{FileLocalStore, StagingStore};
use simulate::{run_simulator, SimulatorConfig};
use std::path::PathBuf;
use std::sync::Arc;

fn cli() -> Command {
    Command::new("draftline")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Draft staging and finalize workflow for composite strategies")
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run a new-strategy session end to end against in-memory collaborators")
                .arg(count_arg("values", "2", "Number of values to stage"))
                .arg(count_arg("pillars", "1", "Number of pillars to stage"))
                .arg(count_arg("goals", "0", "Number of goals to stage"))
                .arg(count_arg("attachments", "1", "Number of attachments to upload"))
                .arg(count_arg("fail-every", "0", "Fail every nth child create (0 disables)"))
                .arg(
                    Arg::new("state-dir")
                        .long("state-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Keep staging on disk in this directory"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Composer configuration file (TOML)"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the report as JSON"),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Print every staging namespace and the draft key")
                .arg(
                    Arg::new("state-dir")
                        .long("state-dir")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Staging directory"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

fn count_arg(name: &'static str, default: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .default_value(default)
        .value_parser(value_parser!(usize))
        .help(help)
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("draftline=info,warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("simulate", args)) => simulate(args).await,
        Some(("inspect", args)) => inspect(args),
        _ => {
            cli().print_help()?;
            Ok(())
        }
    }
}

async fn simulate(args: &ArgMatches) -> anyhow::Result<()> {
    let count = |name: &str| args.get_one::<usize>(name).copied().unwrap_or_default();

    let composer = match args.get_one::<PathBuf>("config") {
        Some(path) => ComposerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ComposerConfig::default(),
    };

    let config = SimulatorConfig {
        values: count("values"),
        pillars: count("pillars"),
        goals: count("goals"),
        attachments: count("attachments"),
        fail_every: count("fail-every"),
        state_dir: args.get_one::<PathBuf>("state-dir").cloned(),
        composer,
    };

    let report = run_simulator(config).await?;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.generate_text());
    }

    std::process::exit(if report.passed() { 0 } else { 1 });
}

fn inspect(args: &ArgMatches) -> anyhow::Result<()> {
    let dir = args
        .get_one::<PathBuf>("state-dir")
        .context("--state-dir is required")?;
    let store = FileLocalStore::open(dir).with_context(|| format!("opening {}", dir.display()))?;
    let snapshot = StagingStore::new(Arc::new(store)).snapshot()?;

    if args.get_flag("json") {
        let decoded: serde_json::Map<String, serde_json::Value> = snapshot
            .into_iter()
            .map(|(key, raw)| {
                let value = raw
                    .map(|raw| serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw)))
                    .unwrap_or(serde_json::Value::Null);
                (key.to_string(), value)
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&decoded)?);
        return Ok(());
    }

    println!("Staging in {}", dir.display());
    for (key, raw) in snapshot {
        match raw {
            None => println!("  {key}: <absent>"),
            Some(raw) => match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
                Ok(items) => println!("  {key}: {} item(s)", items.len()),
                Err(_) => println!("  {key}: {raw}"),
            },
        }
    }
    Ok(())
}
