use clap::{Arg, Command};
use log::LevelFilter;
use seamcheck::session::{FlawEvent, InspectionSession};
use seamcheck::InspectionConfig;
use serde::Deserialize;
use std::process;

/// One step of a recorded inspection, replayed against a fresh session.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ReplayStep {
    Event {
        orientation: String,
        flaw_type: String,
        timestamp: chrono::DateTime<chrono::Utc>,
        present: bool,
    },
    Close {
        orientation: String,
    },
    Override {
        reason: String,
        actor: i64,
    },
}

fn main() {
    let matches = Command::new("seamcheck")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Garment inspection rule-evaluation engine")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Rule-set configuration file path")
                .default_value("/etc/seamcheck.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default rule-set configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate the rule-set configuration and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("replay")
                .long("replay")
                .value_name("FILE")
                .help("Replay a JSON event log through one session and print the verdict")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging of debounce and rule transitions")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = match InspectionConfig::from_file(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        println!("Required orientations: {:?}", config.orientations_required);
        println!("Number of rules: {}", config.rules.len());
        for (i, rule) in config.rules.iter().enumerate() {
            println!("  Rule {}: {}", i + 1, rule.describe());
        }
        println!("Configuration is valid.");
        return;
    }

    if let Some(replay_path) = matches.get_one::<String>("replay") {
        if let Err(e) = replay_log(&config, replay_path) {
            eprintln!("Replay failed: {e}");
            process::exit(1);
        }
        return;
    }

    eprintln!("Nothing to do; see --help");
    process::exit(1);
}

fn generate_default_config(path: &str) {
    let config = InspectionConfig::default();
    match config.to_file(path) {
        Ok(()) => println!("Default configuration written to {path}"),
        Err(e) => {
            eprintln!("Error writing configuration: {e}");
            process::exit(1);
        }
    }
}

fn replay_log(config: &InspectionConfig, path: &str) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)?;
    let steps: Vec<ReplayStep> = serde_json::from_str(&content)?;

    let mut session = InspectionSession::new(config.clone())?;
    let mut override_step = None;

    for step in steps {
        match step {
            ReplayStep::Event {
                orientation,
                flaw_type,
                timestamp,
                present,
            } => {
                session.record_event(&FlawEvent {
                    orientation,
                    flaw_type,
                    timestamp,
                    present,
                })?;
            }
            ReplayStep::Close { orientation } => {
                session.close_orientation(&orientation)?;
            }
            ReplayStep::Override { reason, actor } => {
                override_step = Some((reason, actor));
            }
        }
    }

    let mut verdict = session.finalize()?;
    if let Some((reason, actor)) = override_step {
        verdict = verdict.apply_override(&reason, actor)?;
    }

    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}
