//! MultiProfile - Manage isolated on-disk instances of reusable profiles
//!
//! Command line front end over the instance lifecycle library.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueHint};
use serde::Serialize;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use multiprofile::{
    read_configuration, Instance, InstanceManager, InstanceStatus, ProcessTable, APP_NAME,
    APP_VERSION,
};

#[derive(Parser)]
#[command(
    name = "multiprofile",
    version,
    about = "Manage isolated working copies of application profiles",
    after_help = r#"EXAMPLES
  $ multiprofile acquire browser --pid 4242 --topic work
  $ multiprofile list --profile browser
  $ multiprofile release browser-1
  $ multiprofile prune browser

NOTES
  - Default configuration: <config dir>/multiprofile/config.json (override with --config)"#,
    arg_required_else_help = true
)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List configured profile labels
    Profiles,
    /// List instances with their usage state
    List {
        /// Only instances of this profile
        #[arg(long)]
        profile: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Pick (or create) an instance of a profile and mark it in use
    Acquire {
        profile: String,
        /// Process that will hold the instance
        #[arg(long)]
        pid: u32,
        /// Topic the instance serves
        #[arg(long)]
        topic: Option<String>,
    },
    /// Mark an instance free
    Release { instance: String },
    /// Delete instances that are not in use
    Delete {
        #[arg(required = true)]
        instances: Vec<String>,
    },
    /// Delete every free instance of a profile
    Prune { profile: String },
    /// List topics of instances in use
    Topics,
    /// Print the instance serving a topic
    Find { topic: String },
}

/// Instance as printed by `list --json`
#[derive(Serialize)]
struct ListedInstance<'a> {
    #[serde(flatten)]
    instance: &'a Instance,
    status: InstanceStatus,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    debug!("{} v{} starting", APP_NAME, APP_VERSION);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("error: {:#}", err);
            let code = err
                .downcast_ref::<multiprofile::Error>()
                .map(|e| e.kind().exit_code())
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

/// Initialize the logging system
fn init_logging(verbose: bool) {
    let fallback = if verbose {
        "multiprofile=debug"
    } else {
        "multiprofile=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn default_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("Failed to get config directory")?;
    Ok(dir.join("multiprofile").join("config.json"))
}

fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = read_configuration(&config_path)
        .with_context(|| format!("Failed to load configuration {}", config_path.display()))?;
    info!("Loaded {} profiles", config.profiles.len());

    match cli.command {
        Command::Profiles => {
            for label in config.profile_labels() {
                println!("{}", label);
            }
        }
        Command::List { profile, json } => {
            // One process table snapshot serves the whole listing
            let manager = InstanceManager::with_liveness(config, ProcessTable::snapshot());
            let report = manager.scan_report().context("Failed to scan instances")?;
            let instances: Vec<Instance> = report
                .instances
                .into_iter()
                .filter(|i| profile.as_ref().map_or(true, |p| &i.profile_label == p))
                .collect();
            if json {
                let listed: Vec<ListedInstance> = instances
                    .iter()
                    .map(|instance| ListedInstance {
                        instance,
                        status: instance.status(),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&listed)?);
            } else {
                print_table(&instances);
            }
            for failure in &report.failures {
                eprintln!("skipped {}: {}", failure.instance_label, failure.error);
            }
        }
        Command::Acquire {
            profile,
            pid,
            topic,
        } => {
            config.check_files()?;
            let manager = InstanceManager::new(config);
            let instance = manager.acquire(&profile, pid, topic.as_deref())?;
            println!(
                "{}",
                manager.store().instance_dir(&instance.instance_label).display()
            );
        }
        Command::Release { instance } => {
            InstanceManager::new(config).release(&instance)?;
        }
        Command::Delete { instances } => {
            let manager = InstanceManager::new(config);
            for label in instances {
                manager
                    .delete(&label)
                    .with_context(|| format!("Failed to delete instance '{}'", label))?;
            }
        }
        Command::Prune { profile } => {
            if config.find_profile_by_label(&profile).is_none() {
                return Err(multiprofile::Error::NotFound {
                    what: format!("profile '{}'", profile),
                }
                .into());
            }
            for label in InstanceManager::new(config).prune(&profile)? {
                println!("{}", label);
            }
        }
        Command::Topics => {
            for topic in InstanceManager::new(config).topics()? {
                println!("{}", topic);
            }
        }
        Command::Find { topic } => match InstanceManager::new(config).find_by_topic(&topic)? {
            Some(instance) => println!("{}", instance.instance_label),
            None => {
                return Err(multiprofile::Error::NotFound {
                    what: format!("topic '{}'", topic),
                }
                .into())
            }
        },
    }

    Ok(())
}

fn print_table(instances: &[Instance]) {
    println!(
        "{:<20} {:<16} {:<8} {:<8} {:<26} TOPIC",
        "INSTANCE", "PROFILE", "STATUS", "PID", "LAST USED"
    );
    for instance in instances {
        println!(
            "{:<20} {:<16} {:<8} {:<8} {:<26} {}",
            instance.instance_label,
            instance.profile_label,
            instance.status().label(),
            instance
                .usage_pid()
                .map(|pid| pid.to_string())
                .unwrap_or_else(|| "-".to_string()),
            instance
                .last_used
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
            instance.usage_label().unwrap_or("-"),
        );
    }
}
