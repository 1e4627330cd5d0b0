mod builtin;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use hearth_core::kernel::constants;
use hearth_core::plugin_system::{DependencyResolver, PluginManager};
use hearth_core::{Host, HostConfig, KernelError};
use log::{error, info};
use tracing_subscriber::EnvFilter;

/// Hearth: plugin host for game servers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Host configuration file (TOML, YAML or JSON). Defaults to ./hearth.toml when present
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory scanned for plugin artifacts, overriding the configuration
    #[arg(long, value_name = "DIR")]
    plugins_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List discovered plugins without loading them
    List,
    /// Print the load order the plugins would be activated in
    Resolve,
    /// Load every plugin, report the outcome, then shut down
    Load,
}

fn load_config(args: &CliArgs) -> Result<HostConfig, KernelError> {
    let mut config = match &args.config {
        Some(path) => HostConfig::load(path)?,
        None => {
            let default_path = Path::new(constants::DEFAULT_CONFIG_FILE);
            if default_path.is_file() {
                HostConfig::load(default_path)?
            } else {
                HostConfig::default()
            }
        }
    };
    if let Some(dir) = &args.plugins_dir {
        config.plugins_dir = dir.clone();
    }
    Ok(config)
}

async fn discover(config: &HostConfig) -> Result<PluginManager, KernelError> {
    let mut manager = PluginManager::from_config(config, builtin::registry()?)?;
    manager.discover(&config.plugins_dir).await?;
    for e in manager.discovery_errors() {
        println!("warning: {}", e);
    }
    Ok(manager)
}

async fn list(config: &HostConfig) -> Result<bool, KernelError> {
    let manager = discover(config).await?;
    if manager.plugins().next().is_none() {
        println!("No plugins found in {}", config.plugins_dir.display());
    }
    for plugin in manager.plugins() {
        let source = plugin.source().map(|p| p.display().to_string()).unwrap_or_default();
        println!("{} ({}) - {}", plugin, plugin.name(), source);
        for dep in plugin.dependencies() {
            println!("    {}", dep);
        }
    }
    Ok(manager.discovery_errors().is_empty())
}

async fn resolve(config: &HostConfig) -> Result<bool, KernelError> {
    let manager = discover(config).await?;
    let result = DependencyResolver::new().resolve_partial(manager.plugins());
    println!("Load order:");
    for (position, id) in result.order.iter().enumerate() {
        println!("  {}. {}", position + 1, id);
    }
    for (plugin, dependency) in &result.absent_optional {
        println!("note: optional dependency '{}' of '{}' is not present", dependency, plugin);
    }
    if !result.excluded.is_empty() {
        println!("Excluded:");
        for (id, cause) in &result.excluded {
            println!("  {}: {}", id, cause);
        }
    }
    Ok(result.is_complete() && manager.discovery_errors().is_empty())
}

async fn load(config: HostConfig) -> Result<bool, KernelError> {
    let mut host = Host::new(config, builtin::registry()?)?;
    let report = host.start().await?;
    print!("{}", report);
    let shutdown_errors = host.shutdown().await?;
    for e in &shutdown_errors {
        println!("warning: {}", e);
    }
    Ok(report.is_clean() && shutdown_errors.is_empty())
}

/// Route `log` records through a stderr `fmt` subscriber, filtered by `RUST_LOG` (default `warn`).
fn init_logging() {
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records to tracing: {}", e);
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install log subscriber: {}", e);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let args = CliArgs::parse();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Using plugin directory {}", config.plugins_dir.display());

    let outcome = match args.command {
        Commands::List => list(&config).await,
        Commands::Resolve => resolve(&config).await,
        Commands::Load => load(config).await,
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
