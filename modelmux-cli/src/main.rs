//! modelmux - manage the router's providers, models and settings.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use modelmux_core::{
    ConfigError, IntegrityCoordinator, LogLevel, ModelType, SettingEntry, SettingType,
};
use tracing_subscriber::EnvFilter;

/// Manage modelmux router configuration
#[derive(Parser, Debug)]
#[command(name = "modelmux", version, about = "Manage modelmux router configuration")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration database (defaults to the platform data directory)
    #[arg(long, global = true, env = "MODELMUX_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect providers
    Providers {
        #[command(subcommand)]
        action: ProviderCommand,
    },
    /// Inspect models
    Models {
        #[command(subcommand)]
        action: ModelCommand,
    },
    /// Inspect composite models
    Composites {
        #[command(subcommand)]
        action: CompositeCommand,
    },
    /// Show or change system settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
    /// Delete a provider, model or composite model
    Delete {
        #[command(subcommand)]
        target: DeleteTarget,
    },
    /// Write the whole configuration as JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace the whole configuration from a JSON document
    Import {
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ProviderCommand {
    List {
        /// Only providers marked valid
        #[arg(long)]
        valid: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ModelCommand {
    List {
        /// Only models of this type (reasoner or general)
        #[arg(long = "type")]
        model_type: Option<ModelType>,
    },
}

#[derive(Subcommand, Debug)]
enum CompositeCommand {
    List,
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print all settings as JSON
    Show,
    /// Set one setting
    Set {
        key: String,
        value: String,
        /// Declared type (str, int, float, bool)
        #[arg(long = "type")]
        setting_type: Option<SettingType>,
    },
    /// Set the router log level (DEBUG, INFO, WARNING, ERROR, CRITICAL)
    LogLevel { level: String },
    /// Replace the key clients use to call the router
    ApiKey { key: String },
}

#[derive(Subcommand, Debug)]
enum DeleteTarget {
    Provider { id: String },
    Model { id: String },
    Composite { id: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => ExitCode::from(report(&err)),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let coordinator = match &cli.db {
        Some(path) => IntegrityCoordinator::open_at(path.clone()),
        None => IntegrityCoordinator::open(),
    }
    .context("Failed to open configuration database")?;

    let log_level = match coordinator.get_settings() {
        Ok(settings) => settings.log_level,
        Err(e) => {
            eprintln!("warning: could not read log level ({e}), using INFO");
            LogLevel::default()
        }
    };
    init_tracing(log_level)?;
    tracing::debug!(version = modelmux_core::VERSION, "modelmux starting");

    execute(&coordinator, cli.command)?;
    coordinator.shutdown()?;
    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over the stored log level.
fn init_tracing(level: LogLevel) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::default()
            .add_directive(level.as_directive().parse()?)
            .add_directive("rusqlite=warn".parse()?),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn execute(coordinator: &IntegrityCoordinator, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Providers {
            action: ProviderCommand::List { valid },
        } => {
            let providers = if valid {
                coordinator.get_valid_providers()?
            } else {
                coordinator.list_providers()?
            };
            for p in providers {
                println!(
                    "{}\t{}\t{}\t{}{}",
                    p.id,
                    p.provider_name,
                    p.provider_format,
                    p.endpoint(),
                    if p.is_valid { "" } else { "\t(disabled)" }
                );
            }
        }
        Command::Models {
            action: ModelCommand::List { model_type },
        } => {
            let models = match model_type {
                Some(ty) => coordinator.list_models_by_type(ty)?,
                None => coordinator.list_models()?,
            };
            for m in models {
                println!(
                    "{}\t{}\t{}\t{}\t{}{}",
                    m.id,
                    m.model_type,
                    m.model_name,
                    m.model_id,
                    m.model_format,
                    if m.is_valid { "" } else { "\t(disabled)" }
                );
            }
        }
        Command::Composites {
            action: CompositeCommand::List,
        } => {
            for c in coordinator.list_composites()? {
                println!(
                    "{}\t{}\treasoner={}\tgeneral={}",
                    c.id, c.model_name, c.reasoner_model_id, c.general_model_id
                );
            }
        }
        Command::Settings { action } => settings(coordinator, action)?,
        Command::Delete { target } => {
            match &target {
                DeleteTarget::Provider { id } => coordinator.delete_provider(id)?,
                DeleteTarget::Model { id } => coordinator.delete_model(id)?,
                DeleteTarget::Composite { id } => coordinator.delete_composite(id)?,
            }
            println!("Deleted");
        }
        Command::Export { output } => {
            let json = coordinator.export_json()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported configuration to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Command::Import { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let summary = coordinator.import_json(&text)?;
            println!(
                "Imported {} provider(s), {} reasoner and {} general model(s), {} composite(s)",
                summary.providers,
                summary.reasoner_models,
                summary.general_models,
                summary.composite_models
            );
        }
    }
    Ok(())
}

fn settings(coordinator: &IntegrityCoordinator, action: SettingsCommand) -> anyhow::Result<()> {
    let change = match action {
        SettingsCommand::Show => {
            let settings = coordinator.get_settings()?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            return Ok(());
        }
        SettingsCommand::Set {
            key,
            value,
            setting_type,
        } => {
            let entry = match setting_type {
                Some(ty) => SettingEntry::typed(key, value, ty),
                None => SettingEntry::new(key, value),
            };
            coordinator.update_settings(&[entry])?
        }
        SettingsCommand::LogLevel { level } => coordinator.set_log_level(&level)?,
        SettingsCommand::ApiKey { key } => coordinator.set_api_key(&key)?,
    };

    if change.is_empty() {
        println!("No changes");
    } else {
        let keys: Vec<String> = change.changed_keys.iter().map(|k| k.to_string()).collect();
        println!("Updated {}", keys.join(", "));
    }
    if change.credentials_rotated {
        println!("Router API key rotated; existing sessions were invalidated");
    }
    Ok(())
}

/// Print the error and pick the exit status. Validation failures get one
/// line per violation.
fn report(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ConfigError>() {
        Some(ConfigError::Validation(errors)) => {
            eprintln!("error: validation failed");
            for violation in errors.iter() {
                eprintln!("  {violation}");
            }
            2
        }
        Some(e) if e.is_conflict() => {
            eprintln!("error: {e}");
            3
        }
        _ => {
            eprintln!("error: {err:#}");
            1
        }
    }
}
