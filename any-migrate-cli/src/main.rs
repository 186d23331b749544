//! any-migrate CLI Tool
//!
//! Command-line interface for running migration lineages with the bundled
//! shell driver and JSON file ledger.
//! Supports both CLI execution and integration with CI/CD pipelines.

use any_migrate::config::{MigrateConfig, DEFAULT_CONFIG_PATH};
use any_migrate::drivers::ShellDriver;
use any_migrate::migration::{
    Capability, DirectorySource, DriverRegistry, MaxSteps, MigrationState, MigrationStatus,
    Migrator, RepositoryRegistry, RunToCompletion,
};
use any_migrate::repositories::{JsonFileRepository, MemoryRepository};
use any_migrate_cli::scaffold;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "any-migrate")]
#[command(about = "Migration orchestration tool")]
#[command(version = "0.1.0")]
struct Cli {
    /// Configuration file path
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Migrations directory path (overrides the configuration)
    #[arg(long)]
    migrations_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show migration status
    Status,

    /// Apply pending migrations
    Up {
        /// Number of migrations to apply (default: all pending)
        #[arg(long)]
        steps: Option<usize>,
    },

    /// Undo applied migrations
    Down {
        /// Number of migrations to undo (default: 1)
        #[arg(long, default_value = "1")]
        steps: usize,
    },

    /// Overwrite the recorded state of a migration
    Force {
        /// Migration index
        index: i64,

        /// New state, e.g. NEW or MIGRATION_SUCCEEDED
        state: MigrationState,
    },

    /// Create the next migration file
    Create {
        /// Migration name (e.g., "create_users_table")
        name: String,

        /// Filename extension selecting the driver
        #[arg(long, default_value = "sh")]
        ext: String,
    },

    /// Write a starter configuration file
    Init,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let quiet = cli.quiet;
    match run(cli) {
        Ok(()) => {
            if !quiet {
                println!("{}", "✅ Success".green());
            }
        }
        Err(e) => {
            eprintln!("{} {:#}", "❌ Error:".red().bold(), e);
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    dotenv::dotenv().ok();

    let mut config = MigrateConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if let Some(migrations_dir) = cli.migrations_dir {
        config.migrations_dir = migrations_dir;
    }

    let mut drivers = DriverRegistry::new();
    drivers.register_all(&Capability::ALL, Arc::new(ShellDriver::new()))?;

    let mut repositories = RepositoryRegistry::new();
    repositories.register(Arc::new(JsonFileRepository::new()))?;
    repositories.register(Arc::new(MemoryRepository::new()))?;

    let migrator = Migrator::new(&drivers, &repositories, &config);
    let source = DirectorySource::new(&config.migrations_dir);

    match cli.command {
        Commands::Status => handle_status(&migrator, &source),
        Commands::Up { steps } => handle_up(&migrator, &source, steps),
        Commands::Down { steps } => handle_down(&migrator, &source, steps),
        Commands::Force { index, state } => handle_force(&migrator, index, state),
        Commands::Create { name, ext } => handle_create(&config.migrations_dir, &name, &ext),
        Commands::Init => handle_init(&cli.config, &config),
    }
}

fn handle_status(migrator: &Migrator, source: &DirectorySource) -> Result<()> {
    let status = migrator.status(source)?;

    println!(
        "\n📊 Migration Status ({})\n",
        source.migrations_dir().display()
    );
    print_migrations(&status);

    println!(
        "\n📈 Summary: {} applied, {} pending, {} failed",
        status.applied_count, status.pending_count, status.failed_count
    );
    if let Some(latest) = status.latest_applied_index() {
        println!("Latest Applied Index: {latest}");
    }
    if let Some(next) = status.next_pending_index() {
        println!("Next Pending Index: {next}");
    }

    let attention: Vec<_> = status.needs_attention().map(|m| m.index).collect();
    if !attention.is_empty() {
        println!(
            "{}",
            format!(
                "⚠️  Migrations {attention:?} need attention; repair the backend, then use `force`"
            )
            .yellow()
        );
    }

    Ok(())
}

fn print_migrations(status: &MigrationStatus) {
    if status.migrations.is_empty() {
        println!("No migrations found");
        return;
    }

    for migration in &status.migrations {
        let label = format!("{:04}_{}.{}", migration.index, migration.name, migration.extension);
        let state = migration.state.as_str();
        let line = if migration.state.is_succeeded() {
            format!("  ✓ {label:<40} {}", state.green())
        } else if migration.state.is_failed() {
            format!("  ✗ {label:<40} {}", state.red().bold())
        } else if migration.state.is_in_progress() {
            format!("  ! {label:<40} {}", state.yellow().bold())
        } else {
            format!("  ⏳ {label:<40} {}", state.dimmed())
        };
        println!("{line}");
    }
}

fn handle_up(migrator: &Migrator, source: &DirectorySource, steps: Option<usize>) -> Result<()> {
    println!("Applying migrations...");
    let applied = match steps {
        Some(0) => 0,
        Some(steps) => migrator.upgrade(source, &mut MaxSteps::new(steps))?,
        None => migrator.upgrade(source, &mut RunToCompletion)?,
    };

    if applied > 0 {
        println!("✅ Successfully applied {applied} migration(s)");
    } else {
        println!("✅ No migrations to apply");
    }

    Ok(())
}

fn handle_down(migrator: &Migrator, source: &DirectorySource, steps: usize) -> Result<()> {
    if steps == 0 {
        println!("✅ No migrations to undo");
        return Ok(());
    }

    println!("Undoing migrations...");
    let undone = migrator.downgrade(source, &mut MaxSteps::new(steps))?;

    if undone > 0 {
        println!("✅ Successfully undid {undone} migration(s)");
    } else {
        println!("✅ No migrations to undo");
    }

    Ok(())
}

fn handle_force(migrator: &Migrator, index: i64, state: MigrationState) -> Result<()> {
    migrator.force(index, state)?;
    println!(
        "{}",
        format!("⚠️  Migration {index} recorded as {state}").yellow()
    );
    Ok(())
}

fn handle_create(migrations_dir: &Path, name: &str, extension: &str) -> Result<()> {
    let path = scaffold::create_migration(migrations_dir, name, extension)?;
    println!("✅ Created migration: {}", path.display());
    Ok(())
}

fn handle_init(config_path: &Path, config: &MigrateConfig) -> Result<()> {
    scaffold::init_config(config_path, config)?;
    println!("✅ Wrote configuration: {}", config_path.display());
    Ok(())
}
