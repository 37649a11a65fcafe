//! Staffload CLI - Bulk worker import
//!
//! # Commands
//!
//! ```bash
//! staffload validate workers.csv                          # Report findings, persist nothing
//! staffload import workers.csv --mode create --tenant <uuid>
//! staffload import workers.csv --mode update --tenant <uuid> -o report.json
//! staffload import workers.csv --mode dry-run             # Transform only, print counts
//! staffload template -o workers_template.csv              # Blank CSV template
//! staffload sample                                        # Template with example rows
//! staffload serve                                         # Start HTTP server (port 3000)
//! ```
//!
//! Reports are JSON on stdout (or `--output`); progress goes to stderr.

use clap::{Parser, Subcommand};
use staffload::config::{
    AppConfig, ENV_ALLOW_PARTIAL, ENV_BATCH_SIZE, ENV_DATA_DIR, ENV_PORT, ENV_TENANT,
};
use staffload::{
    import_file, validate_bytes, worker_sample, worker_template, FileStore,
    ImportMode, ImportOptions, ImportReport,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "staffload")]
#[command(about = "Validate and import worker CSV files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a worker CSV file without importing it
    Validate {
        /// Input CSV file
        input: PathBuf,

        /// Output file for the JSON report (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a worker CSV file
    Import {
        /// Input CSV file
        input: PathBuf,

        /// validate, dry-run, create or update
        #[arg(short, long, default_value = "dry-run")]
        mode: ImportMode,

        /// Owning tenant (UUID)
        #[arg(short, long, env = ENV_TENANT)]
        tenant: Option<Uuid>,

        /// Directory of the file-backed store
        #[arg(long, env = ENV_DATA_DIR)]
        data_dir: Option<PathBuf>,

        /// Operations per batch
        #[arg(long, env = ENV_BATCH_SIZE)]
        batch_size: Option<usize>,

        /// Refuse to import anything when a row has errors
        #[arg(long)]
        strict: bool,

        /// Output file for the JSON report (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a blank CSV template
    Template {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a CSV template with example rows
    Sample {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = ENV_PORT)]
        port: Option<u16>,

        /// Directory of the file-backed store
        #[arg(long, env = ENV_DATA_DIR)]
        data_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    let result = match cli.command {
        Commands::Validate { input, output } => cmd_validate(&input, output.as_deref()),

        Commands::Import {
            input,
            mode,
            tenant,
            data_dir,
            batch_size,
            strict,
            output,
        } => {
            let mut config = config;
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            if let Some(size) = batch_size {
                config.batch_size = size;
            }
            if strict {
                config.allow_partial = false;
            }
            cmd_import(&input, mode, tenant, &config, output.as_deref()).await
        }

        Commands::Template { output } => cmd_template(output.as_deref(), false),

        Commands::Sample { output } => cmd_template(output.as_deref(), true),

        Commands::Serve { port, data_dir } => {
            let mut config = config;
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            cmd_serve(config).await
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_validate(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validating: {}", input.display());

    let bytes = fs::read(input)?;
    let report = validate_bytes(&bytes)?;
    print_summary(&report);

    let json = serde_json::to_string_pretty(&report)?;
    write_output(json.as_bytes(), output)?;

    if !report.validation.success {
        std::process::exit(2);
    }
    Ok(())
}

async fn cmd_import(
    input: &Path,
    mode: ImportMode,
    tenant: Option<Uuid>,
    config: &AppConfig,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let tenant_id = match tenant.or(config.default_tenant) {
        Some(id) => id,
        None if mode.persists() => {
            return Err(format!("--tenant (or {}) is required for {} imports", ENV_TENANT, mode).into())
        }
        None => Uuid::nil(),
    };

    eprintln!("📄 Processing: {} ({} mode)", input.display(), mode);

    let store = FileStore::with_dir(&config.data_dir)?;
    let options = ImportOptions::from_config(config, mode, tenant_id);
    if !options.allow_partial {
        eprintln!("   Strict mode ({}=false)", ENV_ALLOW_PARTIAL);
    }

    let report = import_file(input, &store, &options).await?;
    print_summary(&report);

    let json = serde_json::to_string_pretty(&report)?;
    write_output(json.as_bytes(), output)?;

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_template(output: Option<&Path>, with_examples: bool) -> Result<(), Box<dyn std::error::Error>> {
    let content = if with_examples {
        worker_sample()?
    } else {
        worker_template()?
    };
    write_output(&content, output)
}

async fn cmd_serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::with_dir(&config.data_dir)?;
    eprintln!("💾 Data directory: {}", store.data_dir().display());
    staffload::server::start_server(config, Arc::new(store)).await
}

fn print_summary(report: &ImportReport) {
    let summary = report.validation.summary;
    eprintln!("\n📊 Results ({})", report.status());
    eprintln!("   Rows:     {}", summary.total_rows);
    eprintln!("   Valid:    {}", summary.valid_rows);
    eprintln!("   Errors:   {}", summary.error_rows);
    eprintln!("   Warnings: {}", summary.warning_rows);

    if let Some(ref counts) = report.dry_run {
        eprintln!("   Records:  {}", counts.records);
    }
    if let Some(ref outcome) = report.outcome {
        eprintln!("   Saved:    {}", outcome.successful.len());
        eprintln!("   Failed:   {}", outcome.failed.len());
        eprintln!("   Missing:  {}", outcome.not_found.len());
        for failure in outcome.failed.iter().take(5) {
            eprintln!("     - {}: {}", failure.label, failure.error);
        }
    }
}

fn write_output(content: &[u8], path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content)?;
            if !content.ends_with(b"\n") {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}
