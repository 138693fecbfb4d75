use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use fleetcsv::{
    api::ApiClient,
    bulk::{self, BulkKind, RowContext},
    config::{AuthMethod, Config, Overrides},
    csv::{parse_csv_records, text_from_bytes},
    download::DirectorySink,
    error::BulkError,
    export::{self, ExportFormat},
};
use serde_json::{json, Value};
use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "fleetcsv", about = "Bulk CSV uploads and report exports for the fleet analytics API")]
struct Cli {
    /// YAML config file; FLEETCSV_* variables override it, flags override both.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the analytics API.
    #[arg(long, global = true)]
    api_base_url: Option<String>,

    /// API key or JWT, depending on --auth.
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// `api_key` or `jwt`.
    #[arg(long, global = true)]
    auth: Option<AuthMethod>,

    /// Request timeout in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Directory downloads are written to.
    #[arg(long, global = true)]
    download_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a CSV file and show what the upload flows would see.
    Inspect {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Validate a CSV file and submit its rows as one batch.
    Upload {
        #[arg(value_enum)]
        kind: BulkKind,
        file: PathBuf,
        /// Fleet used by vehicle-group rows without their own fleet id.
        #[arg(long)]
        fleet_id: Option<String>,
        /// Validate and print the payload without submitting.
        #[arg(long)]
        dry_run: bool,
    },
    /// Convert a JSON report into a CSV or JSON download.
    Export {
        input: PathBuf,
        #[arg(long)]
        out: Option<String>,
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
        /// Comma-separated column order for CSV output.
        #[arg(long, value_delimiter = ',')]
        headers: Vec<String>,
    },
    /// Download a raw export from the API.
    Fetch {
        /// API path, e.g. /api/insurance/raw_export?format=csv
        path: String,
        #[arg(long)]
        out: String,
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // ─── 2) load config ──────────────────────────────────────────────
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_overrides(Overrides {
        api_base_url: cli.api_base_url,
        api_key: cli.api_key,
        auth: cli.auth,
        download_dir: cli.download_dir,
        timeout_secs: cli.timeout_secs,
    });

    // ─── 3) dispatch ─────────────────────────────────────────────────
    match cli.command {
        Command::Inspect { file, json } => inspect(&file, json),
        Command::Upload {
            kind,
            file,
            fleet_id,
            dry_run,
        } => upload(&config, kind, &file, fleet_id, dry_run).await,
        Command::Export {
            input,
            out,
            format,
            headers,
        } => {
            let raw = fs::read(&input).with_context(|| format!("reading {}", input.display()))?;
            let report: Value = serde_json::from_slice(&raw)
                .with_context(|| format!("parsing {} as JSON", input.display()))?;
            let name = match out {
                Some(name) => name,
                None => {
                    let stem = input
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "report".to_string());
                    export::stamped_filename(&stem, format, Local::now().date_naive())
                }
            };
            let sink = DirectorySink::new(&config.download_dir);
            let rows = export::export_report(&sink, &name, &report, format, Some(headers.as_slice()))?;
            let dest = sink.path_for(&export::export_filename(&name, format))?;
            println!("Exported {rows} rows to {}", dest.display());
            Ok(())
        }
        Command::Fetch { path, out, format } => {
            let client = ApiClient::new(&config)?;
            let bytes = client.fetch_blob(&path).await?;
            let sink = DirectorySink::new(&config.download_dir);
            export::save_blob(&sink, &out, format, bytes)?;
            let dest = sink.path_for(&export::export_filename(&out, format))?;
            println!("Saved {}", dest.display());
            Ok(())
        }
    }
}

fn read_upload(file: &Path) -> Result<String> {
    let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    Ok(text_from_bytes(&bytes))
}

fn inspect(file: &Path, as_json: bool) -> Result<()> {
    let records = parse_csv_records(&read_upload(file)?);
    let keys = records.keys();
    if as_json {
        let out = json!({
            "headers": records.headers,
            "keys": keys,
            "rows": records.rows.len(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{} columns, {} data rows", records.headers.len(), records.rows.len());
    for (header, key) in records.headers.iter().zip(&keys) {
        println!("  {header:<32} -> {key}");
    }
    for (idx, key) in keys.iter().enumerate() {
        if keys[..idx].contains(key) {
            warn!(key = %key, "several headers share this key; the rightmost column wins");
        }
    }
    Ok(())
}

async fn upload(
    config: &Config,
    kind: BulkKind,
    file: &Path,
    fleet_id: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let text = read_upload(file)?;
    let ctx = RowContext {
        default_fleet_id: fleet_id,
    };

    if dry_run {
        let plan = bulk::dry_run(kind, &text, &ctx)?;
        info!(valid = plan.valid_rows(), rejected = plan.errors.len(), "dry run");
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let client = ApiClient::new(config)?;
    match bulk::run_kind(&client, kind, &text, &ctx).await {
        Ok(summary) => {
            println!("{}", summary.message());
            if let Some(banner) = summary.error_banner() {
                eprintln!("{banner}");
            }
            Ok(())
        }
        Err(BulkError::NoValidRows { errors }) => {
            for e in &errors {
                eprintln!("{e}");
            }
            Err(BulkError::NoValidRows { errors }.into())
        }
        Err(other) => Err(other.into()),
    }
}
