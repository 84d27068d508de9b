use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use spillway_blobstore::FsBlobStore;
use spillway_core::config::{ENV_BUCKET, ENV_QUEUE_URL, ENV_SIZE_THRESHOLD};
use spillway_core::{
    BatchSendOutput, ExtendedConfig, ExtendedConsumer, ExtendedProducer, MessageAttribute,
    MessageAttributes, OutgoingMessage, POINTER_ATTRIBUTE, QueueProducer, ReceivedMessage,
    SendEntry, SendReceipt, TransportError, extract_bucket, extract_key, has_markers,
    strip_markers,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

const LOCAL_QUEUE_URL: &str = "local://spillway-cli";

#[derive(Parser, Debug)]
#[command(name = "spillway-cli")]
#[command(about = "Offload, resolve and inspect large queue payloads")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Offload(OffloadArgs),
    Resolve(ResolveArgs),
    InspectHandle(InspectHandleArgs),
    StripHandle(StripHandleArgs),
}

#[derive(clap::Args, Debug)]
struct OffloadArgs {
    #[arg(long)]
    store_root: PathBuf,
    #[arg(long)]
    bucket: Option<String>,
    #[arg(long)]
    key_prefix: Option<String>,
    #[arg(long, default_value = "cli-message")]
    id: String,
    #[arg(long)]
    body_file: Option<PathBuf>,
    #[arg(long)]
    body: Option<String>,
    #[arg(long)]
    threshold: Option<usize>,
    #[arg(long = "always", action = ArgAction::SetTrue)]
    always_offload: bool,
}

#[derive(clap::Args, Debug)]
struct ResolveArgs {
    #[arg(long)]
    store_root: PathBuf,
    #[arg(long)]
    bucket: Option<String>,
    /// A send entry as printed by `offload`.
    #[arg(long)]
    entry_file: Option<PathBuf>,
    #[arg(long)]
    attribute: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    handle: Option<String>,
    #[arg(long)]
    body: Option<String>,
    #[arg(long = "no-markers", action = ArgAction::SetTrue)]
    no_markers: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct InspectHandleArgs {
    #[arg(long, allow_hyphen_values = true)]
    handle: String,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct StripHandleArgs {
    #[arg(long, allow_hyphen_values = true)]
    handle: String,
}

#[derive(Serialize)]
struct HandleReport<'a> {
    bucket: Option<&'a str>,
    key: Option<&'a str>,
    original: &'a str,
    has_markers: bool,
}

/// Transport that keeps what would have been sent so the CLI can print it.
#[derive(Default)]
struct CapturingQueue {
    entries: Mutex<Vec<SendEntry>>,
}

impl CapturingQueue {
    fn take(&self) -> Vec<SendEntry> {
        self.entries
            .lock()
            .map(|mut entries| std::mem::take(&mut *entries))
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl QueueProducer for CapturingQueue {
    async fn send(&self, entry: SendEntry) -> Result<SendReceipt, TransportError> {
        let id = entry.id.clone();
        self.entries
            .lock()
            .map_err(|_| TransportError::Backend("capture mutex poisoned".to_string()))?
            .push(entry);
        Ok(SendReceipt {
            id,
            message_id: None,
        })
    }

    async fn send_batch(&self, entries: Vec<SendEntry>) -> Result<BatchSendOutput, TransportError> {
        let successful = entries
            .iter()
            .map(|entry| SendReceipt {
                id: entry.id.clone(),
                message_id: None,
            })
            .collect();
        self.entries
            .lock()
            .map_err(|_| TransportError::Backend("capture mutex poisoned".to_string()))?
            .extend(entries);
        Ok(BatchSendOutput {
            successful,
            failed: Vec::new(),
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Offload(args) => offload_command(args).await,
        Commands::Resolve(args) => resolve_command(args).await,
        Commands::InspectHandle(args) => inspect_handle_command(args),
        Commands::StripHandle(args) => strip_handle_command(args),
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

/// CLI flags win over the environment; the queue URL is irrelevant locally.
fn load_config(bucket: Option<String>, threshold: Option<usize>) -> Result<ExtendedConfig, String> {
    let mut overrides = HashMap::new();
    if let Some(bucket) = bucket {
        overrides.insert(ENV_BUCKET, bucket);
    }
    if let Some(threshold) = threshold {
        overrides.insert(ENV_SIZE_THRESHOLD, threshold.to_string());
    }
    ExtendedConfig::from_lookup(|name| {
        overrides
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
            .or_else(|| (name == ENV_QUEUE_URL).then(|| LOCAL_QUEUE_URL.to_string()))
    })
    .map_err(|error| error.to_string())
}

fn open_store(root: &Path) -> Result<Arc<FsBlobStore>, String> {
    FsBlobStore::new(root)
        .map(Arc::new)
        .map_err(|error| format!("failed opening blob store '{}': {error}", root.display()))
}

fn load_body(body_file: Option<&Path>, body: Option<&str>) -> Result<String, String> {
    match (body_file, body) {
        (Some(_), Some(_)) => Err("provide only one of --body-file or --body".to_string()),
        (None, None) => Err("one of --body-file or --body is required".to_string()),
        (Some(path), None) => std::fs::read_to_string(path)
            .map_err(|e| format!("failed reading body file '{}': {e}", path.display())),
        (None, Some(body)) => Ok(body.to_string()),
    }
}

async fn offload_command(args: OffloadArgs) -> Result<ExitCode, String> {
    let mut config = load_config(args.bucket, args.threshold)?;
    if let Some(prefix) = args.key_prefix {
        config.key_prefix = prefix;
    }
    if args.always_offload {
        config.always_offload = true;
    }
    tracing::debug!(
        bucket = %config.bucket,
        threshold = config.size_threshold,
        always_offload = config.always_offload,
        "offload configuration loaded"
    );

    let raw = load_body(args.body_file.as_deref(), args.body.as_deref())?;
    let body: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| format!("body is not valid JSON: {e}"))?;

    let queue = Arc::new(CapturingQueue::default());
    let producer = ExtendedProducer::new(config, queue.clone(), open_store(&args.store_root)?)
        .map_err(|error| error.to_string())?;
    producer
        .send(OutgoingMessage::new(args.id, body))
        .await
        .map_err(|error| error.to_string())?;

    let entry = queue
        .take()
        .pop()
        .ok_or_else(|| "producer did not emit a message".to_string())?;
    let json = serde_json::to_string_pretty(&entry).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}

async fn resolve_command(args: ResolveArgs) -> Result<ExitCode, String> {
    if args.entry_file.is_some() && (args.attribute.is_some() || args.body.is_some()) {
        return Err("--entry-file cannot be combined with --attribute or --body".to_string());
    }
    let config = load_config(args.bucket, None)?.with_receipt_handle_markers(!args.no_markers);
    let message = match args.entry_file.as_deref() {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("failed reading entry file '{}': {e}", path.display()))?;
            let entry: SendEntry =
                serde_json::from_str(&raw).map_err(|e| format!("invalid entry file: {e}"))?;
            ReceivedMessage {
                id: entry.id,
                body: entry.body,
                attributes: entry.attributes,
                receipt_handle: args.handle.unwrap_or_default(),
            }
        }
        None => {
            let mut attributes = MessageAttributes::new();
            if let Some(value) = args.attribute {
                attributes.insert(POINTER_ATTRIBUTE.to_string(), MessageAttribute::string(value));
            }
            ReceivedMessage {
                id: "cli-message".to_string(),
                body: args.body.unwrap_or_default(),
                attributes,
                receipt_handle: args.handle.unwrap_or_default(),
            }
        }
    };

    let consumer = ExtendedConsumer::new(config, open_store(&args.store_root)?)
        .map_err(|error| error.to_string())?;
    let delivered = consumer
        .resolve(message)
        .await
        .map_err(|error| error.to_string())?;

    if args.json {
        let json = serde_json::to_string_pretty(&delivered).map_err(|e| e.to_string())?;
        println!("{json}");
    } else {
        println!("{}", delivered.body);
    }
    Ok(ExitCode::SUCCESS)
}

fn inspect_handle_command(args: InspectHandleArgs) -> Result<ExitCode, String> {
    let handle = args.handle.as_str();
    let report = HandleReport {
        bucket: extract_bucket(handle),
        key: extract_key(handle),
        original: strip_markers(handle),
        has_markers: has_markers(handle),
    };
    if args.json {
        let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{json}");
    } else {
        println!("bucket: {}", report.bucket.unwrap_or("<none>"));
        println!("key: {}", report.key.unwrap_or("<none>"));
        println!("original: {}", report.original);
        println!("has_markers: {}", report.has_markers);
    }
    Ok(ExitCode::SUCCESS)
}

fn strip_handle_command(args: StripHandleArgs) -> Result<ExitCode, String> {
    println!("{}", strip_markers(&args.handle));
    Ok(ExitCode::SUCCESS)
}
