//! `dossier`: generate, store and inspect redacted intelligence reports.
//!
//! Command payloads are JSON on stdout; logs go to stderr.

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use dossier_common::{Document, DocumentError};
use dossier_config::{load_config, DossierConfig};
use dossier_core::logging::{generate_run_id, init_logging, LogConfig, LogFormat, LogLevel};
use dossier_core::{ExitCode, GenerateRequest, ReportEngine, Stage};
use dossier_image::{ImageError, ImageSanitizer};
use dossier_redact::RedactionEngine;
use dossier_store::{ReportFilter, ReportStore, StoreError, SEARCH_LIMIT};
use dossier_validate::DocumentValidator;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info_span};

/// Redacted, watermarked, optionally encrypted intelligence reports
#[derive(Parser)]
#[command(name = "dossier")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Configuration file (TOML, or JSON by extension)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report database path (overrides configuration)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error, off
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format: human or jsonl
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one report from a JSON or YAML document
    Generate(GenerateArgs),

    /// Generate several reports sequentially
    Batch(BatchArgs),

    /// Show a stored report
    Get(GetArgs),

    /// List stored reports, most recent first
    List(ListArgs),

    /// Substring search over title, summary and target name
    Search(SearchArgs),

    /// Store-wide counts
    Stats,

    /// Snapshot the current payload as a new version
    Snapshot(SnapshotArgs),

    /// Archive a report
    Archive(ReportRef),

    /// Delete a report's current record
    Delete(ReportRef),

    /// Validate a document without generating anything
    Validate(InputArgs),

    /// Report dimensions, format and embedded metadata of an image
    InspectImage(PathArgs),

    /// Report size, page count and encryption state of a PDF
    InspectPdf(PathArgs),

    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Command argument structs
// ============================================================================

/// Encryption switches shared by generate and batch.
#[derive(Args, Debug)]
struct EncryptionOpts {
    /// Encrypt the PDF
    #[arg(long, conflicts_with = "no_encrypt")]
    encrypt: bool,

    /// Never encrypt, whatever the configuration says
    #[arg(long)]
    no_encrypt: bool,

    /// PDF password (defaults to the configured one)
    #[arg(long, env = "DOSSIER_PDF_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

impl EncryptionOpts {
    fn choice(&self) -> Option<bool> {
        match (self.encrypt, self.no_encrypt) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Document file (.json, .yaml or .yml)
    input: PathBuf,

    /// Output PDF path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Template name (dossier, scroll)
    #[arg(long)]
    template: Option<String>,

    #[command(flatten)]
    encryption: EncryptionOpts,

    /// Watermark text (defaults to the classification)
    #[arg(long)]
    watermark: Option<String>,

    /// Keep image metadata
    #[arg(long)]
    keep_exif: bool,

    /// Do not store a record of the report
    #[arg(long)]
    no_persist: bool,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Document files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for the PDFs (one per input, named after the input)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(long)]
    template: Option<String>,

    #[command(flatten)]
    encryption: EncryptionOpts,

    #[arg(long)]
    no_persist: bool,
}

#[derive(Args, Debug)]
struct GetArgs {
    report_id: String,

    /// Include version history
    #[arg(long)]
    versions: bool,

    /// Include audit events
    #[arg(long)]
    audit: bool,
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long)]
    classification: Option<String>,

    #[arg(long)]
    author: Option<String>,

    /// Case-insensitive target name substring
    #[arg(long)]
    target: Option<String>,

    /// List archived reports instead of active ones
    #[arg(long)]
    archived: bool,

    #[arg(long, default_value_t = 100)]
    limit: usize,

    #[arg(long, default_value_t = 0)]
    offset: usize,
}

#[derive(Args, Debug)]
struct SearchArgs {
    query: String,

    #[arg(long, default_value_t = SEARCH_LIMIT)]
    limit: usize,
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    report_id: String,

    /// What changed
    #[arg(long)]
    summary: Option<String>,

    #[arg(long, default_value = "SYSTEM")]
    user: String,
}

#[derive(Args, Debug)]
struct ReportRef {
    report_id: String,

    #[arg(long, default_value = "SYSTEM")]
    user: String,
}

#[derive(Args, Debug)]
struct InputArgs {
    input: PathBuf,
}

#[derive(Args, Debug)]
struct PathArgs {
    path: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = run(cli);
    std::process::exit(exit_code.as_i32());
}

fn run(cli: Cli) -> ExitCode {
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "dossier", &mut std::io::stdout());
        return ExitCode::Clean;
    }

    let (mut config, source) = match load_config(cli.global.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("dossier: configuration error [{}]: {e}", e.code());
            return ExitCode::ConfigError;
        }
    };
    if let Some(db) = &cli.global.db {
        config.database.path = db.clone();
    }

    init_logging(&LogConfig::resolve(
        &config.logging,
        cli.global.log_level,
        cli.global.log_format,
    ));
    let span = info_span!("run", run_id = %generate_run_id());
    let _enter = span.enter();
    debug!(source = %source, db = %config.database.path.display(), "configuration loaded");

    match cli.command {
        Commands::Generate(args) => run_generate(config, args),
        Commands::Batch(args) => run_batch(config, args),
        Commands::Get(args) => run_get(&config, &args),
        Commands::List(args) => run_list(&config, &args),
        Commands::Search(args) => with_store(&config, |store| {
            store.search(&args.query, args.limit)
        }),
        Commands::Stats => with_store(&config, ReportStore::statistics),
        Commands::Snapshot(args) => with_store(&config, |store| {
            store.snapshot(&args.report_id, args.summary.as_deref(), &args.user)
        }),
        Commands::Archive(args) => {
            with_store(&config, |store| store.archive(&args.report_id, &args.user))
        }
        Commands::Delete(args) => with_store(&config, |store| {
            store
                .delete(&args.report_id, &args.user)
                .map(|outcome| json!({ "report_id": args.report_id, "deleted": outcome }))
        }),
        Commands::Validate(args) => run_validate(&config, &args.input),
        Commands::InspectImage(args) => run_inspect_image(&config, &args.path),
        Commands::InspectPdf(args) => match dossier_pdf::inspect(&args.path) {
            Ok(info) => emit(&info),
            Err(e) => {
                eprintln!("dossier: {e}");
                ExitCode::IoError
            }
        },
        Commands::Completions { .. } => ExitCode::Clean,
    }
}

// ============================================================================
// Command handlers
// ============================================================================

fn run_generate(config: DossierConfig, args: GenerateArgs) -> ExitCode {
    let document = match load_document(&args.input) {
        Ok(doc) => doc,
        Err(code) => return code,
    };
    let engine = match build_engine(config, !args.no_persist) {
        Ok(engine) => engine,
        Err(code) => return code,
    };

    let mut request = GenerateRequest::new(document)
        .with_strip_exif(!args.keep_exif)
        .with_persist(!args.no_persist);
    request.output = args.output;
    request.template = args.template;
    request.encrypt = args.encryption.choice();
    request.password = args.encryption.password;
    request.watermark = args.watermark;

    match engine.generate(request) {
        Ok(report) => emit(&report),
        Err(e) => {
            error!(stage = %e.stage, error = %e, "report generation failed");
            let code = stage_exit_code(e.stage);
            emit(&json!({ "status": "failed", "error": e }));
            code
        }
    }
}

fn run_batch(config: DossierConfig, args: BatchArgs) -> ExitCode {
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.paths.output_dir.clone());
    let mut requests = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        let document = match load_document(input) {
            Ok(doc) => doc,
            Err(code) => return code,
        };
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report".to_string());
        let mut request = GenerateRequest::new(document)
            .with_output(output_dir.join(format!("{stem}.pdf")))
            .with_persist(!args.no_persist);
        request.template = args.template.clone();
        request.encrypt = args.encryption.choice();
        request.password = args.encryption.password.clone();
        requests.push(request);
    }

    let engine = match build_engine(config, !args.no_persist) {
        Ok(engine) => engine,
        Err(code) => return code,
    };
    let result = engine.generate_batch(requests);
    let code = emit(&result);
    if code.is_success() && !result.all_succeeded() {
        return ExitCode::PartialFail;
    }
    code
}

fn run_get(config: &DossierConfig, args: &GetArgs) -> ExitCode {
    let store = match open_store(config) {
        Ok(store) => store,
        Err(code) => return code,
    };
    match fetch_report(&store, args) {
        Ok(Some(value)) => emit(&value),
        Ok(None) => store_exit_code(&StoreError::NotFound(args.report_id.clone())),
        Err(e) => store_exit_code(&e),
    }
}

fn fetch_report(store: &ReportStore, args: &GetArgs) -> Result<Option<Value>, StoreError> {
    let Some(record) = store.get(&args.report_id)? else {
        return Ok(None);
    };
    let mut out = Map::new();
    out.insert("report".to_string(), serde_json::to_value(record)?);
    if args.versions {
        let versions = store.versions(&args.report_id)?;
        out.insert("versions".to_string(), serde_json::to_value(versions)?);
    }
    if args.audit {
        let events = store.audit_events(Some(&args.report_id), 100)?;
        out.insert("audit".to_string(), serde_json::to_value(events)?);
    }
    Ok(Some(Value::Object(out)))
}

fn run_list(config: &DossierConfig, args: &ListArgs) -> ExitCode {
    let filter = ReportFilter {
        classification: args.classification.clone(),
        author: args.author.clone(),
        target_name: args.target.clone(),
        archived: args.archived,
        limit: args.limit,
        offset: args.offset,
    };
    with_store(config, |store| store.list(&filter))
}

fn run_validate(config: &DossierConfig, input: &Path) -> ExitCode {
    let document = match load_document(input) {
        Ok(doc) => doc,
        Err(code) => return code,
    };
    let validator = DocumentValidator::new(RedactionEngine::new(config.redaction.clone()));
    let result = validator.validate(&document);
    let code = emit(&result);
    if code.is_success() && !result.is_valid {
        return ExitCode::ValidationError;
    }
    code
}

fn run_inspect_image(config: &DossierConfig, path: &Path) -> ExitCode {
    let sanitizer = ImageSanitizer::new(
        config.images.clone(),
        config.paths.processed_images_dir.clone(),
    );
    match sanitizer.inspect(path) {
        Ok(info) => emit(&info),
        Err(e) => {
            eprintln!("dossier: {e}");
            match e {
                ImageError::NotFound(_) | ImageError::Io { .. } => ExitCode::IoError,
                _ => ExitCode::ValidationError,
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Print `value` as pretty JSON on stdout.
fn emit<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{text}");
            ExitCode::Clean
        }
        Err(e) => {
            eprintln!("dossier: failed to encode output: {e}");
            ExitCode::InternalError
        }
    }
}

fn load_document(path: &Path) -> Result<Document, ExitCode> {
    Document::load(path).map_err(|e| {
        eprintln!("dossier: cannot load {}: {e}", path.display());
        match e {
            DocumentError::Io { .. } => ExitCode::IoError,
            _ => ExitCode::ValidationError,
        }
    })
}

fn open_store(config: &DossierConfig) -> Result<ReportStore, ExitCode> {
    ReportStore::open(&config.database, config.retention.clone())
        .map(|store| store.with_audit_logging(config.security.audit_logging))
        .map_err(|e| store_exit_code(&e))
}

fn build_engine(config: DossierConfig, persist: bool) -> Result<ReportEngine, ExitCode> {
    if persist {
        ReportEngine::open(config).map_err(|e| store_exit_code(&e))
    } else {
        Ok(ReportEngine::new(config))
    }
}

/// Open the store, run `op` and print its result.
fn with_store<T, F>(config: &DossierConfig, op: F) -> ExitCode
where
    T: Serialize,
    F: FnOnce(&ReportStore) -> Result<T, StoreError>,
{
    let store = match open_store(config) {
        Ok(store) => store,
        Err(code) => return code,
    };
    match op(&store) {
        Ok(value) => emit(&value),
        Err(e) => store_exit_code(&e),
    }
}

fn store_exit_code(err: &StoreError) -> ExitCode {
    eprintln!("dossier: {err}");
    match err {
        StoreError::NotFound(_) => ExitCode::NotFound,
        StoreError::Io { .. } => ExitCode::IoError,
        _ => ExitCode::StoreError,
    }
}

fn stage_exit_code(stage: Stage) -> ExitCode {
    match stage {
        Stage::Validation => ExitCode::ValidationError,
        Stage::Render | Stage::Pdf => ExitCode::RenderError,
        Stage::Persist => ExitCode::StoreError,
    }
}
