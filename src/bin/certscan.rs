//! CLI binary for certscan.
//!
//! `certscan serve` runs the HTTP analysis endpoint; `certscan extract`
//! is the client: it validates local files, rasterises a PDF, and either
//! extracts in-process or submits the page images to a running server.

use anyhow::{bail, Context, Result};
use certscan::limits::{DEFAULT_MODELS, MAX_OUTPUT_TOKENS};
use certscan::pipeline::render::{self, RasterPage};
use certscan::{
    report, Certificate, ExtractionConfig, Extractor, ServerConfig, UploadFile, UploadSet,
    UploadValidator,
};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the analysis server
  certscan serve --listen 0.0.0.0:8080

  # Extract a PDF certificate in-process
  certscan extract certificate.pdf

  # Extract page photos through a running server, with a short digest
  certscan extract p1.jpg p2.jpg --server http://localhost:8080 --summary

  # Try a different fallback chain
  certscan extract cert.pdf --model gpt-4.1-mini --model gpt-4.1

LIMITS:
  One PDF (first 5 pages) or up to 5 images, 4 MiB combined.
  The server additionally caps each image at 2 MiB.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (default provider)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  CERTSCAN_PROVIDER       Provider name (openai, anthropic, gemini, azure, ollama)
  CERTSCAN_MODELS         Comma-separated model fallback list
  CERTSCAN_SERVER         Submit to this server instead of extracting in-process
  PDFIUM_LIB_PATH         Directory containing libpdfium
"#;

/// Extract ACORD 25 certificate fields with Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "certscan",
    version,
    about = "Extract ACORD 25 certificate-of-insurance fields with Vision LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "CERTSCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, global = true, env = "CERTSCAN_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP analysis endpoint.
    Serve(ServeArgs),
    /// Extract a certificate from local files.
    Extract(ExtractArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Socket address to listen on.
    #[arg(long, env = "CERTSCAN_LISTEN", default_value = "127.0.0.1:8080")]
    listen: String,

    /// Maximum request body size in bytes.
    #[arg(long, env = "CERTSCAN_MAX_BODY_BYTES", default_value_t = 16 * 1024 * 1024)]
    max_body_bytes: usize,

    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// One PDF, or up to five page images.
    #[arg(required = true, num_args = 1..)]
    files: Vec<PathBuf>,

    /// Submit to a running `certscan serve` instead of extracting in-process.
    #[arg(long, env = "CERTSCAN_SERVER")]
    server: Option<String>,

    /// Print a short digest instead of the full JSON.
    #[arg(long)]
    summary: bool,

    /// Print the result as a single JSON document (model, files, data).
    #[arg(long, conflicts_with = "summary")]
    json: bool,

    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// LLM provider: openai, anthropic, gemini, azure, ollama.
    #[arg(long, env = "CERTSCAN_PROVIDER", default_value = "openai")]
    provider: String,

    /// Model identifier; repeat to set the fallback order.
    #[arg(long = "model", env = "CERTSCAN_MODELS", value_delimiter = ',')]
    models: Vec<String>,

    /// Per-attempt model timeout in seconds.
    #[arg(long, env = "CERTSCAN_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Max LLM output tokens.
    #[arg(long, env = "CERTSCAN_MAX_TOKENS", default_value_t = MAX_OUTPUT_TOKENS)]
    max_tokens: usize,

    /// Path to a text file replacing the built-in extraction prompt.
    #[arg(long, env = "CERTSCAN_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Directory containing the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        match cli.command {
            Command::Serve(_) => "info",
            Command::Extract(_) => "warn",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Command::Serve(ref args) => run_serve(args).await,
        Command::Extract(ref args) => run_extract(args, cli.quiet).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", red("✘"), e);
            ExitCode::FAILURE
        }
    }
}

async fn run_serve(args: &ServeArgs) -> Result<ExitCode> {
    let extraction = build_config(&args.model).await?;
    let server = ServerConfig {
        listen_addr: args.listen.clone(),
        max_body_bytes: args.max_body_bytes,
    };

    certscan::server::serve(&server, &extraction)
        .await
        .context("Server failed")?;
    Ok(ExitCode::SUCCESS)
}

async fn run_extract(args: &ExtractArgs, quiet: bool) -> Result<ExitCode> {
    let config = build_config(&args.model).await?;

    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        files.push(UploadFile::from_path(path).await?);
    }

    let upload = match UploadValidator::client().validate(files) {
        Ok(upload) => upload,
        Err(e) => {
            eprintln!("{}", red(&report::render(&Err(e))));
            return Ok(ExitCode::FAILURE);
        }
    };

    let progress = (!quiet && !args.json).then(|| spinner("Analysing certificate…"));

    let exit = match args.server {
        Some(ref url) => extract_remote(url, upload, &config, args).await,
        None => extract_local(upload, &config, args).await,
    };

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }
    exit
}

async fn extract_local(
    upload: UploadSet,
    config: &ExtractionConfig,
    args: &ExtractArgs,
) -> Result<ExitCode> {
    let result = Extractor::new(config).extract_upload(upload).await;

    match result {
        Ok(ref extraction) => {
            if args.json {
                let doc = serde_json::json!({
                    "model": extraction.model,
                    "filesProcessed": extraction.files_processed,
                    "data": extraction.data(),
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else if args.summary {
                match extraction.outcome.certificate() {
                    Some(cert) => print!("{}", report::summary(cert.data())),
                    None => println!("{}", yellow(&report::render(&result))),
                }
            } else {
                println!("{}", report::render(&result));
            }
            eprintln!(
                "{} {} image(s) analysed by {}",
                green("✔"),
                extraction.files_processed,
                dim(&extraction.model)
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(_) => {
            eprintln!("{}", red(&report::render(&result)));
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Rasterise locally if needed, then POST the images as multipart.
async fn extract_remote(
    url: &str,
    upload: UploadSet,
    config: &ExtractionConfig,
    args: &ExtractArgs,
) -> Result<ExitCode> {
    let images = match upload {
        UploadSet::Document(doc) => {
            let pages = render::rasterize_pdf(&doc.name, doc.bytes, config.pdfium_lib_path.clone())
                .await
                .context("Failed to rasterise document")?;
            pages.into_iter().map(page_to_upload).collect()
        }
        UploadSet::Images(images) => images,
    };

    let mut form = reqwest::multipart::Form::new();
    for image in images {
        let part = reqwest::multipart::Part::bytes(image.bytes)
            .file_name(image.name)
            .mime_str(&image.media_type)
            .context("Invalid media type")?;
        form = form.part("file", part);
    }

    let endpoint = format!(
        "{}{}",
        url.trim_end_matches('/'),
        certscan::server::ANALYZE_PATH
    );
    let response = reqwest::Client::new()
        .post(&endpoint)
        .multipart(form)
        .timeout(config.api_timeout() * config.models.len().max(1) as u32 + Duration::from_secs(30))
        .send()
        .await
        .with_context(|| format!("Failed to reach {endpoint}"))?;

    let status = response.status();
    let body: Value = response
        .json()
        .await
        .with_context(|| format!("Server returned a non-JSON body (HTTP {status})"))?;

    if body["success"] != Value::Bool(true) {
        eprintln!(
            "{}",
            red(&format!(
                "error [{}]: {}",
                body["code"].as_str().unwrap_or("UNKNOWN"),
                body["error"].as_str().unwrap_or("no message")
            ))
        );
        return Ok(ExitCode::FAILURE);
    }

    let model = body["model"].as_str().unwrap_or("?").to_string();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        match body["data"] {
            Value::Object(ref map) if args.summary => {
                let cert = Certificate::from_object(map.clone());
                print!("{}", report::summary(cert.data()));
            }
            Value::Object(ref map) => println!("{}", serde_json::to_string_pretty(map)?),
            _ => println!(
                "{}",
                yellow("Not recognized: the upload does not look like an ACORD 25 certificate.")
            ),
        }
    }
    eprintln!("{} analysed by {}", green("✔"), dim(&model));
    Ok(ExitCode::SUCCESS)
}

fn page_to_upload(page: RasterPage) -> UploadFile {
    let media_type = page.media_type();
    UploadFile::new(
        format!("page-{}.jpg", page.page_index + 1),
        media_type,
        page.bytes,
    )
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(args: &ModelArgs) -> Result<ExtractionConfig> {
    let models: Vec<String> = if args.models.is_empty() {
        DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
    } else {
        args.models.clone()
    };

    let mut builder = ExtractionConfig::builder()
        .models(models)
        .provider_name(args.provider.clone())
        .api_timeout_secs(args.api_timeout)
        .max_tokens(args.max_tokens);

    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        if prompt.trim().is_empty() {
            bail!("System prompt file {:?} is empty", path);
        }
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref dir) = args.pdfium_lib_path {
        builder = builder.pdfium_lib_path(dir.clone());
    }

    builder.build().context("Invalid configuration")
}
