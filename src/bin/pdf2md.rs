//! CLI binary for mistral-pdf2md.
//!
//! A thin shim over the library crate: resolves the API key and target
//! folder from flags, environment and the settings file, then runs one
//! conversion into a vault directory.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use mistral_pdf2md::{
    convert, ConversionConfig, ConversionOutput, ConversionProgressCallback, ConversionRequest,
    ConversionStage, FetchStrategy, FsVault, MaterializeIssue, ProgressCallback, Settings,
    SourceFile,
};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner showing the current stage, with one line per materialize issue.
struct CliProgressCallback {
    bar: ProgressBar,
    source: String,
}

impl CliProgressCallback {
    fn new(source: &str) -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message(source.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            source: source.to_string(),
        })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: ConversionStage) {
        let (prefix, msg) = match stage {
            ConversionStage::Uploading => ("Uploading", self.source.clone()),
            ConversionStage::Resolving => ("Resolving", "requesting signed URL".to_string()),
            ConversionStage::Fetching => ("Fetching", "waiting for OCR result".to_string()),
            ConversionStage::Materializing => ("Writing", "note and images".to_string()),
            _ => return,
        };
        self.bar.set_prefix(prefix);
        self.bar.set_message(msg);
    }

    fn on_issue(&self, issue: &MaterializeIssue) {
        self.bar.println(format!("  {} {}", yellow("⚠"), issue));
    }

    fn on_conversion_complete(&self, output: &ConversionOutput) {
        self.bar.finish_and_clear();
        let mark = if output.report.is_clean() {
            green("✔")
        } else {
            yellow("⚠")
        };
        eprintln!(
            "{} {}  {} images  {}",
            mark,
            bold(&output.report.markdown_path),
            output.report.images_written.len(),
            dim(&format!("{:.1}s", output.stats.total_duration_ms as f64 / 1000.0)),
        );
    }

    fn on_conversion_failed(&self, stage: ConversionStage, message: &str) {
        self.bar.finish_and_clear();
        let first_line = message.lines().next().unwrap_or(message);
        eprintln!("{} Failed while {}: {}", red("✘"), stage, red(first_line));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert into the default folder of the current vault
  pdf2md report.pdf

  # Choose the vault and a folder inside it
  pdf2md --vault ~/Notes --folder /Papers/ paper.pdf

  # Store the key for later runs
  pdf2md --api-key sk-... --save-key report.pdf

  # Call the OCR endpoint directly instead of the signed URL
  pdf2md --ocr-model mistral-ocr-latest report.pdf

  # Machine-readable result
  pdf2md --json report.pdf > result.json

OUTPUT LAYOUT:
  {vault}/{folder}{name}/{name}.md
  {vault}/{folder}{name}/img-0.jpeg, img-1.jpeg, ...

  The folder is used as written. Keep the trailing '/' so the note
  directory is nested inside it.

ENVIRONMENT VARIABLES:
  MISTRAL_API_KEY       Mistral API key
  PDF2MD_SETTINGS       Settings file (default: $XDG_CONFIG_HOME/pdf2md/settings.json)
  PDF2MD_FOLDER         Target folder inside the vault
  PDF2MD_VAULT          Vault directory
  RUST_LOG              Log filter, e.g. mistral_pdf2md=debug
"#;

#[derive(Parser, Debug)]
#[command(
    name = "pdf2md",
    version,
    about = "Convert PDF files to Markdown notes with images using Mistral OCR",
    long_about = "Upload a PDF to the Mistral OCR service and write the recognised text as a \
Markdown note, with every embedded image saved next to it, inside a vault directory.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to convert.
    input: PathBuf,

    /// Target folder inside the vault. Defaults to the settings file value.
    #[arg(short, long, env = "PDF2MD_FOLDER")]
    folder: Option<String>,

    /// Vault directory that receives the output.
    #[arg(long, env = "PDF2MD_VAULT", default_value = ".")]
    vault: PathBuf,

    /// Mistral API key. Falls back to the settings file, then a prompt.
    #[arg(long, env = "MISTRAL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Settings file holding `defaultFolder` and `apiKey`.
    #[arg(long, env = "PDF2MD_SETTINGS")]
    settings: Option<PathBuf>,

    /// Persist the API key used for this run into the settings file.
    #[arg(long)]
    save_key: bool,

    /// Fetch through the OCR endpoint with this model instead of the signed URL.
    #[arg(long, env = "PDF2MD_OCR_MODEL")]
    ocr_model: Option<String>,

    /// Override the service base URL.
    #[arg(long, env = "PDF2MD_BASE_URL")]
    base_url: Option<String>,

    /// Validity of the signed download URL, in hours.
    #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(u32).range(1..=168))]
    expiry_hours: u32,

    /// Per-request timeout in seconds.
    #[arg(long, env = "PDF2MD_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Print the conversion result as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF2MD_NO_PROGRESS")]
    no_progress: bool,

    #[arg(short, long, env = "PDF2MD_VERBOSE")]
    verbose: bool,

    #[arg(short, long, env = "PDF2MD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO logs; verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Settings and API key ─────────────────────────────────────────────
    let settings_path = cli.settings.clone().unwrap_or_else(default_settings_path);
    let mut settings = Settings::load(&settings_path)
        .await
        .context("Failed to load settings")?;

    let interactive = !cli.json && io::stdin().is_terminal();
    let api_key = tokio::task::block_in_place(|| {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut stderr = io::stderr();
        let prompt = interactive
            .then_some((&mut input as &mut dyn BufRead, &mut stderr as &mut dyn Write));
        resolve_api_key(cli.api_key.as_deref(), &settings, prompt)
    })?;

    if cli.save_key {
        match api_key {
            Some(ref key) if *key != settings.api_key => {
                settings.api_key = key.clone();
                settings
                    .save(&settings_path)
                    .await
                    .context("Failed to save settings")?;
                if !cli.quiet {
                    eprintln!("{} API key saved to {}", green("✔"), settings_path.display());
                }
            }
            Some(_) => {}
            None => anyhow::bail!("--save-key given but no API key was provided"),
        }
    }

    // ── Build config ─────────────────────────────────────────────────────
    let vault = tokio::fs::canonicalize(&cli.vault)
        .await
        .with_context(|| format!("Vault directory {:?} is not accessible", cli.vault))?;
    let folder = cli.folder.clone().unwrap_or_else(|| settings.default_folder.clone());

    let source = SourceFile::from_path(&cli.input)
        .await
        .context("Failed to read input")?;

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new(source.filename()) as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, &settings, api_key, &folder, &vault, progress)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let request = ConversionRequest::new(source, folder);
    let output = convert(&request, &config, &FsVault::new(&vault))
        .await
        .context("Conversion failed")?;

    let note = vault.join(&output.report.markdown_path);
    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", note.display()).context("Failed to write to stdout")?;
    }

    // The spinner callback already printed the summary line.
    if !cli.quiet && !show_progress && !cli.json {
        eprintln!(
            "Converted {} ({} pages, {} images) in {}ms",
            output.source_filename,
            output.stats.page_count,
            output.stats.images_written,
            output.stats.total_duration_ms
        );
        for issue in &output.report.issues {
            eprintln!("  warning: {issue}");
        }
    }

    Ok(())
}

/// Map CLI args and settings to `ConversionConfig`.
fn build_config(
    cli: &Cli,
    settings: &Settings,
    api_key: Option<String>,
    folder: &str,
    vault: &std::path::Path,
    progress: Option<ProgressCallback>,
) -> Result<ConversionConfig> {
    let mut builder = settings
        .apply(ConversionConfig::builder())
        .api_key(api_key.unwrap_or_default())
        .default_folder(folder)
        .vault_root(vault.to_string_lossy())
        .signed_url_expiry_hours(cli.expiry_hours)
        .request_timeout_secs(cli.timeout);

    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url);
    }
    if let Some(ref model) = cli.ocr_model {
        builder = builder.fetch_strategy(FetchStrategy::OcrEndpoint {
            model: model.clone(),
        });
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `$XDG_CONFIG_HOME/pdf2md/settings.json`, else `~/.config/pdf2md/settings.json`.
fn default_settings_path() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pdf2md")
        .join("settings.json")
}

/// Pick the API key: `--api-key` (or `MISTRAL_API_KEY`), then the settings
/// file, then one line read from `prompt` when a prompt is available.
fn resolve_api_key(
    flag: Option<&str>,
    settings: &Settings,
    prompt: Option<(&mut dyn BufRead, &mut dyn Write)>,
) -> Result<Option<String>> {
    if let Some(key) = flag.map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(Some(key.to_string()));
    }
    if settings.has_api_key() {
        return Ok(Some(settings.api_key.trim().to_string()));
    }
    match prompt {
        Some((input, output)) => prompt_api_key(input, output),
        None => Ok(None),
    }
}

fn prompt_api_key(input: &mut dyn BufRead, output: &mut dyn Write) -> Result<Option<String>> {
    write!(output, "{} ", bold("Mistral API key:")).ok();
    output.flush().ok();
    let mut line = String::new();
    input.read_line(&mut line).context("Failed to read API key")?;
    let key = line.trim().to_string();
    Ok((!key.is_empty()).then_some(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn settings_with_key(key: &str) -> Settings {
        Settings {
            api_key: key.to_string(),
            ..Settings::default()
        }
    }

    /// Resolve with a prompt that would answer `typed`; returns the key and
    /// whatever was written to the prompt output.
    fn resolve_with_prompt(flag: Option<&str>, settings: &Settings, typed: &str) -> (Option<String>, String) {
        let mut input = Cursor::new(typed.as_bytes().to_vec());
        let mut output: Vec<u8> = Vec::new();
        let key = resolve_api_key(
            flag,
            settings,
            Some((&mut input as &mut dyn BufRead, &mut output as &mut dyn Write)),
        )
        .unwrap();
        (key, String::from_utf8(output).unwrap())
    }

    #[test]
    fn flag_wins_over_settings_and_prompt() {
        let (key, shown) = resolve_with_prompt(Some("sk-flag"), &settings_with_key("sk-saved"), "sk-typed\n");
        assert_eq!(key.as_deref(), Some("sk-flag"));
        assert!(shown.is_empty());
    }

    #[test]
    fn blank_flag_falls_back_to_settings() {
        let (key, shown) = resolve_with_prompt(Some("   "), &settings_with_key(" sk-saved "), "sk-typed\n");
        assert_eq!(key.as_deref(), Some("sk-saved"));
        assert!(shown.is_empty());
    }

    #[test]
    fn prompts_when_nothing_configured() {
        let (key, shown) = resolve_with_prompt(None, &Settings::default(), "  sk-typed \n");
        assert_eq!(key.as_deref(), Some("sk-typed"));
        assert!(shown.contains("Mistral API key:"));
    }

    #[test]
    fn empty_answer_leaves_key_unset() {
        let (key, _) = resolve_with_prompt(None, &Settings::default(), "\n");
        assert_eq!(key, None);
        let (key, _) = resolve_with_prompt(None, &Settings::default(), "");
        assert_eq!(key, None);
    }

    #[test]
    fn no_prompt_without_terminal() {
        let key = resolve_api_key(None, &Settings::default(), None).unwrap();
        assert_eq!(key, None);
    }
}
