use clap::{Args, Parser, Subcommand};
use product_lens::analyzer::GeminiClient;
use product_lens::config::{AppConfig, load_config};
use product_lens::fetcher::{HttpFetcher, PageFetcher};
use product_lens::model::{AppError, PageDocument};
use product_lens::parser::{AmazonParser, looks_like_product_page};
use product_lens::session::AnalysisSession;
use product_lens::storage::{Settings, SettingsStore};
use product_lens::telemetry::{TelemetryConfig, TelemetryReporter};
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::time::{Duration, timeout};
use tracing::{info, warn};

/// How long a finished run waits for its trace upload before exiting.
const TELEMETRY_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
#[command(name = "product-lens")]
#[command(about = "AI-assisted analysis of amazon.in product pages")]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, global = true, default_value = "config.json")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape a product page and print the analysis as JSON
    Analyze {
        /// Product page URL
        url: String,
        /// Read the page from a saved HTML file instead of downloading it
        #[arg(long)]
        html: Option<String>,
    },
    /// Save the API key and optional telemetry credentials
    Configure(ConfigureArgs),
    /// Show which settings are configured
    Settings,
}

#[derive(Debug, Args)]
struct ConfigureArgs {
    #[arg(long)]
    api_key: String,
    #[arg(long, default_value = "")]
    langfuse_secret_key: String,
    #[arg(long, default_value = "")]
    langfuse_public_key: String,
    #[arg(long, default_value = "")]
    langfuse_host: String,
}

impl Commands {
    /// Leads the single error line printed when this command fails.
    fn failure_prefix(&self) -> &'static str {
        match self {
            Commands::Analyze { .. } => "Failed to analyze product",
            Commands::Configure(_) => "Failed to save configuration",
            Commands::Settings => "Failed to read settings",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only command output
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let cli = Cli::parse();
    let prefix = cli.command.failure_prefix();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", failure_message(prefix, &e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = load_config(&cli.config)?;
    match cli.command {
        Commands::Analyze { url, html } => analyze(&config, &url, html.as_deref()).await,
        Commands::Configure(args) => configure(&config, args),
        Commands::Settings => show_settings(&config),
    }
}

fn failure_message(prefix: &str, err: &AppError) -> String {
    format!("{}: {}", prefix, err)
}

async fn analyze(config: &AppConfig, url: &str, html_path: Option<&str>) -> Result<(), AppError> {
    let settings = SettingsStore::new(&config.settings_db)?.load_settings()?;
    if !looks_like_product_page(url) {
        warn!("{} does not look like a product page, extraction may be incomplete", url);
    }

    let page = match html_path {
        Some(path) => PageDocument {
            url: url.to_string(),
            html: read_html(path)?,
        },
        None => HttpFetcher::new(&config.user_agent)?.fetch(url).await?,
    };

    let session = AnalysisSession::new(
        settings,
        AmazonParser::new(&config.supported_domain)?,
        Arc::new(GeminiClient::new(&config.gemini)?),
        Arc::new(TelemetryReporter::new()),
    );

    let outcome = session.analyze_page(&page).await?;
    match serde_json::to_string_pretty(&outcome.result) {
        Ok(json) => println!("{}", json),
        Err(e) => warn!("Failed to render result: {}", e),
    }

    if let Some(handle) = outcome.telemetry {
        if timeout(TELEMETRY_GRACE, handle).await.is_err() {
            warn!("Telemetry upload still pending after {:?}, giving up", TELEMETRY_GRACE);
        }
    }
    Ok(())
}

fn configure(config: &AppConfig, args: ConfigureArgs) -> Result<(), AppError> {
    let mut store = SettingsStore::new(&config.settings_db)?;
    store.save_settings(&Settings {
        api_key: args.api_key,
        telemetry: TelemetryConfig {
            secret_key: args.langfuse_secret_key,
            public_key: args.langfuse_public_key,
            host: args.langfuse_host,
        },
    })?;
    info!("Settings stored in {}", config.settings_db);
    println!("Configuration saved.");
    Ok(())
}

fn show_settings(config: &AppConfig) -> Result<(), AppError> {
    let store = SettingsStore::new(&config.settings_db)?;
    let settings = store.load_settings()?;
    println!("API key:        {}", mask(&settings.api_key));
    println!("Langfuse secret: {}", mask(&settings.telemetry.secret_key));
    println!("Langfuse public: {}", mask(&settings.telemetry.public_key));
    println!(
        "Langfuse host:   {}",
        if settings.telemetry.host.is_empty() { "(not set)" } else { settings.telemetry.host.as_str() }
    );
    println!(
        "Telemetry:       {}",
        if settings.telemetry.is_complete() { "enabled" } else { "disabled" }
    );
    match store.last_saved()? {
        Some(at) => println!("Last saved:      {}", at.to_rfc3339()),
        None => println!("Last saved:      never"),
    }
    Ok(())
}

fn read_html(path: &str) -> Result<String, AppError> {
    fs::read_to_string(path).map_err(|e| AppError::Input(format!("cannot read {}: {}", path, e)))
}

fn mask(secret: &str) -> String {
    match secret.chars().count() {
        0 => "(not set)".to_string(),
        n if n <= 4 => "****".to_string(),
        n => {
            let tail: String = secret.chars().skip(n - 4).collect();
            format!("****{}", tail)
        }
    }
}
