use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use crossterm::tty::IsTty;
use maskguard::camera::MockCaptureBackend;
use maskguard::{
    analyze_image, default_backend, AlertSink, CaptureBackend, ConsoleDisplay, DetectionApi,
    Display, LogAlertSink, MaskguardClient, MaskguardConfig, MonitorApp, ReportSummary,
    TerminalAlertSink,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "maskguard")]
#[command(about = "Mask-detection monitoring client")]
#[command(version)]
#[command(long_about = "Captures camera frames, sends them to a MaskGuard detection server, \
shows the annotated results and live statistics, and raises audio and speech alarms when the \
environment becomes unsafe. Also analyzes still images and exports PDF summary reports.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "maskguard.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, global = true, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, global = true, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, global = true, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the monitor")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - initialize but don't start components
    #[arg(long, help = "Perform dry run - initialize components but don't start them")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, global = true, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to daily files in this directory
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the live monitor (default)
    Monitor {
        /// Log alerts instead of ringing the terminal bell; no keyboard input
        #[arg(long)]
        headless: bool,

        /// Use the synthetic camera instead of a capture device
        #[arg(long)]
        mock_camera: bool,
    },
    /// Send a still image to the server and print the detections
    Analyze {
        image: PathBuf,

        /// File or directory for the annotated image
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fetch current statistics and export a PDF summary report
    Report {
        /// Overrides `report.output_dir`
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Reset the server's statistics
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let _log_guard = init_logging(&args)?;

    let session_id = uuid::Uuid::new_v4();
    info!(
        "Starting MaskGuard v{} (session {})",
        env!("CARGO_PKG_VERSION"),
        session_id
    );
    info!("Configuration file: {}", args.config);

    let config = match MaskguardConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    match args.command {
        Some(Command::Analyze { image, output }) => analyze(config, image, output).await,
        Some(Command::Report { output_dir }) => report(config, output_dir).await,
        Some(Command::Reset) => reset(config).await,
        Some(Command::Monitor {
            headless,
            mock_camera,
        }) => monitor(config, headless, mock_camera, args.dry_run).await,
        None => monitor(config, false, false, args.dry_run).await,
    }
}

async fn monitor(
    config: MaskguardConfig,
    headless: bool,
    mock_camera: bool,
    dry_run: bool,
) -> Result<()> {
    let backend: Arc<dyn CaptureBackend> = if mock_camera {
        Arc::new(MockCaptureBackend::new())
    } else {
        default_backend()
    };
    let display: Arc<dyn Display> = Arc::new(ConsoleDisplay::new());
    let sink: Arc<dyn AlertSink> = if headless {
        Arc::new(LogAlertSink)
    } else {
        Arc::new(TerminalAlertSink::new(config.alarm.speech_command.clone()))
    };

    let mut app = MonitorApp::new(config, backend, display, sink).map_err(|e| {
        error!("Failed to create monitor: {}", e);
        e
    })?;
    app.set_keyboard_enabled(!headless && std::io::stdin().is_tty());

    app.initialize().await.map_err(|e| {
        error!("Failed to initialize monitor: {}", e);
        e
    })?;

    if dry_run {
        info!("Dry run mode - components initialized but not started");
        println!("✓ Dry run completed successfully - all components initialized");
        return Ok(());
    }

    app.start().await.map_err(|e| {
        error!("Failed to start monitor: {}", e);
        e
    })?;

    let exit_code = app.run().await.map_err(|e| {
        error!("Monitor error during execution: {}", e);
        e
    })?;

    info!("MaskGuard exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

async fn analyze(config: MaskguardConfig, image: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let client = MaskguardClient::new(&config.server)?;
    let analysis = analyze_image(&client, &image, output.as_deref()).await?;

    let detections = analysis.detections;
    println!("With mask:      {}", detections.with_mask);
    println!("Without mask:   {}", detections.without_mask);
    println!("Incorrect mask: {}", detections.incorrect_mask);
    println!("Total:          {}", detections.total);
    if let Some(path) = analysis.saved_to {
        println!("✓ Annotated image saved to {}", path.display());
    }
    Ok(())
}

async fn report(config: MaskguardConfig, output_dir: Option<PathBuf>) -> Result<()> {
    let client = MaskguardClient::new(&config.server)?;
    let statistics = client.statistics().await?;

    let dir = output_dir.unwrap_or_else(|| PathBuf::from(&config.report.output_dir));
    let summary = ReportSummary::from_snapshot(&statistics, Local::now());
    let path = summary.write_to(&dir).await?;

    println!("{}", summary.summary_line());
    println!("✓ Report saved to {}", path.display());
    Ok(())
}

async fn reset(config: MaskguardConfig) -> Result<()> {
    let client = MaskguardClient::new(&config.server)?;
    client.reset_statistics().await?;

    println!("✓ Statistics reset");
    Ok(())
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("maskguard={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    let (file_layer, guard) = match &args.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "maskguard.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# MaskGuard Configuration File");
    println!("# This is the default configuration with all available options");
    println!("# Every key can be overridden with MASKGUARD_<SECTION>__<KEY>");
    println!();
    println!("{}", MaskguardConfig::default().to_toml()?);
    Ok(())
}
