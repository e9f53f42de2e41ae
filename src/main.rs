use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use codenote::NoteError;
use codenote::cli::{GenerateOptions, OutputFormat};
use codenote::config::ModuleStrategy;

/// Parse module strategy from string
fn parse_module_strategy(s: &str) -> Result<ModuleStrategy, String> {
    s.parse()
}

#[derive(Parser)]
#[command(name = "codenote")]
#[command(
    version,
    about = "Generate Markdown notes for a source repository with a two-pass LLM pipeline"
)]
struct Cli {
    #[arg(long, help = "Path to the source repository")]
    repo: PathBuf,

    #[arg(long, help = "Directory for generated note pages (required unless --dry-run)")]
    out: Option<PathBuf>,

    #[arg(long, help = "Maximum files per analysis chunk [default: 40]")]
    max_files_per_module: Option<usize>,

    #[arg(long, help = "Maximum characters per file or file slice [default: 10000]")]
    max_chars_per_file: Option<usize>,

    #[arg(long, help = "Only document files matching this glob (repeatable)")]
    include: Vec<String>,

    #[arg(long, help = "Skip files and directories matching this glob (repeatable)")]
    exclude: Vec<String>,

    #[arg(long = "dry-run", help = "Print the chunk plan without calling the model")]
    dry_run: bool,

    #[arg(long, short, help = "Additional TOML config file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Directory for per-module analysis JSON")]
    analysis_dir: Option<PathBuf>,

    #[arg(long, value_parser = parse_module_strategy, help = "Module strategy: top-level, anchored")]
    module_strategy: Option<ModuleStrategy>,

    #[arg(long, help = "Re-analyze modules even when a persisted analysis matches")]
    force: bool,

    #[arg(long, short = 'f', value_enum, default_value = "text", help = "Report format")]
    format: OutputFormat,

    #[arg(long, help = "Print the effective configuration and exit")]
    print_config: bool,

    #[arg(long, short)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mcodenote encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(NoteError::Interrupted) = e.downcast_ref::<NoteError>() {
                eprintln!("\n\x1b[33mInterrupted.\x1b[0m Persisted analyses are kept for the next run.");
                return ExitCode::from(130);
            }
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    codenote::cli::commands::generate::run(GenerateOptions {
        repo: cli.repo,
        out: cli.out,
        config: cli.config,
        max_files_per_module: cli.max_files_per_module,
        max_chars_per_file: cli.max_chars_per_file,
        include: cli.include,
        exclude: cli.exclude,
        analysis_dir: cli.analysis_dir,
        module_strategy: cli.module_strategy,
        dry_run: cli.dry_run,
        force: cli.force,
        format: cli.format,
        print_config: cli.print_config,
        quiet: cli.quiet,
    })?;

    Ok(())
}
