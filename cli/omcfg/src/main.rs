//! omcfg CLI: build platform configurations and inspect the object model.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use commands::build::OutputFormat;
use commands::PlatformSource;

#[derive(Parser)]
#[command(name = "omcfg", version, about = "Declarative platform configuration builds")]
struct Cli {
    /// Log build steps at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List built-in platforms and platform files in a directory
    List {
        /// Directory to search for .platform.toml files
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Build a platform and print its CPU configuration
    Build {
        #[command(flatten)]
        source: SourceArgs,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Region for code sections (default: the board's)
        #[arg(long)]
        code_memory: Option<String>,
        /// Region for data sections (default: the board's)
        #[arg(long)]
        data_memory: Option<String>,
        /// Region for the stack (default: the board's)
        #[arg(long)]
        stack_memory: Option<String>,
    },
    /// Build a platform and show what a dotted path resolves to
    Show {
        /// Dotted path, e.g. platform.evm6678.Platform.CPU
        path: String,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Validate a .platform.toml file
    Validate {
        /// Platform definition file
        file: PathBuf,
    },
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Built-in platform name (default: evm6678)
    #[arg(long, conflicts_with = "file")]
    platform: Option<String>,
    /// Platform definition file
    #[arg(long)]
    file: Option<PathBuf>,
}

impl SourceArgs {
    fn into_source(self) -> PlatformSource {
        match (self.platform, self.file) {
            (_, Some(file)) => PlatformSource::File(file),
            (Some(name), None) => PlatformSource::Builtin(name),
            (None, None) => PlatformSource::default(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::List { dir } => commands::list::run(dir.as_deref()),
        Commands::Build {
            source,
            format,
            code_memory,
            data_memory,
            stack_memory,
        } => {
            let overrides = omcfg_platform::MemoryOverrides {
                code_memory,
                data_memory,
                stack_memory,
            };
            commands::build::run(&source.into_source(), &overrides, format)
        }
        Commands::Show { path, source } => commands::show::run(&source.into_source(), &path),
        Commands::Validate { file } => commands::validate::run(&file),
    }
}
