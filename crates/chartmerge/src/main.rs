//! chartmerge CLI - Main entry point

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "chartmerge")]
#[command(version)]
#[command(about = "Merge Helm chart values into existing charts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by both subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Write into a copy of the target instead of the target itself
    #[arg(short = 'o', long)]
    pub output: bool,

    /// Report what would change without writing anything
    #[arg(long)]
    pub compare_only: bool,

    /// Folder for the change report
    #[arg(long, value_name = "DIR", value_parser = commands::existing_folder)]
    pub compare_folder: Option<PathBuf>,

    /// Log at debug level
    #[arg(long)]
    pub debug: bool,

    /// Folder for the log file
    #[arg(long, value_name = "DIR", value_parser = commands::existing_folder)]
    pub log_folder: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge the values of one YAML file into another
    File {
        /// Source YAML file
        #[arg(value_parser = commands::yaml_file)]
        source: PathBuf,

        /// Target YAML file
        #[arg(value_parser = commands::yaml_file)]
        target: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Merge the values of one Helm chart into another
    Folder {
        /// Source Helm chart folder
        #[arg(value_parser = commands::chart_folder)]
        source: PathBuf,

        /// Target Helm chart folder
        #[arg(value_parser = commands::chart_folder)]
        target: PathBuf,

        #[command(flatten)]
        common: CommonArgs,

        /// Source documents to merge, in order (relative to the source chart)
        #[arg(long, value_name = "FILE", num_args = 1..)]
        configuration: Vec<String>,

        /// Also merge sections of components disabled with `enabled: false`
        #[arg(long)]
        merge_disabled_components: bool,

        /// Merge configuration file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

impl Commands {
    fn common(&self) -> &CommonArgs {
        match self {
            Commands::File { common, .. } | Commands::Folder { common, .. } => common,
        }
    }
}

const LOG_FILE: &str = "chartmerge.log";

fn init_logging(common: &CommonArgs) -> Result<()> {
    let level = if common.debug { "debug" } else { "info" };
    let default_filter = format!("chartmerge={level},chartmerge_chart={level},chartmerge_core={level}");

    let log_file = match &common.log_folder {
        Some(folder) => Some(file_layer(folder, &default_filter)?),
        None => None,
    };

    tracing_subscriber::registry()
        .with(log_file)
        .with(
            tracing_subscriber::fmt::layer()
                .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.as_str().into())),
        )
        .init();
    Ok(())
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Plain-text log written to `chartmerge.log` in `folder`, appended across runs.
fn file_layer(folder: &Path, default_filter: &str) -> Result<BoxedLayer> {
    let path = folder.join(LOG_FILE);
    let file = File::options()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()));
    Ok(Box::new(layer))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.command.common())?;

    let failed = match cli.command {
        Commands::File { source, target, common } => {
            commands::file::execute(commands::file::FileArgs { source, target, common })?
        }
        Commands::Folder {
            source,
            target,
            common,
            configuration,
            merge_disabled_components,
            config,
        } => commands::folder::execute(commands::folder::FolderArgs {
            source,
            target,
            common,
            configuration,
            merge_disabled_components,
            config,
        })?,
    };

    if failed > 0 {
        bail!("{failed} document(s) could not be merged");
    }
    Ok(())
}
