pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use flavour_core::config::{AppConfig, LoadOptions, LogFormat, PenaltyMode};
use tracing::Level;

use commands::graph::GraphArgs;
use commands::select::SelectArgs;
use commands::similar::{SimilarArgs, DEFAULT_TOP};

#[derive(Debug, Parser)]
#[command(
    name = "flavour",
    about = "Flavour product graph CLI",
    long_about = "Build the product similarity graph from a catalogue dataset and pick diverse product selections.",
    after_help = "Examples:\n  flavour select --count 10 --json\n  flavour graph --export out/graph.json\n  flavour similar --product 07310350118342\n  flavour config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Select a diverse ranked set of products")]
    Select {
        #[arg(long, help = "Number of products to select")]
        count: Option<usize>,
        #[arg(long, help = "Dataset file to load instead of data.dataset_path")]
        dataset: Option<PathBuf>,
        #[arg(long, value_enum, help = "Neighbour penalty policy")]
        penalty: Option<PenaltyArg>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Build the product graph and report its statistics")]
    Graph {
        #[arg(long, help = "Dataset file to load instead of data.dataset_path")]
        dataset: Option<PathBuf>,
        #[arg(long, help = "Write products and edges as JSON to this path")]
        export: Option<PathBuf>,
    },
    #[command(about = "List the most similar products to one product")]
    Similar {
        #[arg(long, help = "Product identifier")]
        product: String,
        #[arg(long, default_value_t = DEFAULT_TOP, help = "Number of neighbours to list")]
        top: usize,
        #[arg(long, help = "Dataset file to load instead of data.dataset_path")]
        dataset: Option<PathBuf>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PenaltyArg {
    Linear,
    Proportional,
}

impl From<PenaltyArg> for PenaltyMode {
    fn from(value: PenaltyArg) -> Self {
        match value {
            PenaltyArg::Linear => PenaltyMode::Linear,
            PenaltyArg::Proportional => PenaltyMode::Proportional,
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // A broken config still gets default logging; the command reports the error.
    let config = AppConfig::load(LoadOptions::default()).unwrap_or_default();
    init_logging(&config);

    let result = match cli.command {
        Command::Select { count, dataset, penalty, json } => commands::select::run(SelectArgs {
            count,
            dataset,
            penalty: penalty.map(PenaltyMode::from),
            json,
        }),
        Command::Graph { dataset, export } => commands::graph::run(GraphArgs { dataset, export }),
        Command::Similar { product, top, dataset } => {
            commands::similar::run(SimilarArgs { product, top, dataset })
        }
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn init_logging(config: &AppConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if installed.is_err() {
        tracing::debug!(event_name = "cli.logging.already_initialized", "subscriber already set");
    }
}
