use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use skillgraph::io::FormatRegistry;
use skillgraph::{GraphModel, GraphSpec, Settings, SimulationController};

/// Log filter used when neither `--log-level` nor `RUST_LOG` parses
const DEFAULT_LOG_FILTER: &str = "skillgraph=info";

/// Force-directed layout engine for skill network graphs.
#[derive(Parser)]
#[command(name = "skillgraph")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log filter (e.g. "debug", "skillgraph=trace"); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the layout headlessly and write the final frame
    Simulate {
        /// Graph file (.yaml, .yml, .json); the portfolio graph when omitted
        #[arg(short, long)]
        graph: Option<PathBuf>,

        /// Settings file (.yaml, .yml, .json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Viewport width (overrides settings)
        #[arg(long)]
        width: Option<f32>,

        /// Viewport height (overrides settings)
        #[arg(long)]
        height: Option<f32>,

        /// Number of frames to step
        #[arg(short, long, default_value = "500")]
        frames: u32,

        /// Sampling seed (overrides settings)
        #[arg(long)]
        seed: Option<u64>,

        /// Stop early once the layout has settled
        #[arg(long)]
        until_settled: bool,

        /// Output format for the frame
        #[arg(long, default_value = "json")]
        format: String,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check that a graph file parses and resolves
    Validate {
        /// Graph file (.yaml, .yml, .json)
        #[arg(short, long)]
        graph: PathBuf,

        /// Settings file (.yaml, .yml, .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// `--log-level` wins over `RUST_LOG`; an unparsable filter falls back to the default
fn log_filter(log_level: Option<&str>) -> EnvFilter {
    match log_level {
        Some(level) => EnvFilter::try_new(level).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn init_tracing(log_level: Option<&str>) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(log_level))
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(registry: &FormatRegistry, path: Option<&Path>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => registry
            .read_settings(path)
            .with_context(|| format!("failed to read settings from {}", path.display())),
        None => Ok(Settings::default()),
    }
}

fn load_model(
    registry: &FormatRegistry,
    path: Option<&Path>,
    settings: &Settings,
) -> anyhow::Result<GraphModel> {
    let spec = match path {
        Some(path) => registry
            .read_graph(path)
            .with_context(|| format!("failed to read graph from {}", path.display()))?,
        None => GraphSpec::portfolio(),
    };
    spec.resolve(&settings.model).context("invalid skill graph")
}

#[allow(clippy::too_many_arguments)]
fn simulate(
    graph: Option<&Path>,
    config: Option<&Path>,
    width: Option<f32>,
    height: Option<f32>,
    frames: u32,
    seed: Option<u64>,
    until_settled: bool,
    format: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let registry = FormatRegistry::with_defaults();
    let mut settings = load_settings(&registry, config)?;
    if let Some(width) = width {
        settings.viewport.width = width;
    }
    if let Some(height) = height {
        settings.viewport.height = height;
    }
    if let Some(seed) = seed {
        settings.model.seed = seed;
    }

    let writer = registry.writer_for_format(format)?;
    let model = load_model(&registry, graph, &settings)?;

    let mut controller = SimulationController::from_settings(model, &settings);
    controller.initialize(settings.viewport.width, settings.viewport.height);
    controller.start();

    for _ in 0..frames {
        if until_settled && controller.is_settled() {
            break;
        }
        controller.on_frame();
    }

    let energy = controller
        .layout()
        .map(|layout| layout.kinetic_energy())
        .unwrap_or_default();
    info!(
        steps = controller.steps(),
        settled = controller.is_settled(),
        kinetic_energy = energy,
        "simulation finished"
    );

    let frame = controller.frame();
    match output {
        Some(path) => {
            writer
                .write(&frame, path)
                .with_context(|| format!("failed to write frame to {}", path.display()))?;
            info!(output = %path.display(), "frame written");
        }
        None => {
            let rendered = writer.render(&frame)?;
            std::io::stdout()
                .write_all(rendered.as_bytes())
                .context("failed to write frame to stdout")?;
        }
    }
    Ok(())
}

fn validate(graph: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let registry = FormatRegistry::with_defaults();
    let settings = load_settings(&registry, config)?;
    let model = load_model(&registry, Some(graph), &settings)?;
    println!(
        "{}: {} skills, {} links",
        graph.display(),
        model.skills().len(),
        model.links().len()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Commands::Simulate {
            graph,
            config,
            width,
            height,
            frames,
            seed,
            until_settled,
            format,
            output,
        } => simulate(
            graph.as_deref(),
            config.as_deref(),
            width,
            height,
            frames,
            seed,
            until_settled,
            &format,
            output.as_deref(),
        ),
        Commands::Validate { graph, config } => validate(&graph, config.as_deref()),
    }
}
