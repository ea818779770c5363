use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use itasser_miner::app::App;
use itasser_miner::blast::{AlignmentTool, SystemBlast};
use itasser_miner::config::{ConfigLoader, Overrides, ResolvedConfig};
use itasser_miner::domain::Identifier;
use itasser_miner::error::MinerError;
use itasser_miner::interrupt;
use itasser_miner::itasser::{ItasserHttpClient, ResultsClient};
use itasser_miner::output::{ConsoleProgress, JsonOutput, OutputMode};
use itasser_miner::store::Workspace;

#[derive(Parser)]
#[command(name = "itasser-miner")]
#[command(about = "Spy on the I-TASSER queue: download finished jobs and match them to human proteins")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true, help = "Runs giving details")]
    verbose: bool,

    #[arg(long, global = true, help = "Print a JSON summary instead of messages")]
    json: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true, help = "Directory holding tarballs/, fasta/ and the CSV files")]
    workdir: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Walk the job range and write data.csv plus one FASTA per sequence (default)")]
    Collect(CollectArgs),
    #[command(about = "Add length and secondary-structure fractions to data.csv")]
    Tabulate,
    #[command(about = "Align every FASTA against the reference proteome and write matched.csv")]
    Align(AlignArgs),
}

#[derive(Args, Clone, Default)]
struct CollectArgs {
    #[arg(long, help = "First job identifier, e.g. S438773")]
    first: Option<String>,

    #[arg(long, help = "Last job identifier (inclusive)")]
    last: Option<String>,

    #[arg(long, help = "Only use archives already in tarballs/")]
    offline: bool,

    #[arg(long)]
    delay_secs: Option<u64>,
}

#[derive(Args, Clone, Default)]
struct AlignArgs {
    #[arg(long, help = "BLAST database name or path")]
    db: Option<String>,

    #[arg(long, help = "Alignment program (default blastp)")]
    program: Option<String>,

    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(miner) = report.downcast_ref::<MinerError>() {
            return ExitCode::from(map_exit_code(miner));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MinerError) -> u8 {
    match error {
        MinerError::InvalidIdentifier(_)
        | MinerError::ConfigRead(_)
        | MinerError::ConfigParse(_) => 2,
        MinerError::ItasserHttp(_)
        | MinerError::ItasserStatus { .. }
        | MinerError::MissingTool(_)
        | MinerError::Alignment(_) => 3,
        MinerError::Interrupted => interrupt::INTERRUPTED_EXIT_CODE as u8,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    let default_filter = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let workspace = match &cli.workdir {
        Some(dir) => Workspace::new_with_root(Utf8PathBuf::from(dir)),
        None => Workspace::current()?,
    };
    let config = ConfigLoader::resolve_in(
        workspace.root().as_std_path(),
        cli.config.as_deref().map(Path::new),
    )?;

    match cli.command.unwrap_or(Commands::Collect(CollectArgs::default())) {
        Commands::Collect(args) => run_collect(args, workspace, config, output_mode, verbose),
        Commands::Tabulate => run_tabulate(workspace, config, output_mode, verbose),
        Commands::Align(args) => run_align(args, workspace, config, output_mode, verbose),
    }
}

fn run_collect(
    args: CollectArgs,
    workspace: Workspace,
    config: ResolvedConfig,
    output_mode: OutputMode,
    verbose: bool,
) -> miette::Result<()> {
    let overrides = Overrides {
        first: args.first.map(|value| value.parse::<Identifier>()).transpose()?,
        last: args.last.map(|value| value.parse::<Identifier>()).transpose()?,
        delay_secs: args.delay_secs,
        offline: args.offline,
        ..Overrides::default()
    };
    let config = config.apply(overrides);
    tracing::info!(range = %config.range, can_download = config.can_download, "collecting");

    let client = ItasserHttpClient::new(&config.base_url)?;
    let cancel = Arc::new(AtomicBool::new(false));
    interrupt::install(cancel.clone())?;

    let app = App::new(workspace, config, client, NopAligner);
    let result = match output_mode {
        OutputMode::Json => {
            let result = app.collect(&cancel, &JsonOutput)?;
            JsonOutput::print_collect(&result).into_diagnostic()?;
            result
        }
        OutputMode::Human => app.collect(&cancel, &ConsoleProgress { verbose })?,
    };

    if result.interrupted {
        return Err(MinerError::Interrupted.into());
    }
    if matches!(output_mode, OutputMode::Human) {
        println!("finished");
    }
    Ok(())
}

fn run_tabulate(
    workspace: Workspace,
    config: ResolvedConfig,
    output_mode: OutputMode,
    verbose: bool,
) -> miette::Result<()> {
    let app = App::new(workspace, config, NopResults, NopAligner);
    match output_mode {
        OutputMode::Json => {
            let result = app.tabulate(&JsonOutput)?;
            JsonOutput::print_tabulate(&result).into_diagnostic()?;
        }
        OutputMode::Human => {
            let result = app.tabulate(&ConsoleProgress { verbose })?;
            println!("finished: {} rows in {}", result.rows, result.data_extra_csv);
        }
    }
    Ok(())
}

fn run_align(
    args: AlignArgs,
    workspace: Workspace,
    config: ResolvedConfig,
    output_mode: OutputMode,
    verbose: bool,
) -> miette::Result<()> {
    let config = config.apply(Overrides {
        blast_program: args.program,
        blast_database: args.db,
        blast_threads: args.threads,
        ..Overrides::default()
    });
    let aligner = SystemBlast::new(&config.blast);
    let app = App::new(workspace, config, NopResults, aligner);
    match output_mode {
        OutputMode::Json => {
            let result = app.align(&JsonOutput)?;
            JsonOutput::print_align(&result).into_diagnostic()?;
        }
        OutputMode::Human => {
            let result = app.align(&ConsoleProgress { verbose })?;
            println!(
                "finished: {} of {} queries matched ({} failed)",
                result.matched,
                result.queries,
                result.failed.len()
            );
        }
    }
    Ok(())
}

struct NopResults;
struct NopAligner;

impl ResultsClient for NopResults {
    fn download(&self, _id: &Identifier, _destination: &Utf8Path) -> Result<(), MinerError> {
        Err(MinerError::ItasserHttp(
            "I-TASSER client not configured".to_string(),
        ))
    }
}

impl AlignmentTool for NopAligner {
    fn align(&self, _query: &Path, _report: &Path) -> Result<(), MinerError> {
        Err(MinerError::MissingTool(
            "alignment tool not configured".to_string(),
        ))
    }
}
