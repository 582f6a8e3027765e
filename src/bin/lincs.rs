use std::fs;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use lincs_store::app::Lincs;
use lincs_store::config::ConfigLoader;
use lincs_store::couchbase::CouchbaseClient;
use lincs_store::domain::{Filter, Page};
use lincs_store::error::LincsError;
use lincs_store::literal::Literal;
use lincs_store::output::JsonOutput;
use lincs_store::range::ZscoreRange;

#[derive(Parser)]
#[command(name = "lincs")]
#[command(about = "Query LINCS instances and perturbation scores in Couchbase")]
#[command(version, author)]
struct Cli {
    /// Config file (defaults to $LINCS_CONFIG, ./lincs.json, then the user config dir)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Fetch documents by key")]
    Get(KeysArgs),
    #[command(about = "Fetch instances by distil id")]
    Distil(KeysArgs),
    #[command(about = "Fetch instances on a plate")]
    Plate(ScopedArgs),
    #[command(about = "Fetch instances for a cell line")]
    Cell(ScopedArgs),
    #[command(about = "Fetch instances for a perturbagen name")]
    Pert(ScopedArgs),
    #[command(about = "Fetch instances for a perturbagen id")]
    PertId(ScopedArgs),
    #[command(about = "Count instances where metadata.FIELD = VALUE")]
    Count(CountArgs),
    #[command(about = "Fetch z-scores vs. vehicle control")]
    Zsvc(ZsvcArgs),
    #[command(about = "Save a perturbation score document from a JSON file")]
    SavePert(SavePertArgs),
    #[command(about = "Save an instance document from a JSON file")]
    SaveInstance(SaveInstanceArgs),
}

#[derive(Args)]
struct KeysArgs {
    #[arg(required = true)]
    keys: Vec<String>,

    #[arg(long = "fields")]
    fields: Vec<String>,
}

#[derive(Args)]
struct FilterArgs {
    /// Extra conditions as a JSON object, e.g. '{"pert_type": "ctl_vector"}'
    #[arg(long)]
    filter: Option<String>,

    /// Extra condition FIELD=VALUE; numeric and true/false values are unquoted
    #[arg(long = "where", value_name = "FIELD=VALUE")]
    conditions: Vec<String>,
}

#[derive(Args)]
struct ScopedArgs {
    value: String,

    #[arg(long = "fields")]
    fields: Vec<String>,

    #[command(flatten)]
    filter: FilterArgs,

    #[arg(long)]
    skip: Option<u64>,

    #[arg(long)]
    limit: Option<u64>,
}

#[derive(Args)]
struct CountArgs {
    field: String,
    value: String,

    #[command(flatten)]
    filter: FilterArgs,
}

#[derive(Args)]
struct ZsvcArgs {
    #[arg(long)]
    cell: Option<String>,

    #[arg(long)]
    pert: Option<String>,

    #[arg(long)]
    dose: Option<f64>,

    #[arg(long)]
    time: Option<f64>,

    /// Include non-gold scores
    #[arg(long)]
    all: bool,

    #[arg(long)]
    skip: Option<u64>,

    #[arg(long)]
    limit: Option<u64>,
}

#[derive(Args)]
struct SavePertArgs {
    file: String,
}

#[derive(Args)]
struct SaveInstanceArgs {
    id: String,
    file: String,
}

fn main() -> ExitCode {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start runtime: {err}");
            return ExitCode::from(1);
        }
    };
    if let Err(report) = runtime.block_on(run()) {
        eprintln!("{report:?}");
        if let Some(lincs) = report.downcast_ref::<LincsError>() {
            return ExitCode::from(map_exit_code(lincs));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &LincsError) -> u8 {
    match error {
        err if err.is_validation() => 2,
        LincsError::NotReady
        | LincsError::ConnectionFailed(_)
        | LincsError::StoreHttp(_)
        | LincsError::StoreStatus { .. }
        | LincsError::Query { .. } => 3,
        _ => 1,
    }
}

async fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let resolved = ConfigLoader::resolve(cli.config.as_deref())?;
    tracing::debug!(profile = %resolved.profile, source = %resolved.source, "loaded config");
    let lincs = Lincs::connect(&resolved.store).await?;

    run_command(cli.command, &lincs).await
}

async fn run_command(command: Command, lincs: &Lincs<CouchbaseClient>) -> miette::Result<()> {
    match command {
        Command::Get(args) => {
            let rows = lincs.get(args.keys, args.fields).await?;
            JsonOutput::print_rows(&rows).into_diagnostic()
        }
        Command::Distil(args) => {
            let rows = lincs.get_by_distil_id(args.keys, args.fields).await?;
            JsonOutput::print_rows(&rows).into_diagnostic()
        }
        Command::Plate(args) => {
            let filter = build_filter(&args.filter)?;
            let rows = lincs.get_by_plate(&args.value, args.fields, &filter).await?;
            JsonOutput::print_rows(&rows).into_diagnostic()
        }
        Command::Cell(args) => {
            let filter = build_filter(&args.filter)?;
            let page = page(args.skip, args.limit);
            let rows = lincs
                .get_by_cell(&args.value, args.fields, &filter, page)
                .await?;
            JsonOutput::print_rows(&rows).into_diagnostic()
        }
        Command::Pert(args) => {
            let filter = build_filter(&args.filter)?;
            let page = page(args.skip, args.limit);
            let rows = lincs
                .get_by_pert(&args.value, args.fields, &filter, page)
                .await?;
            JsonOutput::print_rows(&rows).into_diagnostic()
        }
        Command::PertId(args) => {
            let filter = build_filter(&args.filter)?;
            let page = page(args.skip, args.limit);
            let rows = lincs
                .get_by_pert_id(&args.value, args.fields, &filter, page)
                .await?;
            JsonOutput::print_rows(&rows).into_diagnostic()
        }
        Command::Count(args) => {
            let filter = build_filter(&args.filter)?;
            let count = lincs
                .count_by(&args.field, Literal::infer(&args.value), &filter)
                .await?;
            JsonOutput::print_count(count).into_diagnostic()
        }
        Command::Zsvc(args) => {
            let range = ZscoreRange {
                cell_line: args.cell,
                perturbagen: args.pert,
                dose: args.dose,
                time: args.time,
                gold: Some(!args.all),
                page: page(args.skip, args.limit),
            };
            let rows = lincs.get_zsvc(&range).await?;
            JsonOutput::print_rows(&rows).into_diagnostic()
        }
        Command::SavePert(args) => {
            let document = read_document(&args.file)?;
            let id = lincs.save_pert(&document).await?;
            JsonOutput::print_saved(&id).into_diagnostic()
        }
        Command::SaveInstance(args) => {
            let document = read_document(&args.file)?;
            let id = lincs.save_instance(args.id, &document).await?;
            JsonOutput::print_saved(&id).into_diagnostic()
        }
    }
}

fn build_filter(args: &FilterArgs) -> Result<Filter, LincsError> {
    Filter::from_args(args.filter.as_deref(), &args.conditions)
}

fn page(skip: Option<u64>, limit: Option<u64>) -> Page {
    Page { skip, limit }
}

fn read_document(path: &str) -> miette::Result<Value> {
    let content = fs::read_to_string(path).into_diagnostic()?;
    serde_json::from_str(&content).into_diagnostic()
}
