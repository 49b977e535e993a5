use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use aurine_docs::charts::{BarChart, Chart, Datum, LineChart, PieChart};
use aurine_docs::config::Config;
use aurine_docs::export::{ExportFormat, FlowRenderer, RasterRenderer, Rasterizer, Renderer};
use aurine_docs::forms::{ContractForm, InvoiceForm, ReportForm};
use aurine_docs::history::{FileStore, HistoryStore};
use aurine_docs::model::{ImageSource, Orientation};
use aurine_docs::recommend::RecommendationSource;
use aurine_docs::records::Series;
use aurine_docs::session::{Generated, Session};
use aurine_docs::templates::RenderContext;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type CliResult<T> = Result<T, Box<dyn Error>>;

/// Generates campaign reports, invoices and contracts.
///
/// Settings come from `AURINE_*` environment variables (a `.env` file is loaded first);
/// flags override them.  Fonts are expected under `assets/fonts` or in `AURINE_FONTS_DIR`.
#[derive(Parser)]
#[command(author, version, about = "Agency document generator")]
struct Cli {
    /// Directory with the Roboto font files.
    #[arg(long, global = true)]
    fonts_dir: Option<PathBuf>,

    /// Directory holding the document history.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a campaign report from a JSON form file.
    Report(GenerateArgs),

    /// Render an invoice from a JSON form file.
    Invoice(GenerateArgs),

    /// Render a contract from a JSON form file.
    Contract(GenerateArgs),

    /// Inspect or reuse previously generated documents.
    #[command(subcommand)]
    History(HistoryCommand),

    /// Write a standalone SVG chart.
    Chart(ChartArgs),
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// List entries, newest first.
    List,
    /// Print one entry as JSON.
    Show { id: String },
    /// Delete one entry.
    Remove { id: String },
    /// Render an entry again from its stored record.
    Regenerate {
        id: String,
        #[command(flatten)]
        export: ExportArgs,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// JSON file with the form fields (camelCase keys).
    #[arg(long, short)]
    input: PathBuf,

    /// Page orientation; invoices and contracts only support portrait.
    #[arg(long, value_enum, default_value_t = OrientationArg::Portrait)]
    orientation: OrientationArg,

    #[command(flatten)]
    export: ExportArgs,

    /// Do not record the document in the history.
    #[arg(long)]
    no_history: bool,
}

#[derive(Args)]
struct ExportArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = FormatArg::Pdf)]
    format: FormatArg,

    /// Rendering backend.
    #[arg(long, value_enum, default_value_t = Backend::Raster)]
    backend: Backend,

    /// Output directory.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct ChartArgs {
    #[arg(value_enum)]
    kind: ChartKind,

    /// Comma-separated labels.
    #[arg(long)]
    labels: String,

    /// Comma-separated values; the primary series for line charts.
    #[arg(long)]
    values: String,

    /// Second series of a line chart.
    #[arg(long)]
    secondary: Option<String>,

    /// SVG file to write; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Portrait,
    Landscape,
}

impl From<OrientationArg> for Orientation {
    fn from(value: OrientationArg) -> Self {
        match value {
            OrientationArg::Portrait => Orientation::Portrait,
            OrientationArg::Landscape => Orientation::Landscape,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Pdf,
    Png,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Pdf => ExportFormat::Pdf,
            FormatArg::Png => ExportFormat::Png,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// Pixel-exact capture of the dark document, PNG or paginated PDF.
    Raster,
    /// Vector PDF with selectable text on white pages.
    Flow,
}

#[derive(Clone, Copy, ValueEnum)]
enum ChartKind {
    Pie,
    Bar,
    Line,
}

#[tokio::main]
async fn main() {
    let _ = dotenv::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(fonts_dir) = cli.fonts_dir {
        config.fonts_dir = Some(fonts_dir);
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let result = match cli.command {
        Commands::Report(args) => generate_report(&config, args).await,
        Commands::Invoice(args) => generate_invoice(&config, args),
        Commands::Contract(args) => generate_contract(&config, args),
        Commands::History(command) => history(&config, command),
        Commands::Chart(args) => chart(args),
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}

fn read_form<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("cannot read {}: {}", path.display(), err))?;
    Ok(serde_json::from_str(&contents)
        .map_err(|err| format!("{} is not a valid form file: {}", path.display(), err))?)
}

fn render_context(config: &Config) -> RenderContext {
    let context = RenderContext::today();
    match &config.logo_path {
        Some(path) => context.with_logo(ImageSource::from_path(path.to_string_lossy())),
        None => context,
    }
}

fn renderer(config: &Config, backend: Backend) -> CliResult<Box<dyn Renderer>> {
    let fonts_dir = config.fonts_dir.as_deref();
    Ok(match backend {
        Backend::Raster => Box::new(RasterRenderer::new(Rasterizer::discover(fonts_dir))),
        Backend::Flow => Box::new(FlowRenderer::discover(fonts_dir)?),
    })
}

fn session(
    config: &Config,
    export: &ExportArgs,
    with_history: bool,
) -> CliResult<Session<FileStore>> {
    let out = export.out.clone().unwrap_or_else(|| config.output_dir.clone());
    let mut session =
        Session::new(renderer(config, export.backend)?, out).with_context(render_context(config));
    if with_history {
        session = session.with_history(HistoryStore::new(FileStore::new(&config.data_dir)));
    }
    Ok(session)
}

fn report_generated(generated: &Generated) {
    println!("{}", generated.path.display());
    match &generated.entry {
        Some(entry) => info!(
            pages = generated.pages,
            history_id = %entry.id,
            "document saved"
        ),
        None => info!(pages = generated.pages, "document saved"),
    }
}

async fn generate_report(config: &Config, args: GenerateArgs) -> CliResult<()> {
    let form: ReportForm = read_form(&args.input)?;
    let client = config.recommendation_client()?;
    let source = client
        .as_ref()
        .map(|client| client as &dyn RecommendationSource);
    let submission = form.submit(source).await.map_err(aurine_docs::Error::from)?;
    for warning in &submission.warnings {
        warn!("{}", warning);
    }

    let session = session(config, &args.export, !args.no_history)?;
    let generated = session.report(
        &submission.record,
        args.orientation.into(),
        args.export.format.into(),
    )?;
    report_generated(&generated);
    Ok(())
}

fn generate_invoice(config: &Config, args: GenerateArgs) -> CliResult<()> {
    let form: InvoiceForm = read_form(&args.input)?;
    let record = form
        .validate(RenderContext::today().generated_on)
        .map_err(aurine_docs::Error::from)?;
    let session = session(config, &args.export, !args.no_history)?;
    let generated = session.invoice(&record, args.orientation.into(), args.export.format.into())?;
    report_generated(&generated);
    Ok(())
}

fn generate_contract(config: &Config, args: GenerateArgs) -> CliResult<()> {
    let form: ContractForm = read_form(&args.input)?;
    let record = form
        .validate(RenderContext::today().generated_on)
        .map_err(aurine_docs::Error::from)?;
    let session = session(config, &args.export, !args.no_history)?;
    let generated =
        session.contract(&record, args.orientation.into(), args.export.format.into())?;
    report_generated(&generated);
    Ok(())
}

fn history(config: &Config, command: HistoryCommand) -> CliResult<()> {
    let store = HistoryStore::new(FileStore::new(&config.data_dir));
    match command {
        HistoryCommand::List => {
            for entry in store.list()? {
                println!(
                    "{}\t{}\t{}\t{}",
                    entry.id,
                    entry.generated_at.format("%Y-%m-%d %H:%M"),
                    entry.label(),
                    entry.file_name
                );
            }
        }
        HistoryCommand::Show { id } => {
            let entry = store
                .get(&id)?
                .ok_or_else(|| format!("no history entry with id {}", id))?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        HistoryCommand::Remove { id } => {
            if !store.remove(&id)? {
                return Err(format!("no history entry with id {}", id).into());
            }
            info!(%id, "history entry removed");
        }
        HistoryCommand::Regenerate { id, export } => {
            let entry = store
                .get(&id)?
                .ok_or_else(|| format!("no history entry with id {}", id))?;
            let session = session(config, &export, true)?;
            let generated = session.regenerate(&entry, export.format.into())?;
            report_generated(&generated);
        }
    }
    Ok(())
}

fn series(name: &str, raw: &str) -> CliResult<Vec<f64>> {
    Series::parse(raw)
        .map(|series| series.values().to_vec())
        .ok_or_else(|| format!("--{} must be a comma-separated list of numbers", name).into())
}

fn chart(args: ChartArgs) -> CliResult<()> {
    let labels: Vec<&str> = args.labels.split(',').map(str::trim).collect();
    let values = series("values", &args.values)?;
    if labels.len() != values.len() {
        return Err(format!(
            "got {} labels but {} values",
            labels.len(),
            values.len()
        )
        .into());
    }

    let data = || {
        labels
            .iter()
            .zip(&values)
            .map(|(label, value)| Datum::new(*label, *value))
            .collect::<Vec<_>>()
    };
    let chart = match args.kind {
        ChartKind::Pie => Chart::Pie(PieChart::new(data())),
        ChartKind::Bar => Chart::Bar(BarChart::new(data())),
        ChartKind::Line => {
            let raw = args
                .secondary
                .as_deref()
                .ok_or("line charts need --secondary")?;
            let secondary = series("secondary", raw)?;
            Chart::Line(LineChart::from_series(&labels, &values, &secondary))
        }
    };

    let svg = chart.to_svg();
    match args.out {
        Some(path) => {
            fs::write(&path, svg)?;
            println!("{}", path.display());
        }
        None => println!("{}", svg),
    }
    Ok(())
}
