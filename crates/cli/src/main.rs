use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use label::{generate_labels, DataTable, GenerateRequest, LabelLayout, Symbology};
use pdf_core::TemplatePage;
use std::path::{Path, PathBuf};

const SAMPLE_TEMPLATE: &str = "templates/Template.pdf";
const SAMPLE_DATA: &str = "data/Data.csv";

#[derive(Parser)]
#[command(name = "labelgen", about = "Overlay CSV rows onto a PDF label template", version)]
struct Cli {
    /// Log every row (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one label page per CSV row
    Generate(GenerateArgs),

    /// Show the template page size and the CSV columns
    Info {
        #[command(flatten)]
        inputs: InputArgs,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Template PDF (first page is used) [default: templates/Template.pdf]
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// CSV with PRODUCT_NAME, COLOUR, STYLE, BATCH, BARCODE columns [default: data/Data.csv]
    #[arg(short, long)]
    data: Option<PathBuf>,
}

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    inputs: InputArgs,

    /// Output PDF file
    #[arg(short, long, default_value = "generated_labels.pdf")]
    output: PathBuf,

    /// Layout JSON (field and barcode placement)
    #[arg(short, long)]
    layout: Option<PathBuf>,

    /// First row to render (1-indexed)
    #[arg(long)]
    start: Option<usize>,

    /// Last row to render (inclusive)
    #[arg(long)]
    end: Option<usize>,

    /// Barcode symbology
    #[arg(long, value_enum)]
    barcode: Option<SymbologyArg>,

    /// Leave the human-readable text off the barcodes
    #[arg(long)]
    no_barcode_text: bool,

    /// TrueType font for the field text and barcode captions
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SymbologyArg {
    Code128,
    Ean13,
}

impl From<SymbologyArg> for Symbology {
    fn from(arg: SymbologyArg) -> Self {
        match arg {
            SymbologyArg::Code128 => Self::Code128,
            SymbologyArg::Ean13 => Self::Ean13,
        }
    }
}

/// Use the given path, or the sample file when it exists
fn input_path(given: Option<PathBuf>, sample: &str, what: &str) -> Result<PathBuf> {
    if let Some(path) = given {
        return Ok(path);
    }
    let sample = Path::new(sample);
    if sample.exists() {
        log::info!("No {what} given, using sample {}", sample.display());
        return Ok(sample.to_path_buf());
    }
    bail!("No {what} given and sample {} not found", sample.display())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Generate(args) => {
            let template_path = input_path(args.inputs.template, SAMPLE_TEMPLATE, "template")?;
            let data_path = input_path(args.inputs.data, SAMPLE_DATA, "data file")?;

            let mut layout = match &args.layout {
                Some(path) => LabelLayout::from_file(path)
                    .with_context(|| format!("Failed to load layout {}", path.display()))?,
                None => LabelLayout::default(),
            };
            if let Some(symbology) = args.barcode {
                layout.barcode_settings.symbology = symbology.into();
            }
            if args.no_barcode_text {
                layout.barcode_settings.include_text = false;
            }
            if args.font.is_some() {
                layout.font_path = args.font;
            }

            let request = GenerateRequest {
                template_path,
                data_path,
                output_path: args.output,
                layout,
                start: args.start,
                end: args.end,
            };

            let output = generate_labels(&request, |progress| {
                log::info!("Generating... ({}/{})", progress.completed, progress.total);
            })
            .context("Label generation failed")?;

            println!("{}", output.summary());
            println!("Saved to {}", request.output_path.display());
        }

        Commands::Info { inputs } => {
            let template_path = input_path(inputs.template, SAMPLE_TEMPLATE, "template")?;
            let template = TemplatePage::open(&template_path)
                .with_context(|| format!("Failed to open template {}", template_path.display()))?;
            let (width, height) = template.page_size();
            println!(
                "Template: {} ({} page(s), first page {:.2} x {:.2} pt, rotated {})",
                template_path.display(),
                template.source_page_count(),
                width,
                height,
                template.rotation()
            );

            let data_path = input_path(inputs.data, SAMPLE_DATA, "data file")?;
            let table = DataTable::from_path(&data_path)
                .with_context(|| format!("Failed to read {}", data_path.display()))?;
            println!("Data: {} ({} row(s))", data_path.display(), table.len());
            for column in table.columns() {
                let marker = if label::data::KNOWN_COLUMNS.contains(&column.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("  {marker} {column}");
            }
        }
    }

    Ok(())
}
