use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use serde::Serialize;

use invoicer::currency::display_amount;
use invoicer::export::pdf::PdfWriter;
use invoicer::export::ExportPipeline;
use invoicer::rendering::images::EmbeddedImage;
use invoicer::rendering::layout::PreviewOptions;
use invoicer::rendering::raster::SoftwareRasterizer;
use invoicer::{ExportConfig, Invoice, Orientation, PageFormat, Session};

#[derive(Parser)]
#[command(name = "invoicer", version, about = "Preview and export invoices as PDF")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a draft and save it as Invoice-<number>.pdf
    Export(ExportArgs),
    /// Print the totals of a draft
    Totals(TotalsArgs),
}

#[derive(Args)]
struct DraftArgs {
    /// Invoice draft as JSON
    #[arg(short, long)]
    input: PathBuf,

    /// Currency code printed before amounts
    #[arg(long, default_value = "IDR")]
    currency: String,

    /// Subtract the discount line from the total
    #[arg(long)]
    subtract_discount: bool,
}

#[derive(Args)]
struct TotalsArgs {
    #[command(flatten)]
    draft: DraftArgs,

    /// Print the draft and its totals as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    draft: DraftArgs,

    /// Directory the PDF is written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Logo image (PNG or JPEG)
    #[arg(long)]
    logo: Option<PathBuf>,

    /// Text shown in the logo badge when no logo is given
    #[arg(long, default_value = "")]
    logo_alt: String,

    /// Payment information line (repeatable)
    #[arg(long = "payment-line")]
    payment_lines: Vec<String>,

    /// Rasterization oversampling factor
    #[arg(long, default_value_t = 2.0)]
    scale: f32,

    /// Give up waiting for images after this many milliseconds
    #[arg(long)]
    image_timeout_ms: Option<u64>,

    /// Largest bitmap edge in pixels; taller captures use a lower scale
    #[arg(long, default_value_t = 32767)]
    max_canvas_dimension: u32,

    /// Largest bitmap area in pixels
    #[arg(long, default_value_t = 268_435_456)]
    max_canvas_area: u64,

    /// Size the page to the invoice instead of the paper height
    #[arg(long)]
    fit_page: bool,

    #[arg(long, value_enum, default_value_t = PageFormat::A4)]
    format: PageFormat,

    #[arg(long, value_enum, default_value_t = Orientation::Portrait)]
    orientation: Orientation,
}

fn load_draft(path: &PathBuf) -> Result<Invoice> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading draft {}", path.display()))?;
    Invoice::from_json(&json).with_context(|| format!("parsing draft {}", path.display()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TotalsReport<'a> {
    invoice: &'a Invoice,
    currency: &'a str,
    grand_total: f64,
    total_discount: f64,
    payable_total: f64,
}

fn totals(args: TotalsArgs) -> Result<()> {
    let draft = args.draft;
    let invoice = load_draft(&draft.input)?;
    let payable = invoice.payable_total(draft.subtract_discount);

    if args.json {
        let report = TotalsReport {
            invoice: &invoice,
            currency: &draft.currency,
            grand_total: invoice.grand_total(),
            total_discount: invoice.total_discount(),
            payable_total: payable,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Grand total: {}", display_amount(&draft.currency, invoice.grand_total()));
    if invoice.has_discount() {
        println!("Discount:    {}", display_amount(&draft.currency, invoice.total_discount()));
    }
    println!("Total due:   {}", display_amount(&draft.currency, payable));
    Ok(())
}

async fn export(args: ExportArgs) -> Result<()> {
    let mut session = Session::from_invoice(load_draft(&args.draft.input)?);
    let snapshot = session.submit().context("draft is incomplete")?;
    let title = format!("Invoice {}", snapshot.invoice_number());

    let config = ExportConfig {
        scale: args.scale,
        image_timeout: args.image_timeout_ms.map(Duration::from_millis),
        fit_page_to_content: args.fit_page,
        max_canvas_dimension: args.max_canvas_dimension,
        max_canvas_area: args.max_canvas_area,
        format: args.format,
        orientation: args.orientation,
        output_dir: args.out_dir,
        ..Default::default()
    };
    let writer = PdfWriter::from_config(&config).with_title(title);
    info!("Delivering into {}", writer.output_dir().display());
    let pipeline = ExportPipeline::new(config, SoftwareRasterizer::new(), writer)?;

    let options = PreviewOptions {
        logo: args.logo.map(EmbeddedImage::load_file),
        logo_alt: args.logo_alt,
        payment_lines: args.payment_lines,
        currency: args.draft.currency,
        subtract_discount: args.draft.subtract_discount,
        ..Default::default()
    };

    let report = session.export(&pipeline, &options).await?;
    info!(
        "{} images loaded, {} failed, {} timed out; captured at {}x",
        report.images.loaded, report.images.failed, report.images.timed_out, report.scale
    );
    println!("{}", report.path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Export(args) => export(args).await,
        Command::Totals(args) => totals(args),
    }
}
