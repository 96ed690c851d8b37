mod logger;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use pdf_assemble::{
    AssemblyPlan, EncodeOptions, EncodedFile, IMAGES_FILE_NAME, ImagePageSize, MERGED_FILE_NAME,
    OutputFormat, Rotation, SplitMode,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pdft", about = "PDF merge, split, rotate and image conversion", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Encoding options (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log more (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Show what would be produced without writing anything
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Combine two or more PDFs into one
    Merge {
        /// Input PDF files, in output order
        #[arg(short, long, required = true, num_args = 2..)]
        input: Vec<PathBuf>,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Split a PDF into one file per page, per range or per chunk
    Split {
        /// Input PDF file
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Page ranges, one output file each (e.g. "1-3, 5")
        #[arg(long, conflicts_with = "every")]
        ranges: Option<String>,

        /// Pages per output file
        #[arg(long)]
        every: Option<usize>,
    },

    /// Rotate every page of a PDF
    Rotate {
        /// Input PDF file
        #[arg(short, long)]
        input: PathBuf,

        /// Clockwise angle, a multiple of 90
        #[arg(long, allow_hyphen_values = true, value_parser = parse_rotation)]
        angle: Rotation,

        /// Output PDF file (default: <input>-rotated-<angle>.pdf next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert JPEG images into a PDF, one page per image
    Images {
        /// Input JPEG files, in output order
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,

        /// Page paper size
        #[arg(long, value_enum)]
        paper: Option<PaperArg>,

        /// Page orientation
        #[arg(long, value_enum)]
        orientation: Option<OrientationArg>,

        /// Size each page to its image instead of a paper size
        #[arg(long, conflicts_with_all = ["paper", "orientation"])]
        match_image: bool,

        /// Center images on the page
        #[arg(long)]
        center: bool,

        /// Image scaling mode
        #[arg(long, value_enum)]
        scaling: Option<ScalingArg>,
    },

    /// Show page counts and geometry
    Info {
        /// Input PDF or JPEG files
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PaperArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScalingArg {
    Fit,
    Fill,
    None,
    Stretch,
}

impl From<PaperArg> for pdf_assemble::PaperSize {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::A3 => Self::A3,
            PaperArg::A4 => Self::A4,
            PaperArg::A5 => Self::A5,
            PaperArg::Letter => Self::Letter,
            PaperArg::Legal => Self::Legal,
            PaperArg::Tabloid => Self::Tabloid,
        }
    }
}

impl From<OrientationArg> for pdf_assemble::Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => Self::Portrait,
            OrientationArg::Landscape => Self::Landscape,
        }
    }
}

impl From<ScalingArg> for pdf_assemble::ScalingMode {
    fn from(arg: ScalingArg) -> Self {
        match arg {
            ScalingArg::Fit => Self::Fit,
            ScalingArg::Fill => Self::Fill,
            ScalingArg::None => Self::None,
            ScalingArg::Stretch => Self::Stretch,
        }
    }
}

fn parse_rotation(value: &str) -> Result<Rotation, String> {
    let degrees: i64 = value
        .parse()
        .map_err(|_| format!("{value:?} is not a number"))?;
    Rotation::from_degrees(degrees).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::CliLogger::new(cli.verbose).init()?;

    let mut options = match &cli.config {
        Some(path) => EncodeOptions::load(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => EncodeOptions::default(),
    };

    match cli.command {
        Commands::Merge { input, output } => {
            let sources = open_all(&input).await?;
            let plan = pdf_assemble::merge_plan(&sources)?;
            run_single(plan, options, MERGED_FILE_NAME, &output, cli.dry_run).await?;
        }

        Commands::Split {
            input,
            output,
            ranges,
            every,
        } => {
            let mode = match (ranges, every) {
                (Some(ranges), _) => SplitMode::Ranges(pdf_assemble::parse_ranges(&ranges)?),
                (None, Some(0)) => bail!("--every must be at least 1"),
                (None, Some(1)) | (None, None) => SplitMode::EveryPage,
                (None, Some(n)) => SplitMode::Chunks(n),
            };
            let source = open(&input).await?;
            let plan = pdf_assemble::split_plan(&source, &mode)?;

            if cli.dry_run {
                print_summary(&plan)?;
                return Ok(());
            }
            let files = pdf_assemble::process(plan, OutputFormat::Pdf, options, "").await?;
            for path in pdf_assemble::save_files(&files, &output).await? {
                println!("Wrote {}", path.display());
            }
        }

        Commands::Rotate {
            input,
            angle,
            output,
        } => {
            let source = open(&input).await?;
            let name = pdf_assemble::rotated_file_name(source.name(), angle);
            let output = output.unwrap_or_else(|| input.with_file_name(&name));
            let plan = pdf_assemble::rotate_plan(&source, angle)?;
            run_single(plan, options, &name, &output, cli.dry_run).await?;
        }

        Commands::Images {
            input,
            output,
            paper,
            orientation,
            match_image,
            center,
            scaling,
        } => {
            if match_image {
                options.image_page = ImagePageSize::MatchImage;
            } else if paper.is_some() || orientation.is_some() {
                let (default_size, default_orientation) = match options.image_page {
                    ImagePageSize::Paper { size, orientation } => (size, orientation),
                    ImagePageSize::MatchImage => (
                        pdf_assemble::PaperSize::A4,
                        pdf_assemble::Orientation::Portrait,
                    ),
                };
                options.image_page = ImagePageSize::Paper {
                    size: paper.map(Into::into).unwrap_or(default_size),
                    orientation: orientation.map(Into::into).unwrap_or(default_orientation),
                };
            }
            options.center_images |= center;
            if let Some(scaling) = scaling {
                options.image_scaling = scaling.into();
            }
            options.validate()?;

            let sources = open_all(&input).await?;
            let plan = pdf_assemble::images_plan(&sources)?;
            run_single(plan, options, IMAGES_FILE_NAME, &output, cli.dry_run).await?;
        }

        Commands::Info { input } => {
            for path in &input {
                let source = open(path).await?;
                println!(
                    "{} ({}, {} page(s))",
                    source.name(),
                    source.kind(),
                    source.page_count()
                );
                for (i, page) in source.pages().enumerate() {
                    let (width_mm, height_mm) = page.size_mm();
                    let shown = page.displayed_size();
                    println!(
                        "  {:>4}: {} x {} ({:.1} x {:.1} mm), rotated {}, shown {} x {}",
                        i + 1,
                        page.width,
                        page.height,
                        width_mm,
                        height_mm,
                        page.rotation,
                        shown.width,
                        shown.height
                    );
                }
            }
        }
    }

    Ok(())
}

async fn open(path: &Path) -> Result<Arc<pdf_assemble::PageSource>> {
    let source = pdf_assemble::load_source(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    Ok(Arc::new(source))
}

async fn open_all(paths: &[PathBuf]) -> Result<Vec<Arc<pdf_assemble::PageSource>>> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        sources.push(open(path).await?);
    }
    Ok(sources)
}

/// Run a plan that produces one file and write it to `output`
async fn run_single(
    plan: AssemblyPlan,
    options: EncodeOptions,
    name: &str,
    output: &Path,
    dry_run: bool,
) -> Result<()> {
    if dry_run {
        print_summary(&plan)?;
        println!("Would write {}", output.display());
        return Ok(());
    }

    let files = pdf_assemble::process(plan, OutputFormat::Pdf, options, name).await?;
    let Some(EncodedFile { bytes, .. }) = files.into_iter().next() else {
        bail!("nothing was produced");
    };
    tokio::fs::write(output, &bytes)
        .await
        .with_context(|| format!("writing {}", output.display()))?;
    println!("Wrote {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}

fn print_summary(plan: &AssemblyPlan) -> Result<()> {
    plan.validate()?;
    let summary = pdf_assemble::summarize(plan)?;
    println!("Plan summary:");
    println!("  Sources: {}", summary.sources);
    println!("  Source pages: {}", summary.source_pages);
    println!("  Output pages: {}", summary.planned_pages);
    println!("  Output documents: {}", summary.output_documents);
    println!("  Rotated pages: {}", summary.rotated_pages);
    Ok(())
}
