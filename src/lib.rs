//! yoloprep: dataset preparation for YOLO-style object detection.
//!
//! Converts Pascal VOC XML annotations to YOLO label files and back,
//! removes images and labels that have lost their counterpart, and splits a
//! paired corpus into reproducible train/val/test subsets.
//!
//! # Modules
//!
//! - [`ir`]: Annotation records, typed boxes and the VOC/YOLO codecs
//! - [`conversion`]: Directory-level conversions with per-file reporting
//! - [`reconcile`]: Orphan detection and removal
//! - [`split`]: Seeded two-stage partitioning and file relocation
//! - [`config`]: Class mapping and split settings
//! - [`error`]: Error types for yoloprep operations

pub mod config;
pub mod conversion;
pub mod error;
pub mod ir;
pub mod reconcile;
pub mod split;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use config::{PrepConfig, SplitConfig};
use ir::{HeaderSizeProvider, LabelFormat};

pub use error::PrepError;

/// The yoloprep CLI application.
#[derive(Parser)]
#[command(name = "yoloprep")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// YAML file with class names, split settings and image depth.
    #[arg(long, global = true, env = "YOLOPREP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Convert VOC XML annotations into YOLO label files.
    Voc2yolo(Voc2YoloArgs),
    /// Rebuild VOC XML annotations from YOLO label files and images.
    Yolo2voc(Yolo2VocArgs),
    /// Delete labels without images and images without labels.
    Reconcile(ReconcileArgs),
    /// Move a paired corpus into train/val/test subdirectories.
    Split(SplitArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LabelFormatArg {
    /// `class cx cy w h`, normalized to the image size.
    Normalized,
    /// `class xmin ymin w h` in pixels.
    Absolute,
}

impl From<LabelFormatArg> for LabelFormat {
    fn from(value: LabelFormatArg) -> Self {
        match value {
            LabelFormatArg::Normalized => LabelFormat::Normalized,
            LabelFormatArg::Absolute => LabelFormat::AbsolutePixel,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(clap::Args)]
struct Voc2YoloArgs {
    /// Directory holding the VOC XML files.
    #[arg(long)]
    xml_dir: PathBuf,

    /// Directory the label files are written to (created if missing).
    #[arg(long)]
    labels_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = LabelFormatArg::Normalized)]
    label_format: LabelFormatArg,

    /// Exit non-zero if any file fails to convert.
    #[arg(long)]
    strict: bool,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    output: ReportFormat,
}

#[derive(clap::Args)]
struct Yolo2VocArgs {
    /// Directory holding the images; one XML file is written per image.
    #[arg(long)]
    images_dir: PathBuf,

    /// Directory holding the label files.
    #[arg(long)]
    labels_dir: PathBuf,

    /// Directory the XML files are written to (created if missing).
    #[arg(long)]
    xml_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = LabelFormatArg::Normalized)]
    label_format: LabelFormatArg,

    /// Exit non-zero if any file fails to convert.
    #[arg(long)]
    strict: bool,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    output: ReportFormat,
}

#[derive(clap::Args)]
struct ReconcileArgs {
    #[arg(long)]
    labels_dir: PathBuf,

    #[arg(long)]
    images_dir: PathBuf,

    /// List orphans without deleting them.
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::Args)]
struct SplitArgs {
    #[arg(long)]
    images_dir: PathBuf,

    /// Directory holding the label or XML files paired with the images.
    #[arg(long)]
    annotations_dir: PathBuf,

    /// Share of the corpus held out from training.
    #[arg(long)]
    test_fraction: Option<f64>,

    /// Share of the held-out part used for validation (0 disables val).
    #[arg(long)]
    val_fraction: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Also write an Ultralytics dataset file here.
    #[arg(long)]
    data_yaml: Option<PathBuf>,
}

/// Run the yoloprep CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), PrepError> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        // No subcommand: print a hint and exit successfully
        println!("yoloprep {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Dataset preparation for YOLO object detection.");
        println!();
        println!("Run 'yoloprep --help' for usage information.");
        return Ok(());
    };

    let config = match &cli.config {
        Some(path) => PrepConfig::load(path)?,
        None => PrepConfig::default(),
    };

    match command {
        Commands::Voc2yolo(args) => run_voc2yolo(args, &config),
        Commands::Yolo2voc(args) => run_yolo2voc(args, &config),
        Commands::Reconcile(args) => run_reconcile(args),
        Commands::Split(args) => run_split(args, config),
    }
}

fn run_voc2yolo(args: Voc2YoloArgs, config: &PrepConfig) -> Result<(), PrepError> {
    let report = conversion::convert_voc_dir_to_yolo(
        &args.xml_dir,
        &args.labels_dir,
        &config.classes,
        args.label_format.into(),
    )?;
    finish_conversion(&report, args.output, args.strict)
}

fn run_yolo2voc(args: Yolo2VocArgs, config: &PrepConfig) -> Result<(), PrepError> {
    let sizes = HeaderSizeProvider::new(config.image_depth);
    let report = conversion::convert_yolo_dir_to_voc(
        &args.images_dir,
        &args.labels_dir,
        &args.xml_dir,
        &config.classes,
        args.label_format.into(),
        &sizes,
    )?;
    finish_conversion(&report, args.output, args.strict)
}

fn finish_conversion(
    report: &conversion::ConversionReport,
    output: ReportFormat,
    strict: bool,
) -> Result<(), PrepError> {
    match output {
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(report).map_err(std::io::Error::from)?;
            println!("{json}");
        }
        ReportFormat::Text => {
            println!("Converted {} -> {}:", report.from, report.to);
            print!("{report}");
        }
    }

    if strict {
        report.ensure_no_failures()?;
    }
    Ok(())
}

fn run_reconcile(args: ReconcileArgs) -> Result<(), PrepError> {
    let opts = reconcile::ReconcileOptions {
        dry_run: args.dry_run,
    };
    let report = reconcile::reconcile(&args.labels_dir, &args.images_dir, &opts)?;

    println!(
        "Reconciled {} with {}:",
        args.labels_dir.display(),
        args.images_dir.display()
    );
    print!("{report}");
    Ok(())
}

fn run_split(args: SplitArgs, config: PrepConfig) -> Result<(), PrepError> {
    let base = config.split;
    let split_cfg = SplitConfig {
        test_fraction: args.test_fraction.unwrap_or(base.test_fraction),
        val_fraction: args.val_fraction.unwrap_or(base.val_fraction),
        seed: args.seed.unwrap_or(base.seed),
    };
    let config = config.with_split(split_cfg)?;

    let report = split::split_dataset(&args.images_dir, &args.annotations_dir, &config.split)?;
    println!("Split {}:", args.images_dir.display());
    print!("{report}");

    if let Some(yaml_path) = &args.data_yaml {
        let root = yaml_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        split::write_data_yaml(yaml_path, root, &config.classes, &report)?;
        println!("Wrote {}", yaml_path.display());
    }
    Ok(())
}
