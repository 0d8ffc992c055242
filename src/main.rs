use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use image::ImageReader;
use tracing_subscriber::EnvFilter;

use carscan::classifier::train::{self, TrainingOptions};
use carscan::{DebugConfig, DetectorConfig, HogColorFeatures, ModelBundle, VehicleDetector, render};

#[derive(Parser)]
#[command(name = "carscan")]
#[command(about = "Find vehicles in images with HOG features, a linear SVM and a heatmap")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect vehicles in one or more images
    Detect {
        /// Input image files
        #[arg(value_name = "IMAGE", required = true)]
        images: Vec<PathBuf>,

        /// Model bundle written by `train`
        #[arg(short, long, value_name = "FILE")]
        model: PathBuf,

        /// JSON file overriding search and heatmap settings
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Write images with the detected boxes drawn to this directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Save debug outputs to directory (must be empty)
        #[arg(long, value_name = "DIR")]
        debug_out: Option<PathBuf>,
    },

    /// Fit the feature scaler and linear SVM on labelled image folders
    Train {
        /// Folder (searched recursively) of vehicle crops
        #[arg(long, value_name = "DIR")]
        vehicles: PathBuf,

        /// Folder (searched recursively) of non-vehicle crops
        #[arg(long, value_name = "DIR")]
        non_vehicles: PathBuf,

        /// Where to write the model bundle
        #[arg(long, value_name = "FILE")]
        model_out: PathBuf,

        /// JSON file with feature settings
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        #[arg(long, default_value_t = 0.2)]
        test_fraction: f32,

        /// SVM soft-margin constant
        #[arg(long, default_value_t = 1.0)]
        c: f32,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Print the default configuration as JSON
    DefaultConfig,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DetectorConfig> {
    match path {
        Some(path) => DetectorConfig::load(path),
        None => Ok(DetectorConfig::default()),
    }
}

fn detect(
    images: &[PathBuf],
    model: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
    debug_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let bundle = ModelBundle::load(model)
        .with_context(|| format!("Cannot start detection without model {:?}", model))?;
    let mut detector = VehicleDetector::from_bundle(bundle, config)?;
    if let Some(debug_dir) = debug_out {
        detector = detector.with_debug(DebugConfig::new(debug_dir)?);
    }
    if let Some(dir) = output {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;
    }

    for path in images {
        let img = ImageReader::open(path)?
            .decode()
            .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?
            .into_rgb8();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image")
            .to_string();

        let report = detector.detect(&img, &name)?;

        println!("\n=== {} ({}x{}) ===", path.display(), img.width(), img.height());
        println!(
            "Windows: {}  positives: {}  vehicles: {}",
            report.candidates.len(),
            report.positives.len(),
            report.boxes.len()
        );
        if report.boxes.is_empty() {
            println!("No vehicles detected.");
        }
        for (i, bbox) in report.boxes.iter().enumerate() {
            println!(
                "  Vehicle {} at {} - centroid {} - {} px",
                i + 1,
                bbox.rect,
                bbox.centroid,
                bbox.pixel_count
            );
        }

        if let (Some(dir), Some(file_name)) = (output, path.file_name()) {
            let rects: Vec<_> = report.boxes.iter().map(|b| b.rect).collect();
            let labeled = render::draw_rectangles(&img, &rects, render::WHITE, 4);
            let out_path = dir.join(file_name);
            labeled
                .save(&out_path)
                .map_err(|e| anyhow::anyhow!("Failed to save {:?}: {}", out_path, e))?;
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Detect {
            images,
            model,
            config,
            output,
            debug_out,
        } => detect(
            &images,
            &model,
            config.as_deref(),
            output.as_deref(),
            debug_out,
        ),
        Command::Train {
            vehicles,
            non_vehicles,
            model_out,
            config,
            test_fraction,
            c,
            seed,
        } => {
            let config = load_config(config.as_deref())?;
            let extractor = HogColorFeatures::new(config.features.clone())?;
            let dataset = train::load_dataset(
                &vehicles,
                &non_vehicles,
                &extractor,
                config.features.crop_size,
            )?;
            println!(
                "cars = {}  notcars = {}",
                dataset.positives(),
                dataset.len() - dataset.positives()
            );

            let options = TrainingOptions {
                test_fraction,
                c,
                seed,
            };
            let report = train::fit(&dataset, &options)?;
            println!("Train accuracy of SVM = {:.4}", report.train_accuracy);
            if let Some(test_accuracy) = report.test_accuracy {
                println!("Test accuracy of SVM = {:.4}", test_accuracy);
            }

            ModelBundle {
                features: config.features,
                model: report.model,
            }
            .save(&model_out)?;
            println!("Model saved to {}", model_out.display());
            Ok(())
        }
        Command::DefaultConfig => {
            println!("{}", DetectorConfig::default().to_json()?);
            Ok(())
        }
    }
}
