use clap::{Parser, Subcommand};
use cli::{BatchConfig, extract_file, run_batch};
use color_eyre::eyre::Result;
use mask_polygons::{
    ExtractionConfig, FeatureSerializer, GeoJsonSerializer, KernelSpec,
    TransformConfig,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Convert raster classification masks into GeoJSON polygons",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract polygons from a single mask image
    Extract {
        /// Path to the mask image (scores are normalized to 0..1)
        #[arg(short, long)]
        input: PathBuf,
        /// Extraction configuration (.toml or .json); flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Where to write the GeoJSON (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Scores strictly above this value are foreground
        #[arg(long)]
        threshold: Option<f64>,
        /// Extraction mode ("polygons" or "buildings")
        #[arg(long)]
        mode: Option<String>,
        /// Opening kernel size, 0 disables
        #[arg(long)]
        open: Option<i64>,
        /// Closing kernel size, 0 disables
        #[arg(long)]
        close: Option<i64>,
        /// Simplification tolerance in pixels
        #[arg(long)]
        tolerance: Option<f64>,
        /// Column of the tile origin
        #[arg(long, allow_hyphen_values = true)]
        x_offset: Option<i64>,
        /// Row of the tile origin
        #[arg(long, allow_hyphen_values = true)]
        y_offset: Option<i64>,
        /// Georeference with the world file of this raster
        #[arg(long)]
        georeference: Option<PathBuf>,
        /// Pretty-print the GeoJSON
        #[arg(long)]
        pretty: bool,
    },
    /// Extract and merge polygons from the tiles of a mosaic
    Batch {
        /// Path to the batch configuration (.toml or .json)
        #[arg(short, long)]
        config: PathBuf,
        /// Where to write the GeoJSON (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pretty-print the GeoJSON
        #[arg(long)]
        pretty: bool,
    },
    /// Print the JSON schema of the extraction configuration
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            input,
            config,
            output,
            threshold,
            mode,
            open,
            close,
            tolerance,
            x_offset,
            y_offset,
            georeference,
            pretty,
        } => {
            let mut extraction = match &config {
                Some(path) => ExtractionConfig::from_file(path)?,
                None => ExtractionConfig::default(),
            };
            if let Some(threshold) = threshold {
                extraction.threshold = threshold;
            }
            if let Some(mode) = mode {
                extraction.mode = mode;
            }
            if let Some(size) = open {
                extraction.open_kernel = Some(KernelSpec::Size(size));
            }
            if let Some(size) = close {
                extraction.close_kernel = Some(KernelSpec::Size(size));
            }
            if let Some(tolerance) = tolerance {
                extraction.pixel_tolerance = tolerance;
            }
            if let Some(x_offset) = x_offset {
                extraction.x_offset = x_offset;
            }
            if let Some(y_offset) = y_offset {
                extraction.y_offset = y_offset;
            }
            if let Some(path) = georeference {
                extraction.transform = TransformConfig::Dataset { path };
            }

            info!("Extracting polygons from {:?}", input);
            let features =
                tokio::task::spawn_blocking(move || extract_file(&input, &extraction)).await??;
            info!("Extracted {} polygons", features.len());
            write_geojson(&features, output.as_deref(), pretty)?;
        }
        Commands::Batch { config, output, pretty } => {
            let batch = BatchConfig::from_file(&config)?;
            info!("Processing {} tiles from {:?}", batch.tiles.len(), config);
            let features = run_batch(&batch).await?;
            info!("Extracted {} polygons in total", features.len());
            write_geojson(&features, output.as_deref(), pretty)?;
        }
        Commands::Schema => {
            let schema = ExtractionConfig::schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }

    Ok(())
}

fn write_geojson(
    features: &[mask_polygons::Feature],
    output: Option<&Path>,
    pretty: bool,
) -> Result<()> {
    let serializer = GeoJsonSerializer { pretty };
    let text = serializer.serialize(features)?;
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            info!("Wrote {:?}", path);
        }
        None => println!("{text}"),
    }
    Ok(())
}
