use clap::{Parser, Subcommand};
use simple_shrink::config::{self, AppConfig};
use simple_shrink::imaging::Rotation;
use simple_shrink::pipeline::Pipeline;
use simple_shrink::storage::Storage;
use simple_shrink::{logging, output, server};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn version_string() -> &'static str {
    let on_tag = env!("SHRINK_ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("SHRINK_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "simple-shrink")]
#[command(about = "Shrink photos for the web and upscale them back")]
#[command(long_about = "\
Shrink photos for the web and upscale them back

Artifacts are kept in a date-bucketed tree, one bucket per day written:

  storage/
  └── 2024-05-01/
      ├── originals/beach.jpg           # as uploaded, rotated in place if asked
      ├── shrunk/beach.webp             # lossy copy at the requested width
      └── upscaled/upscaled_beach.jpg   # AI upscale, same size as the original

Images are addressed by their original filename. Lookups search every bucket,
so an image shrunk yesterday can be upscaled today.

Run 'simple-shrink gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Storage root, overriding `storage_root` from the config
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store an image and write a shrunk copy
    Shrink {
        /// Image file to upload
        image: PathBuf,
        /// Target width in pixels (default from config)
        #[arg(long)]
        width: Option<u32>,
        /// Clockwise rotation applied to the stored original: 0, 90, 180 or 270
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        rotate: i32,
        /// Key to store under (default: the image's filename)
        #[arg(long)]
        name: Option<String>,
    },
    /// Upscale a stored original
    Upscale {
        /// Original filename the image was stored under
        file_key: String,
    },
    /// Show where the artifacts for a key are stored
    Locate {
        filename: String,
    },
    /// List every recorded artifact
    List,
    /// Run the HTTP API
    Serve {
        /// Listen address (default from config)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Shrink {
            image,
            width,
            rotate,
            name,
        } => {
            let (_, root, pipeline) = open(&cli)?;
            let key = match name {
                Some(name) => name.clone(),
                None => file_name(image)?,
            };
            let bytes = std::fs::read(image)?;
            let report = pipeline.shrink(&key, &bytes, *width, Rotation::from_degrees(*rotate))?;
            output::print_shrink_report(&report, &root);
        }
        Command::Upscale { file_key } => {
            let (_, _, pipeline) = open(&cli)?;
            let report = pipeline.upscale(file_key)?;
            output::print_upscale_report(file_key, &report);
        }
        Command::Locate { filename } => {
            let (_, _, pipeline) = open(&cli)?;
            output::print_locations(&pipeline.locate(filename)?);
        }
        Command::List => {
            let (_, _, pipeline) = open(&cli)?;
            output::print_catalog(&pipeline.catalog());
        }
        Command::Serve { bind } => {
            let (app_config, _, pipeline) = open(&cli)?;
            let addr = bind.clone().unwrap_or(app_config.server.bind);
            serve(pipeline, &addr)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Set up logging, load config, and wire the pipeline over the storage root.
fn open(cli: &Cli) -> Result<(AppConfig, PathBuf, Pipeline), Box<dyn std::error::Error>> {
    logging::init(cli.verbose);
    let app_config = config::load_config(&cli.config)?;
    let root = cli
        .storage
        .clone()
        .unwrap_or_else(|| PathBuf::from(&app_config.storage_root));
    tracing::debug!(config = %cli.config.display(), storage = %root.display(), "loaded config");
    let pipeline = Pipeline::from_config(&app_config, Storage::new(&root));
    Ok((app_config, root, pipeline))
}

fn file_name(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .ok_or_else(|| format!("cannot derive a key from {}", path.display()).into())
}

fn serve(pipeline: Pipeline, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(server::serve(Arc::new(pipeline), addr))?;
    Ok(())
}
